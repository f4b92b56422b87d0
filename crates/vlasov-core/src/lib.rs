//! Core types for the Vlasov-Maxwell driver.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! storage the rest of the workspace operates on: typed ids, field shapes
//! and buffers, field groups, and the shared error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod group;
pub mod id;

pub use error::{FieldError, OperatorError};
pub use field::{Field, FieldShape, Side};
pub use group::FieldGroup;
pub use id::{FieldId, FrameIndex, StepId};
