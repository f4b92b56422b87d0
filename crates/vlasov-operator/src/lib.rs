//! Update-operator contract for the Vlasov-Maxwell driver.
//!
//! The [`UpdateOperator`] trait defines the `&self` advance call over an
//! [`AdvanceContext`] of shared inputs and exclusive outputs. Operators
//! declare a [`Signature`]; [`validate_binding`] checks it once when the
//! operator is wired to fields.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod operator;
pub mod signature;

pub use context::AdvanceContext;
pub use operator::{StepOutcome, UpdateOperator};
pub use signature::{validate_binding, BindingError, ShapeRequirement, Signature, SlotKind};
