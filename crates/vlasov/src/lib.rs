//! Vlasov: an adaptive SSP-RK3 driver for coupled Vlasov-Maxwell systems.
//!
//! This is the top-level facade crate. It re-exports the public API of the
//! sub-crates and adds the TOML input deck ([`deck`]) that wires the
//! reference operators into a runnable [`Simulation`](engine::Simulation).
//!
//! # Quick start
//!
//! ```no_run
//! use vlasov::prelude::*;
//!
//! let deck = DeckConfig::load("weibel.toml").unwrap();
//! let mut sim = deck.build().unwrap();
//! let summary = sim.run().unwrap();
//! println!("{} steps, {} frames", summary.accepted_steps, summary.frames_written);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `vlasov-core` | Fields, groups, IDs, errors |
//! | [`operator`] | `vlasov-operator` | Operator contract and binding checks |
//! | [`operators`] | `vlasov-operators` | Reference kernels, grid, projections |
//! | [`engine`] | `vlasov-engine` | Stage executor, RK3, time loop, diagnostics |
//! | [`io`] | `vlasov-io` | Frame and series files |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod deck;
pub mod logging;

/// Fields, field groups, IDs and core errors (`vlasov-core`).
pub use vlasov_core as types;

/// The [`operator::UpdateOperator`] contract (`vlasov-operator`).
pub use vlasov_operator as operator;

/// Reference operators on a 1x3v phase grid (`vlasov-operators`).
pub use vlasov_operators as operators;

/// The time-integration driver (`vlasov-engine`).
///
/// [`engine::Simulation`] owns the state and runs the adaptive loop.
pub use vlasov_engine as engine;

/// Frame persistence (`vlasov-io`).
pub use vlasov_io as io;

pub use deck::{DeckConfig, DeckError};
pub use logging::init_logging;

/// Common imports for typical usage.
pub mod prelude {
    pub use crate::deck::{DeckConfig, DeckError};

    // Core
    pub use vlasov_core::{Field, FieldGroup, FieldId, FieldShape, FrameIndex, StepId};

    // Errors
    pub use vlasov_core::{FieldError, OperatorError};

    // Operators
    pub use vlasov_operator::{AdvanceContext, StepOutcome, UpdateOperator};

    // Engine
    pub use vlasov_engine::{
        BoundaryPass, Diagnostics, FrameSink, Model, RunError, RunSummary, Simulation,
        SimulationConfig, Species, StepError, StepMetrics,
    };

    // I/O
    pub use vlasov_io::{read_field_file, read_series, FileSink};
}
