//! Time-integration engine for the Vlasov-Maxwell driver.
//!
//! Provides [`Simulation`], the adaptive time loop that advances a field
//! group with a three-stage SSP Runge-Kutta scheme, rolls back rejected
//! attempts, and writes diagnostic frames on a fixed cadence. Numerical
//! kernels are supplied as `Box<dyn UpdateOperator>`; the engine never
//! depends on concrete operators.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod metrics;
pub mod rk3;
pub mod schedule;
pub mod simulation;
pub mod stage;

pub use boundary::{BoundaryKind, BoundaryPass, BoundaryRule};
pub use checkpoint::Snapshot;
pub use clock::SimulationClock;
pub use config::{
    ConfigError, Model, SimulationConfig, Species, DEFAULT_MAX_CONSECUTIVE_REJECTIONS,
    DEFAULT_MIN_DT_FRACTION,
};
pub use diagnostics::{Diagnostics, DiagnosticsError, FrameSink, NullSink};
pub use metrics::{OperatorTimings, RunSummary, StepMetrics};
pub use rk3::{Rk3Controller, STAGE_B_WEIGHTS, STAGE_C_WEIGHTS};
pub use schedule::FrameSchedule;
pub use simulation::{RunError, Simulation, StepError, StepReport};
pub use stage::{StageExecutor, CURRENT_COMPONENTS};
