//! Reference operators for the Vlasov-Maxwell driver.
//!
//! First-order finite-volume kernels that implement the
//! [`UpdateOperator`](vlasov_operator::UpdateOperator) contract on a uniform
//! 1x3v [`PhaseGrid`]. They are deliberately simple; the driver treats
//! them like any other operator.
//!
//! # Stage order
//!
//! 1. [`VlasovUpwind`], per species: `(distribution, em) → distribution`
//! 2. [`MaxwellRusanov`]: `em → em`
//! 3. [`VelocityMoment`] ([`MomentKind::Momentum`]), per species:
//!    `distribution → M1i`, feeding the current source
//!
//! [`FieldEnergy`] and [`VelocityMoment`] also serve diagnostics;
//! [`MaxwellianProjection`] and [`EmPerturbation`] set initial conditions.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod cfl;
pub mod energy;
pub mod grid;
pub mod init;
pub mod kinetic;
pub mod maxwell;
pub mod moments;

pub use cfl::{DEFAULT_CFL, DEFAULT_MAX_CFL};
pub use energy::FieldEnergy;
pub use grid::{Axis, PhaseGrid, GHOST};
pub use init::{EmPerturbation, MaxwellianProjection};
pub use kinetic::VlasovUpwind;
pub use maxwell::{component, MaxwellRusanov, EM_COMPONENTS};
pub use moments::{MomentKind, VelocityMoment};
