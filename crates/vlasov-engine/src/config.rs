//! Run configuration and construction-time validation.
//!
//! [`SimulationConfig`] holds the scalar run parameters; [`Model`] holds
//! the state and the operators wired to it. Both are consumed by
//! [`Simulation::new`](crate::Simulation::new), which reports any problem
//! as a [`ConfigError`] before the first step is attempted.

use thiserror::Error;
use vlasov_core::{FieldError, FieldGroup, FieldId};
use vlasov_operator::{BindingError, UpdateOperator};

use crate::boundary::BoundaryPass;
use crate::diagnostics::Diagnostics;

/// Default cap on rejections in a row before the run is abandoned.
pub const DEFAULT_MAX_CONSECUTIVE_REJECTIONS: u32 = 16;

/// `min_dt` used when none is configured, as a fraction of the run length.
pub const DEFAULT_MIN_DT_FRACTION: f64 = 1e-12;

// ── ConfigError ─────────────────────────────────────────────────

/// Errors detected while validating a [`SimulationConfig`] or [`Model`].
#[derive(Debug, PartialEq, Error)]
pub enum ConfigError {
    /// `t_end` does not lie strictly after `t_start`, or either is non-finite.
    #[error("invalid time span: t_start={t_start}, t_end={t_end}")]
    InvalidTimeSpan {
        /// Configured start time.
        t_start: f64,
        /// Configured end time.
        t_end: f64,
    },
    /// A step-size parameter is non-finite, non-positive or inconsistent.
    #[error("invalid {name}: {value}")]
    InvalidDt {
        /// Which parameter (`initial_dt`, `min_dt`, `max_dt`).
        name: &'static str,
        /// The offending value.
        value: f64,
    },
    /// `n_frames` is zero.
    #[error("n_frames must be at least 1")]
    NoFrames,
    /// `max_consecutive_rejections` is zero.
    #[error("max_consecutive_rejections must be at least 1")]
    NoRetries,
    /// Vacuum permittivity is non-finite or non-positive.
    #[error("epsilon0 must be finite and > 0, got {value}")]
    InvalidPermittivity {
        /// The offending value.
        value: f64,
    },
    /// No kinetic species were configured.
    #[error("no species configured")]
    NoSpecies,
    /// Two species share a name or a distribution field.
    #[error("species '{name}' configured twice")]
    DuplicateSpecies {
        /// Species name.
        name: String,
    },
    /// A field is bound to more than one role.
    #[error("field {field} bound as both {first} and {second}")]
    FieldReused {
        /// The field bound twice.
        field: FieldId,
        /// The first role.
        first: String,
        /// The second role.
        second: String,
    },
    /// An operator's declared signature does not admit the fields it was given.
    #[error(transparent)]
    Binding(#[from] BindingError),
    /// A field referenced by the model is missing or malformed.
    #[error(transparent)]
    Field(#[from] FieldError),
}

// ── SimulationConfig ────────────────────────────────────────────

/// Scalar run parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Simulation start time.
    pub t_start: f64,
    /// Simulation end time. The clock stops exactly here.
    pub t_end: f64,
    /// Number of frames written after the initial one.
    pub n_frames: u32,
    /// Step size of the first attempt.
    pub initial_dt: f64,
    /// Rejections in a row that abort the run.
    pub max_consecutive_rejections: u32,
    /// Smallest step a rejection may suggest. `None` means
    /// `DEFAULT_MIN_DT_FRACTION * (t_end - t_start)`.
    pub min_dt: Option<f64>,
    /// Upper bound applied to every suggested step.
    pub max_dt: Option<f64>,
    /// Vacuum permittivity used to project the plasma current into the field.
    pub epsilon0: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 1.0,
            n_frames: 1,
            initial_dt: 1e-2,
            max_consecutive_rejections: DEFAULT_MAX_CONSECUTIVE_REJECTIONS,
            min_dt: None,
            max_dt: None,
            epsilon0: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Validate the scalar parameters.
    ///
    /// Checks, in order: time span, frame count, retry cap, initial step,
    /// step floor, step cap, permittivity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Time span.
        if !(self.t_start.is_finite() && self.t_end.is_finite() && self.t_end > self.t_start) {
            return Err(ConfigError::InvalidTimeSpan {
                t_start: self.t_start,
                t_end: self.t_end,
            });
        }
        // 2. At least one frame after the initial one.
        if self.n_frames == 0 {
            return Err(ConfigError::NoFrames);
        }
        // 3. Retry cap.
        if self.max_consecutive_rejections == 0 {
            return Err(ConfigError::NoRetries);
        }
        // 4. Initial step.
        if !positive_finite(self.initial_dt) {
            return Err(ConfigError::InvalidDt {
                name: "initial_dt",
                value: self.initial_dt,
            });
        }
        // 5. Floor must be positive and not above the first step.
        let floor = self.resolved_min_dt();
        if !positive_finite(floor) || floor > self.initial_dt {
            return Err(ConfigError::InvalidDt {
                name: "min_dt",
                value: floor,
            });
        }
        // 6. Cap must be positive and not below the floor.
        if let Some(cap) = self.max_dt {
            if !positive_finite(cap) || cap < floor {
                return Err(ConfigError::InvalidDt {
                    name: "max_dt",
                    value: cap,
                });
            }
        }
        // 7. Permittivity.
        if !positive_finite(self.epsilon0) {
            return Err(ConfigError::InvalidPermittivity {
                value: self.epsilon0,
            });
        }
        Ok(())
    }

    /// The effective step floor.
    pub fn resolved_min_dt(&self) -> f64 {
        self.min_dt
            .unwrap_or(DEFAULT_MIN_DT_FRACTION * (self.t_end - self.t_start))
    }

    /// Apply `max_dt` to a step size.
    pub fn cap_dt(&self, dt: f64) -> f64 {
        match self.max_dt {
            Some(cap) => dt.min(cap),
            None => dt,
        }
    }

    /// Spacing between frame thresholds.
    pub fn frame_period(&self) -> f64 {
        (self.t_end - self.t_start) / f64::from(self.n_frames.max(1))
    }
}

fn positive_finite(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

// ── Model ───────────────────────────────────────────────────────

/// One kinetic species and the operators that act on its distribution.
pub struct Species {
    /// Species name, used in logs and derived-quantity names.
    pub name: String,
    /// Distribution function in the state group.
    pub field: FieldId,
    /// Charge weighting this species' momentum moment in the current.
    pub charge: f64,
    /// Kinetic advance. Inputs `[distribution, em]`, output `[distribution]`.
    pub kinetic: Box<dyn UpdateOperator>,
    /// Momentum moment. Input `[distribution]`, output `[current-shaped field]`.
    pub momentum: Box<dyn UpdateOperator>,
}

impl std::fmt::Debug for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Species")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("charge", &self.charge)
            .field("kinetic", &self.kinetic.name())
            .field("momentum", &self.momentum.name())
            .finish()
    }
}

/// Initial state plus every operator the driver calls.
pub struct Model {
    /// Initial field group. Becomes the simulation state.
    pub state: FieldGroup,
    /// Electromagnetic field in the state group. Its first three
    /// components receive the plasma current.
    pub em: FieldId,
    /// Field advance. Input `[em]`, output `[em]`.
    pub maxwell: Box<dyn UpdateOperator>,
    /// Kinetic species, in the order their currents are summed.
    pub species: Vec<Species>,
    /// Ghost fill applied after every stage.
    pub boundary: BoundaryPass,
    /// Frame output.
    pub diagnostics: Diagnostics,
}

impl Model {
    /// Check that every referenced field exists and no field plays two roles.
    pub(crate) fn check_layout(&self) -> Result<(), ConfigError> {
        if self.species.is_empty() {
            return Err(ConfigError::NoSpecies);
        }
        self.state.field(self.em)?;
        let mut roles: Vec<(FieldId, String)> = vec![(self.em, "em".to_string())];
        for sp in &self.species {
            if self.species.iter().filter(|o| o.name == sp.name).count() > 1 {
                return Err(ConfigError::DuplicateSpecies {
                    name: sp.name.clone(),
                });
            }
            self.state.field(sp.field)?;
            let role = format!("distribution of '{}'", sp.name);
            if let Some((_, first)) = roles.iter().find(|(id, _)| *id == sp.field) {
                return Err(ConfigError::FieldReused {
                    field: sp.field,
                    first: first.clone(),
                    second: role,
                });
            }
            roles.push((sp.field, role));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("fields", &self.state.len())
            .field("em", &self.em)
            .field("maxwell", &self.maxwell.name())
            .field("species", &self.species)
            .finish_non_exhaustive()
    }
}
