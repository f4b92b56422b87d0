//! Three-stage strong-stability-preserving Runge-Kutta step (Shu-Osher form).
//!
//! ```text
//! A: S1 = Stage(S0)                        boundary(S1)
//! B: S2 = Stage(S1); S1 = 3/4 S0 + 1/4 S2; boundary(S1)
//! C: S2 = Stage(S1); S1 = 1/3 S0 + 2/3 S2; boundary(S1)
//!    S0 = S1
//! ```
//!
//! A rejection in any stage ends the step immediately and leaves `S0`
//! untouched. Every stage is evaluated with the step's start time.

use std::time::{Duration, Instant};

use tracing::debug;
use vlasov_core::{FieldGroup, OperatorError};
use vlasov_operator::StepOutcome;

use crate::boundary::BoundaryPass;
use crate::stage::StageExecutor;

/// Weights of `(S0, S2)` after stage B.
pub const STAGE_B_WEIGHTS: (f64, f64) = (3.0 / 4.0, 1.0 / 4.0);

/// Weights of `(S0, S2)` after stage C.
pub const STAGE_C_WEIGHTS: (f64, f64) = (1.0 / 3.0, 2.0 / 3.0);

/// Drives the three stages and owns their scratch groups.
#[derive(Debug)]
pub struct Rk3Controller {
    stage: StageExecutor,
    boundary: BoundaryPass,
    s1: FieldGroup,
    s2: FieldGroup,
    stages_run: u32,
    boundary_time: Duration,
}

impl Rk3Controller {
    /// A controller whose scratch groups duplicate `layout`.
    pub fn new(stage: StageExecutor, boundary: BoundaryPass, layout: &FieldGroup) -> Self {
        Self {
            stage,
            boundary,
            s1: layout.duplicate(),
            s2: layout.duplicate(),
            stages_run: 0,
            boundary_time: Duration::ZERO,
        }
    }

    /// Attempt one step of size `dt` from time `t`.
    ///
    /// On acceptance `s0` holds the new state and the outcome carries
    /// stage C's suggestion. On rejection `s0` is unchanged and the
    /// outcome carries the rejecting stage's suggestion.
    ///
    /// # Errors
    ///
    /// Any operator error, a field contract violation, or a non-finite
    /// value in the committed state.
    pub fn step(
        &mut self,
        t: f64,
        dt: f64,
        s0: &mut FieldGroup,
    ) -> Result<StepOutcome, OperatorError> {
        self.stages_run = 0;
        self.boundary_time = Duration::ZERO;

        // A
        let a = self.run_stage(t, dt, StageInput::Initial(&*s0))?;
        if !a.accepted {
            return Ok(a);
        }
        self.fill_ghosts()?;

        // B
        let b = self.run_stage(t, dt, StageInput::Scratch)?;
        if !b.accepted {
            return Ok(b);
        }
        let (w0, w2) = STAGE_B_WEIGHTS;
        self.s1.combine(w0, s0, w2, &self.s2)?;
        self.fill_ghosts()?;

        // C
        let c = self.run_stage(t, dt, StageInput::Scratch)?;
        if !c.accepted {
            return Ok(c);
        }
        let (w0, w2) = STAGE_C_WEIGHTS;
        self.s1.combine(w0, s0, w2, &self.s2)?;
        self.fill_ghosts()?;

        for (_, field) in self.s1.iter() {
            if let Some(index) = field.first_non_finite() {
                return Err(OperatorError::NonFinite {
                    field: field.name().to_string(),
                    index,
                });
            }
        }

        s0.copy_from(&self.s1)?;
        Ok(StepOutcome::accept(c.suggested_dt))
    }

    fn run_stage(
        &mut self,
        t: f64,
        dt: f64,
        input: StageInput<'_>,
    ) -> Result<StepOutcome, OperatorError> {
        self.stages_run += 1;
        let outcome = match input {
            StageInput::Initial(s0) => self.stage.run(t, dt, s0, &mut self.s1)?,
            StageInput::Scratch => self.stage.run(t, dt, &self.s1, &mut self.s2)?,
        };
        debug!(
            stage = self.stages_run,
            accepted = outcome.accepted,
            "rk3 stage"
        );
        Ok(outcome)
    }

    fn fill_ghosts(&mut self) -> Result<(), OperatorError> {
        let start = Instant::now();
        self.boundary.apply(&mut self.s1)?;
        self.boundary_time += start.elapsed();
        Ok(())
    }

    /// Stages executed by the most recent [`step`](Self::step).
    pub fn stages_run(&self) -> u32 {
        self.stages_run
    }

    /// Time spent in ghost fills during the most recent step.
    pub fn boundary_time(&self) -> Duration {
        self.boundary_time
    }

    /// The stage executor.
    pub fn stage(&self) -> &StageExecutor {
        &self.stage
    }

    /// Mutable access to the stage executor.
    pub fn stage_mut(&mut self) -> &mut StageExecutor {
        &mut self.stage
    }

    /// The ghost-fill rules.
    pub fn boundary(&self) -> &BoundaryPass {
        &self.boundary
    }
}

/// Where a stage reads from: the committed state or the first scratch group.
enum StageInput<'a> {
    Initial(&'a FieldGroup),
    Scratch,
}
