//! One Runge-Kutta sub-stage across every operator.
//!
//! [`StageExecutor::run`] reads an input group and writes an output group
//! of the same layout:
//!
//! 1. each species' kinetic advance `(distf_in, em_in) -> distf_out`;
//! 2. the field advance `em_in -> em_out`;
//! 3. the plasma current `J = sum_s q_s M1(distf_in_s)`, summed in
//!    species order from zero;
//! 4. `em_out[0..3] += -(dt / epsilon0) * J`.
//!
//! Every output is written even when an operator rejects; the combined
//! [`StepOutcome`] tells the caller whether to keep them.

use std::time::Instant;

use tracing::debug;
use vlasov_core::{Field, FieldGroup, FieldId, OperatorError};
use vlasov_operator::{validate_binding, AdvanceContext, StepOutcome, UpdateOperator};

use crate::config::{ConfigError, Species};
use crate::metrics::OperatorTimings;

/// Current components projected into the EM field.
pub const CURRENT_COMPONENTS: u32 = 3;

/// Executes a single stage and owns the scratch fields for the current.
pub struct StageExecutor {
    species: Vec<Species>,
    em: FieldId,
    maxwell: Box<dyn UpdateOperator>,
    epsilon0: f64,
    moment: Field,
    current: Field,
    timings: OperatorTimings,
}

impl StageExecutor {
    /// Wire operators to the members of `layout`.
    ///
    /// Every operator's signature is checked against the fields it will
    /// see; the current shares the EM grid with [`CURRENT_COMPONENTS`]
    /// components.
    pub fn new(
        layout: &FieldGroup,
        em: FieldId,
        maxwell: Box<dyn UpdateOperator>,
        species: Vec<Species>,
        epsilon0: f64,
    ) -> Result<Self, ConfigError> {
        let em_shape = layout.field(em)?.shape();
        let current_shape = em_shape.with_components(CURRENT_COMPONENTS)?;
        validate_binding(maxwell.as_ref(), &[em_shape], &[em_shape])?;
        for sp in &species {
            let dist = layout.field(sp.field)?.shape();
            validate_binding(sp.kinetic.as_ref(), &[dist, em_shape], &[dist])?;
            validate_binding(sp.momentum.as_ref(), &[dist], &[&current_shape])?;
        }
        Ok(Self {
            species,
            em,
            maxwell,
            epsilon0,
            moment: Field::zeros("moment", current_shape.clone()),
            current: Field::zeros("current", current_shape),
            timings: OperatorTimings::new(),
        })
    }

    /// Run one stage from `input` into `output`.
    ///
    /// `t` is the start of the step being attempted and `dt` its size.
    pub fn run(
        &mut self,
        t: f64,
        dt: f64,
        input: &FieldGroup,
        output: &mut FieldGroup,
    ) -> Result<StepOutcome, OperatorError> {
        let target = t + dt;
        let em_in = input.field(self.em)?;
        let mut outcome = StepOutcome::unconstrained();

        for sp in &self.species {
            let dist_in = input.field(sp.field)?;
            let dist_out = output.field_mut(sp.field)?;
            let o = call(
                sp.kinetic.as_ref(),
                &mut self.timings,
                t,
                target,
                &[dist_in, em_in],
                dist_out,
            )?;
            outcome = outcome.merge(o);
        }

        let em_out = output.field_mut(self.em)?;
        let o = call(
            self.maxwell.as_ref(),
            &mut self.timings,
            t,
            target,
            &[em_in],
            em_out,
        )?;
        outcome = outcome.merge(o);

        self.current.fill(0.0);
        for sp in &self.species {
            let dist_in = input.field(sp.field)?;
            let o = call(
                sp.momentum.as_ref(),
                &mut self.timings,
                t,
                target,
                &[dist_in],
                &mut self.moment,
            )?;
            outcome = outcome.merge(o);
            self.current.accumulate(sp.charge, &self.moment)?;
        }

        output
            .field_mut(self.em)?
            .accumulate_components(-dt / self.epsilon0, &self.current, 0)?;

        debug!(
            t,
            dt,
            accepted = outcome.accepted,
            suggested_dt = outcome.suggested_dt,
            "stage complete"
        );
        Ok(outcome)
    }

    /// The current computed by the most recent stage.
    pub fn current(&self) -> &Field {
        &self.current
    }

    /// Cumulative time per operator.
    pub fn timings(&self) -> &OperatorTimings {
        &self.timings
    }

    /// Mutable access for starting a new attempt window.
    pub fn timings_mut(&mut self) -> &mut OperatorTimings {
        &mut self.timings
    }

    /// Number of species.
    pub fn species_count(&self) -> usize {
        self.species.len()
    }
}

impl std::fmt::Debug for StageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageExecutor")
            .field("species", &self.species)
            .field("em", &self.em)
            .field("maxwell", &self.maxwell.name())
            .field("epsilon0", &self.epsilon0)
            .finish_non_exhaustive()
    }
}

/// Call one operator with a single output and record its wall time.
fn call(
    op: &dyn UpdateOperator,
    timings: &mut OperatorTimings,
    t: f64,
    target: f64,
    inputs: &[&Field],
    output: &mut Field,
) -> Result<StepOutcome, OperatorError> {
    let start = Instant::now();
    let mut outputs = [output];
    let mut ctx = AdvanceContext::new(op.name(), t, target, inputs, &mut outputs);
    let result = op.advance(&mut ctx);
    timings.record(op.name(), start.elapsed());
    result
}
