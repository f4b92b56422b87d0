//! Reusable operator test fixtures.
//!
//! - [`CopyOperator`]: copies input 0 to output 0, never constrains `dt`.
//! - [`ConstOperator`]: writes a constant, never constrains `dt`.
//! - [`ScriptedOperator`]: copies, then returns pre-programmed outcomes.
//! - [`StableLimitOperator`]: copies, rejects any `dt` above a fixed limit.
//! - [`FailingOperator`]: fails deterministically after N calls.
//! - [`BroadcastMoment`]: a stand-in momentum moment.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vlasov_core::OperatorError;
use vlasov_operator::{AdvanceContext, ShapeRequirement, Signature, StepOutcome, UpdateOperator};

fn copy_through(ctx: &mut AdvanceContext<'_, '_>) -> Result<(), OperatorError> {
    let input = ctx.input(0)?;
    ctx.output(0)?.copy_from(input)?;
    Ok(())
}

/// Copies input 0 to output 0.
///
/// Declares `inputs` unconstrained input slots so it can stand in for a
/// kinetic advance (two inputs) or a field advance (one input).
pub struct CopyOperator {
    pub name: String,
    pub inputs: usize,
}

impl CopyOperator {
    pub fn new(name: impl Into<String>, inputs: usize) -> Self {
        Self {
            name: name.into(),
            inputs,
        }
    }
}

impl UpdateOperator for CopyOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        Signature::any(self.inputs, 1)
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        copy_through(ctx)?;
        Ok(StepOutcome::unconstrained())
    }
}

/// Writes a constant value into every element of output 0.
pub struct ConstOperator {
    pub name: String,
    pub inputs: usize,
    pub value: f64,
}

impl ConstOperator {
    pub fn new(name: impl Into<String>, inputs: usize, value: f64) -> Self {
        Self {
            name: name.into(),
            inputs,
            value,
        }
    }
}

impl UpdateOperator for ConstOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        Signature::any(self.inputs, 1)
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        ctx.output(0)?.fill(self.value);
        Ok(StepOutcome::unconstrained())
    }
}

/// Shared record of the calls a [`ScriptedOperator`] received.
#[derive(Debug, Default)]
pub struct CallLog {
    dts: Mutex<Vec<f64>>,
}

impl CallLog {
    /// Number of calls so far.
    pub fn calls(&self) -> usize {
        self.dts.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// The `dt` of every call, in order.
    pub fn dts(&self) -> Vec<f64> {
        self.dts.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

/// Copies input 0 to output 0, then returns the next scripted outcome.
///
/// Once the script runs out every call returns `fallback`. Keep the
/// [`CallLog`] from [`log`](Self::log) to inspect calls after the
/// operator has been boxed into a model.
pub struct ScriptedOperator {
    pub name: String,
    pub inputs: usize,
    script: Mutex<VecDeque<StepOutcome>>,
    fallback: StepOutcome,
    log: Arc<CallLog>,
}

impl ScriptedOperator {
    pub fn new(
        name: impl Into<String>,
        inputs: usize,
        script: impl IntoIterator<Item = StepOutcome>,
        fallback: StepOutcome,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            log: Arc::new(CallLog::default()),
        }
    }

    /// Handle to the call record.
    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

impl UpdateOperator for ScriptedOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        Signature::any(self.inputs, 1)
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        if let Ok(mut dts) = self.log.dts.lock() {
            dts.push(ctx.target_time() - ctx.current_time());
        }
        copy_through(ctx)?;
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or(self.fallback);
        Ok(next)
    }
}

/// Copies input 0 to output 0 and enforces `dt <= limit`.
///
/// Always suggests `limit`, like a CFL bound on a static field.
pub struct StableLimitOperator {
    pub name: String,
    pub inputs: usize,
    pub limit: f64,
}

impl StableLimitOperator {
    pub fn new(name: impl Into<String>, inputs: usize, limit: f64) -> Self {
        Self {
            name: name.into(),
            inputs,
            limit,
        }
    }
}

impl UpdateOperator for StableLimitOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        Signature::any(self.inputs, 1)
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        copy_through(ctx)?;
        if ctx.dt() > self.limit * (1.0 + 1e-12) {
            Ok(StepOutcome::reject(self.limit))
        } else {
            Ok(StepOutcome::accept(self.limit))
        }
    }
}

/// Fails after a configurable number of successful calls.
///
/// Uses `AtomicUsize` for the call counter so it satisfies `Send`.
pub struct FailingOperator {
    pub name: String,
    pub inputs: usize,
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingOperator {
    /// An operator that copies `succeed_count` times, then fails.
    pub fn new(name: impl Into<String>, inputs: usize, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            inputs,
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `advance()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl UpdateOperator for FailingOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        Signature::any(self.inputs, 1)
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(OperatorError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        copy_through(ctx)?;
        Ok(StepOutcome::unconstrained())
    }
}

/// Momentum-moment stand-in: every output component of a cell takes the
/// first input component of the same cell.
pub struct BroadcastMoment;

impl UpdateOperator for BroadcastMoment {
    fn name(&self) -> &str {
        "BroadcastMoment"
    }

    fn signature(&self) -> Signature {
        Signature::new([ShapeRequirement::Any], [ShapeRequirement::Components(3)])
    }

    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
        let input = ctx.input(0)?;
        let in_nc = input.shape().components() as usize;
        let src = input.as_slice();
        let out = ctx.output(0)?;
        let out_nc = out.shape().components() as usize;
        for (dst, cell) in out
            .as_mut_slice()
            .chunks_exact_mut(out_nc)
            .zip(src.chunks_exact(in_nc))
        {
            dst.fill(cell[0]);
        }
        Ok(StepOutcome::unconstrained())
    }
}
