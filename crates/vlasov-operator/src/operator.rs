//! The [`UpdateOperator`] trait and its [`StepOutcome`].
//!
//! An update operator is one numerical sub-step: a kinetic advance, a
//! field advance, a moment reduction, a diagnostic integral. The driver
//! binds its inputs and outputs through an [`AdvanceContext`] and never
//! depends on the concrete kernel behind the trait object.

use vlasov_core::OperatorError;

use crate::context::AdvanceContext;
use crate::signature::Signature;

/// Result of one operator call, or of a whole stage or step.
///
/// `suggested_dt` is meaningful whether or not the attempt was accepted:
/// on rejection it is a safe reduced step, on acceptance the largest step
/// the operator expects to be stable next time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    /// Whether the attempted `dt` satisfied the operator's stability bound.
    pub accepted: bool,
    /// Step size the operator recommends for the next attempt.
    pub suggested_dt: f64,
}

impl StepOutcome {
    /// An accepted attempt suggesting `suggested_dt` next.
    pub fn accept(suggested_dt: f64) -> Self {
        Self {
            accepted: true,
            suggested_dt,
        }
    }

    /// A rejected attempt; retry with `suggested_dt`.
    pub fn reject(suggested_dt: f64) -> Self {
        Self {
            accepted: false,
            suggested_dt,
        }
    }

    /// Accepted with no step-size constraint.
    ///
    /// The identity for [`merge`](Self::merge); returned by operators that
    /// impose no stability limit (moment reductions, integrals).
    pub fn unconstrained() -> Self {
        Self::accept(f64::INFINITY)
    }

    /// Combine two outcomes: accepted only if both are, suggesting the
    /// smaller step. A `NaN` suggestion on either side propagates.
    #[must_use]
    pub fn merge(self, other: StepOutcome) -> StepOutcome {
        let suggested_dt = if self.suggested_dt.is_nan() || other.suggested_dt.is_nan() {
            f64::NAN
        } else {
            self.suggested_dt.min(other.suggested_dt)
        };
        StepOutcome {
            accepted: self.accepted && other.accepted,
            suggested_dt,
        }
    }
}

/// One numerical sub-step applied to bound fields.
///
/// # Contract
///
/// - `advance()` MUST be deterministic: identical inputs and parameters
///   produce identical outputs.
/// - `advance()` writes only the context's outputs; inputs are shared
///   borrows and cannot be mutated.
/// - A `dt` that violates a stability bound is reported as
///   `Ok(StepOutcome { accepted: false, .. })`. Outputs are still written.
///   `Err` is reserved for contract violations and numerical failures,
///   which abort the run.
/// - `signature()` is called once when the operator is bound, not per call.
///
/// # Object safety
///
/// The trait is object-safe; the engine stores operators as
/// `Box<dyn UpdateOperator>`.
///
/// # Examples
///
/// An operator that copies its input and never constrains `dt`:
///
/// ```
/// use vlasov_core::{Field, FieldShape, OperatorError};
/// use vlasov_operator::{AdvanceContext, Signature, StepOutcome, UpdateOperator};
///
/// struct Passthrough;
///
/// impl UpdateOperator for Passthrough {
///     fn name(&self) -> &str { "passthrough" }
///
///     fn signature(&self) -> Signature { Signature::any(1, 1) }
///
///     fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError> {
///         let input = ctx.input(0)?;
///         ctx.output(0)?.copy_from(input)?;
///         Ok(StepOutcome::unconstrained())
///     }
/// }
///
/// let shape = FieldShape::uniform(&[4], 1, 1).unwrap();
/// let mut src = Field::zeros("src", shape.clone());
/// src.fill(2.0);
/// let mut dst = Field::zeros("dst", shape);
/// let inputs = [&src];
/// let mut outputs = [&mut dst];
/// let mut ctx = AdvanceContext::new("passthrough", 0.0, 0.1, &inputs, &mut outputs);
/// let outcome = Passthrough.advance(&mut ctx).unwrap();
/// assert!(outcome.accepted);
/// assert!(dst.as_slice().iter().all(|&v| v == 2.0));
/// ```
pub trait UpdateOperator: Send + 'static {
    /// Human-readable name for logs, errors, and timing keys.
    fn name(&self) -> &str;

    /// Shapes this operator expects at each input and output slot.
    fn signature(&self) -> Signature;

    /// Advance from `ctx.current_time()` to `ctx.target_time()`.
    fn advance(&self, ctx: &mut AdvanceContext<'_, '_>) -> Result<StepOutcome, OperatorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn merge_ands_acceptance_and_takes_min() {
        let a = StepOutcome::accept(0.5);
        let b = StepOutcome::reject(0.2);
        assert_eq!(a.merge(b), StepOutcome::reject(0.2));
        assert_eq!(b.merge(a), StepOutcome::reject(0.2));
        assert_eq!(
            StepOutcome::accept(0.3).merge(StepOutcome::accept(0.1)),
            StepOutcome::accept(0.1)
        );
    }

    #[test]
    fn unconstrained_is_merge_identity() {
        let r = StepOutcome::reject(0.05);
        assert_eq!(StepOutcome::unconstrained().merge(r), r);
        let a = StepOutcome::accept(1.5);
        assert_eq!(a.merge(StepOutcome::unconstrained()), a);
    }

    #[test]
    fn nan_suggestion_survives_merge() {
        let bad = StepOutcome::reject(f64::NAN);
        assert!(StepOutcome::unconstrained().merge(bad).suggested_dt.is_nan());
        assert!(bad.merge(StepOutcome::accept(0.1)).suggested_dt.is_nan());
    }

    proptest! {
        #[test]
        fn merge_is_order_independent(
            flags in proptest::collection::vec(any::<bool>(), 1..6),
            dts in proptest::collection::vec(1.0e-6f64..10.0, 6),
        ) {
            let outcomes: Vec<StepOutcome> = flags
                .iter()
                .zip(&dts)
                .map(|(&ok, &dt)| StepOutcome { accepted: ok, suggested_dt: dt })
                .collect();
            let fwd = outcomes.iter().fold(StepOutcome::unconstrained(), |acc, o| acc.merge(*o));
            let rev = outcomes.iter().rev().fold(StepOutcome::unconstrained(), |acc, o| acc.merge(*o));
            prop_assert_eq!(fwd, rev);
            prop_assert_eq!(fwd.accepted, flags.iter().all(|&f| f));
        }
    }
}
