//! Shared CFL bookkeeping for the explicit reference operators.

use vlasov_operator::StepOutcome;

/// Default target Courant number for suggested steps.
pub const DEFAULT_CFL: f64 = 0.9;

/// Default largest Courant number accepted before a step is rejected.
pub const DEFAULT_MAX_CFL: f64 = 1.0;

/// Outcome for an attempted `dt` given the fastest signal rate `rate`
/// (inverse seconds, `sum(|speed| / width)`).
///
/// Accepts when `dt * rate <= max_cfl` and always suggests `cfl / rate`.
/// A zero rate imposes no limit.
pub(crate) fn outcome(dt: f64, rate: f64, cfl: f64, max_cfl: f64) -> StepOutcome {
    if !(rate > 0.0) {
        return StepOutcome::unconstrained();
    }
    let suggested = cfl / rate;
    if dt * rate > max_cfl {
        StepOutcome::reject(suggested)
    } else {
        StepOutcome::accept(suggested)
    }
}

/// Validate a `(cfl, max_cfl)` pair from a builder.
pub(crate) fn check(cfl: f64, max_cfl: f64) -> Result<(), String> {
    if !(cfl > 0.0 && cfl.is_finite()) {
        return Err(format!("cfl must be finite and > 0, got {cfl}"));
    }
    if !(max_cfl >= cfl && max_cfl.is_finite()) {
        return Err(format!(
            "max_cfl must be finite and >= cfl ({cfl}), got {max_cfl}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_within_bound_and_suggests_target() {
        let o = outcome(0.1, 5.0, 0.9, 1.0);
        assert!(o.accepted);
        assert!((o.suggested_dt - 0.18).abs() < 1e-15);
    }

    #[test]
    fn rejects_past_max_cfl() {
        let o = outcome(0.3, 5.0, 0.9, 1.0);
        assert!(!o.accepted);
        assert!(o.suggested_dt < 0.3);
    }

    #[test]
    fn zero_rate_is_unconstrained() {
        assert_eq!(outcome(1.0e9, 0.0, 0.9, 1.0), StepOutcome::unconstrained());
    }

    #[test]
    fn check_orders_cfl_pair() {
        assert!(check(0.9, 1.0).is_ok());
        assert!(check(0.0, 1.0).unwrap_err().contains("cfl"));
        assert!(check(0.9, 0.5).unwrap_err().contains("max_cfl"));
    }
}
