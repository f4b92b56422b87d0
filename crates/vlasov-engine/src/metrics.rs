//! Per-attempt metrics and cumulative operator timings.
//!
//! [`StepMetrics`] describes the most recent step attempt, accepted or
//! not. [`OperatorTimings`] accumulates wall time per operator over the
//! whole run. [`RunSummary`] is what [`Simulation::run`](crate::Simulation::run)
//! returns on success.

use std::time::Duration;

use indexmap::IndexMap;

/// Timing data collected during a single step attempt.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the whole attempt, in microseconds.
    pub total_us: u64,
    /// Per-operator execution times for this attempt: `(name, microseconds)`.
    pub operator_us: Vec<(String, u64)>,
    /// Time spent in ghost fills between stages, in microseconds.
    pub boundary_us: u64,
    /// RK stages executed before the attempt finished or aborted.
    pub stages_run: u32,
    /// Step size attempted.
    pub dt: f64,
    /// Whether the attempt committed.
    pub accepted: bool,
}

/// Cumulative wall time spent inside each operator.
///
/// Keys are operator names in first-call order. Operators sharing a name
/// share an entry.
#[derive(Clone, Debug, Default)]
pub struct OperatorTimings {
    cumulative: IndexMap<String, Duration>,
    attempt: IndexMap<String, Duration>,
}

impl OperatorTimings {
    /// Empty timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `elapsed` to the entry for `operator`.
    pub fn record(&mut self, operator: &str, elapsed: Duration) {
        add(&mut self.cumulative, operator, elapsed);
        add(&mut self.attempt, operator, elapsed);
    }

    /// Total time spent in `operator` since the run started.
    pub fn cumulative(&self, operator: &str) -> Duration {
        self.cumulative
            .get(operator)
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Iterate over `(name, cumulative time)` in first-call order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.cumulative.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sum over all operators.
    pub fn total(&self) -> Duration {
        self.cumulative.values().sum()
    }

    /// Forget the per-attempt times, keeping the cumulative ones.
    pub fn begin_attempt(&mut self) {
        self.attempt.clear();
    }

    /// Per-operator microseconds since the last [`begin_attempt`](Self::begin_attempt).
    pub fn attempt_us(&self) -> Vec<(String, u64)> {
        self.attempt
            .iter()
            .map(|(k, v)| (k.clone(), micros(*v)))
            .collect()
    }
}

fn add(map: &mut IndexMap<String, Duration>, operator: &str, elapsed: Duration) {
    match map.get_mut(operator) {
        Some(total) => *total += elapsed,
        None => {
            map.insert(operator.to_string(), elapsed);
        }
    }
}

pub(crate) fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

/// Outcome of a completed run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Steps committed.
    pub accepted_steps: u64,
    /// Attempts rolled back.
    pub rejected_attempts: u64,
    /// Frames written, including frame 0.
    pub frames_written: u32,
    /// Clock time when the run stopped.
    pub final_time: f64,
    /// Cumulative time per operator, in first-call order.
    pub operator_time: Vec<(String, Duration)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert!(m.operator_us.is_empty());
        assert_eq!(m.stages_run, 0);
        assert!(!m.accepted);
    }

    #[test]
    fn timings_accumulate_in_first_call_order() {
        let mut t = OperatorTimings::new();
        t.record("kinetic", Duration::from_micros(5));
        t.record("maxwell", Duration::from_micros(2));
        t.record("kinetic", Duration::from_micros(3));

        assert_eq!(t.cumulative("kinetic"), Duration::from_micros(8));
        assert_eq!(t.cumulative("missing"), Duration::ZERO);
        assert_eq!(t.total(), Duration::from_micros(10));
        let names: Vec<&str> = t.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["kinetic", "maxwell"]);
    }

    #[test]
    fn attempt_window_resets_without_losing_totals() {
        let mut t = OperatorTimings::new();
        t.record("kinetic", Duration::from_micros(5));
        t.begin_attempt();
        t.record("maxwell", Duration::from_micros(7));

        assert_eq!(t.attempt_us(), vec![("maxwell".to_string(), 7)]);
        assert_eq!(t.cumulative("kinetic"), Duration::from_micros(5));
    }
}
