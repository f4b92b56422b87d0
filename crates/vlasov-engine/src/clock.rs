//! Simulation time and accepted-step counter.

use vlasov_core::StepId;

/// Non-decreasing simulation time that never passes `t_end`.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationClock {
    time: f64,
    t_end: f64,
    step: StepId,
}

impl SimulationClock {
    /// A clock at `t_start` that stops at `t_end`.
    pub fn new(t_start: f64, t_end: f64) -> Self {
        Self {
            time: t_start,
            t_end,
            step: StepId::default(),
        }
    }

    /// Current time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// End of the run.
    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    /// Accepted steps so far.
    pub fn step(&self) -> StepId {
        self.step
    }

    /// Time left before `t_end`.
    pub fn remaining(&self) -> f64 {
        (self.t_end - self.time).max(0.0)
    }

    /// Whether the end time has been reached.
    pub fn is_done(&self) -> bool {
        self.time >= self.t_end
    }

    /// `dt` shortened so that the step ends no later than `t_end`.
    pub fn clamp(&self, dt: f64) -> f64 {
        dt.min(self.remaining())
    }

    /// Commit an accepted step of size `dt`.
    ///
    /// A step that lands within rounding of `t_end` snaps onto it exactly.
    pub fn advance(&mut self, dt: f64) {
        let next = self.time + self.clamp(dt);
        self.time = if self.t_end - next <= snap_tolerance(self.t_end) {
            self.t_end
        } else {
            next
        };
        self.step = self.step.next();
    }
}

fn snap_tolerance(t_end: f64) -> f64 {
    4.0 * f64::EPSILON * t_end.abs().max(1.0)
}
