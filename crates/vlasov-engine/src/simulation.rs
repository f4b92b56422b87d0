//! The adaptive time loop.
//!
//! [`Simulation`] owns the state group, the clock, the rollback snapshot
//! and the frame schedule. Each [`attempt_step`](Simulation::attempt_step)
//! snapshots the state, runs one RK3 step and either commits it or rolls
//! back and shrinks `dt`:
//!
//! ```text
//! Running -> StepAttempt -> Accepted -> (frame?) -> Running | Done
//!                        -> Rejected -> StepAttempt (same t, smaller dt)
//! ```
//!
//! # Ownership model
//!
//! `Simulation` is [`Send`] but not [`Sync`]. Every mutating method takes
//! `&mut self`, and [`state()`](Simulation::state) borrows from `self`,
//! so the state cannot be observed mid-step.

use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};
use vlasov_core::{Field, FieldError, FieldGroup, FrameIndex, OperatorError, StepId};
use vlasov_operator::StepOutcome;

use crate::checkpoint::Snapshot;
use crate::clock::SimulationClock;
use crate::config::{ConfigError, Model, SimulationConfig};
use crate::diagnostics::{Diagnostics, DiagnosticsError};
use crate::metrics::{micros, OperatorTimings, RunSummary, StepMetrics};
use crate::rk3::Rk3Controller;
use crate::schedule::FrameSchedule;
use crate::stage::StageExecutor;

// Fails to compile if any field is !Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulation>();
    }
};

// ── Errors ──────────────────────────────────────────────────────

/// Fatal errors from a step attempt.
///
/// A stability rejection is not an error; it shows up as a
/// [`StepReport`] with `accepted == false`.
#[derive(Debug, PartialEq, Error)]
pub enum StepError {
    /// An operator failed or produced non-finite values.
    #[error(transparent)]
    Operator(#[from] OperatorError),
    /// A field operation violated its contract.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// Too many rejections in a row.
    #[error("{rejections} consecutive rejections at t={time} (last dt={dt})")]
    RetryLimitExceeded {
        /// Time the step was being attempted from.
        time: f64,
        /// Rejections in a row.
        rejections: u32,
        /// Last step size attempted.
        dt: f64,
    },
    /// An operator suggested a step below the floor, non-positive, or NaN.
    #[error("suggested dt {dt} at t={time} is below the floor {floor}")]
    DtBelowFloor {
        /// Time of the attempt that produced the suggestion.
        time: f64,
        /// The suggestion.
        dt: f64,
        /// Configured floor.
        floor: f64,
    },
    /// The clock has already reached the end time.
    #[error("simulation already finished at t={time}")]
    Finished {
        /// Final time.
        time: f64,
    },
}

/// Fatal errors from [`Simulation::run`] and [`Simulation::advance`].
#[derive(Debug, Error)]
pub enum RunError {
    /// The time loop could not continue.
    #[error(transparent)]
    Step(#[from] StepError),
    /// A frame could not be produced or stored.
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),
}

// ── StepReport ──────────────────────────────────────────────────

/// What happened during one step attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Whether the attempt committed.
    pub accepted: bool,
    /// Clock time after the attempt.
    pub time: f64,
    /// Step size attempted.
    pub dt: f64,
    /// Step size the next attempt will use (before end-time clamping).
    pub next_dt: f64,
    /// Accepted steps so far.
    pub step: StepId,
    /// Timing data for the attempt.
    pub metrics: StepMetrics,
}

// ── Simulation ──────────────────────────────────────────────────

/// Adaptive SSP-RK3 driver over one field group.
pub struct Simulation {
    config: SimulationConfig,
    state: FieldGroup,
    controller: Rk3Controller,
    clock: SimulationClock,
    snapshot: Snapshot,
    schedule: FrameSchedule,
    diagnostics: Diagnostics,
    dt: f64,
    consecutive_rejections: u32,
    accepted_steps: u64,
    rejected_attempts: u64,
    steps_since_frame: u64,
    last_metrics: StepMetrics,
}

impl Simulation {
    /// Validate `config` and `model` and wire them into a driver.
    ///
    /// Ghosts of the initial state are filled before returning.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - a scalar parameter is out of range (see [`SimulationConfig::validate`]);
    /// - there are no species, a species is repeated, or a field is
    ///   bound to two roles;
    /// - an operator signature does not admit the fields it is bound to;
    /// - a boundary rule names an unknown field or axis.
    pub fn new(config: SimulationConfig, model: Model) -> Result<Self, ConfigError> {
        config.validate()?;
        model.check_layout()?;
        model.boundary.validate(&model.state)?;
        model.diagnostics.bind(&model.state)?;

        let Model {
            mut state,
            em,
            maxwell,
            species,
            boundary,
            diagnostics,
        } = model;
        let stage = StageExecutor::new(&state, em, maxwell, species, config.epsilon0)?;
        boundary.apply(&mut state)?;
        let controller = Rk3Controller::new(stage, boundary, &state);

        info!(
            fields = state.len(),
            species = controller.stage().species_count(),
            t_start = config.t_start,
            t_end = config.t_end,
            n_frames = config.n_frames,
            initial_dt = config.initial_dt,
            "simulation configured"
        );

        Ok(Self {
            clock: SimulationClock::new(config.t_start, config.t_end),
            schedule: FrameSchedule::new(config.t_start, config.t_end, config.n_frames),
            snapshot: Snapshot::new(&state),
            dt: config.cap_dt(config.initial_dt),
            config,
            state,
            controller,
            diagnostics,
            consecutive_rejections: 0,
            accepted_steps: 0,
            rejected_attempts: 0,
            steps_since_frame: 0,
            last_metrics: StepMetrics::default(),
        })
    }

    /// Run to `t_end`, writing frame 0 first if it has not been written.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        self.write_due_frame()?;
        while !self.clock.is_done() {
            self.advance()?;
        }
        let summary = self.summary();
        info!(
            steps = summary.accepted_steps,
            rejected = summary.rejected_attempts,
            frames = summary.frames_written,
            time = summary.final_time,
            "run complete"
        );
        Ok(summary)
    }

    /// One step attempt followed, if it committed, by any frame now due.
    pub fn advance(&mut self) -> Result<StepReport, RunError> {
        let report = self.attempt_step()?;
        if report.accepted {
            self.write_due_frame()?;
        }
        Ok(report)
    }

    /// Attempt one step from the current time.
    ///
    /// On acceptance the clock advances and `dt` becomes the step's
    /// suggestion. On rejection the state is restored bit-for-bit from
    /// the snapshot and `dt` becomes the rejecting stage's suggestion;
    /// the clock does not move.
    ///
    /// # Errors
    ///
    /// Operator and field failures, [`StepError::RetryLimitExceeded`],
    /// [`StepError::DtBelowFloor`], or [`StepError::Finished`] once the
    /// end time has been reached.
    pub fn attempt_step(&mut self) -> Result<StepReport, StepError> {
        if self.clock.is_done() {
            return Err(StepError::Finished {
                time: self.clock.time(),
            });
        }
        let start = Instant::now();
        let t = self.clock.time();
        let dt = self.clock.clamp(self.dt);

        self.snapshot.capture(&self.state)?;
        self.controller.stage_mut().timings_mut().begin_attempt();
        let outcome = match self.controller.step(t, dt, &mut self.state) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(time = t, dt, error = %e, "step failed");
                return Err(e.into());
            }
        };

        self.last_metrics = StepMetrics {
            total_us: micros(start.elapsed()),
            operator_us: self.controller.stage().timings().attempt_us(),
            boundary_us: micros(self.controller.boundary_time()),
            stages_run: self.controller.stages_run(),
            dt,
            accepted: outcome.accepted,
        };

        if outcome.accepted {
            self.commit(t, dt, outcome)
        } else {
            self.roll_back(t, dt, outcome)
        }
    }

    fn commit(&mut self, t: f64, dt: f64, outcome: StepOutcome) -> Result<StepReport, StepError> {
        self.clock.advance(dt);
        self.consecutive_rejections = 0;
        self.accepted_steps += 1;
        self.steps_since_frame += 1;
        self.dt = self.next_dt(t, outcome)?;

        info!(
            step = %self.clock.step(),
            time = self.clock.time(),
            dt,
            next_dt = self.dt,
            "step accepted"
        );
        Ok(self.report(dt))
    }

    fn roll_back(&mut self, t: f64, dt: f64, outcome: StepOutcome) -> Result<StepReport, StepError> {
        self.snapshot.restore(&mut self.state)?;
        self.consecutive_rejections += 1;
        self.rejected_attempts += 1;
        warn!(
            time = t,
            dt,
            suggested_dt = outcome.suggested_dt,
            consecutive = self.consecutive_rejections,
            "step rejected, rolling back"
        );

        if self.consecutive_rejections >= self.config.max_consecutive_rejections {
            error!(
                time = t,
                rejections = self.consecutive_rejections,
                "retry limit exceeded"
            );
            return Err(StepError::RetryLimitExceeded {
                time: t,
                rejections: self.consecutive_rejections,
                dt,
            });
        }
        self.dt = self.next_dt(t, outcome)?;
        Ok(self.report(dt))
    }

    /// Step size for the next attempt, from the outcome of this one.
    fn next_dt(&self, t: f64, outcome: StepOutcome) -> Result<f64, StepError> {
        let suggested = outcome.suggested_dt;
        if suggested == f64::INFINITY || (outcome.accepted && suggested.is_nan()) {
            return Ok(self.dt);
        }
        let floor = self.config.resolved_min_dt();
        if !(suggested >= floor) {
            error!(time = t, dt = suggested, floor, "suggested dt below floor");
            return Err(StepError::DtBelowFloor {
                time: t,
                dt: suggested,
                floor,
            });
        }
        Ok(self.config.cap_dt(suggested))
    }

    fn report(&self, dt: f64) -> StepReport {
        StepReport {
            accepted: self.last_metrics.accepted,
            time: self.clock.time(),
            dt,
            next_dt: self.dt,
            step: self.clock.step(),
            metrics: self.last_metrics.clone(),
        }
    }

    /// Write a frame if the schedule says one is due at the current time.
    ///
    /// Returns the index written, if any.
    pub fn write_due_frame(&mut self) -> Result<Option<FrameIndex>, DiagnosticsError> {
        let t = self.clock.time();
        if !self.schedule.is_due(t) {
            return Ok(None);
        }
        let frame = self.schedule.advance(t);
        if let Err(e) = self.diagnostics.write_frame(
            frame,
            t,
            &self.state,
            self.controller.stage_mut().timings_mut(),
        ) {
            error!(frame = %frame, time = t, error = %e, "frame write failed");
            return Err(e);
        }
        info!(
            frame = %frame,
            time = t,
            steps = self.steps_since_frame,
            "frame written"
        );
        self.steps_since_frame = 0;
        Ok(Some(frame))
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    /// Accepted steps so far.
    pub fn step(&self) -> StepId {
        self.clock.step()
    }

    /// Step size the next attempt will start from.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Whether the end time has been reached.
    pub fn is_done(&self) -> bool {
        self.clock.is_done()
    }

    /// The committed state.
    pub fn state(&self) -> &FieldGroup {
        &self.state
    }

    /// The run parameters.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Metrics from the most recent attempt.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Cumulative time per operator, diagnostics included.
    pub fn timings(&self) -> &OperatorTimings {
        self.controller.stage().timings()
    }

    /// Plasma current from the most recent stage.
    pub fn current(&self) -> &Field {
        self.controller.stage().current()
    }

    /// Rejections since the last accepted step.
    pub fn consecutive_rejections(&self) -> u32 {
        self.consecutive_rejections
    }

    /// Frames written so far, including frame 0.
    pub fn frames_written(&self) -> u32 {
        self.schedule.frames_written()
    }

    /// Counts and timings so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            accepted_steps: self.accepted_steps,
            rejected_attempts: self.rejected_attempts,
            frames_written: self.schedule.frames_written(),
            final_time: self.clock.time(),
            operator_time: self
                .timings()
                .iter()
                .map(|(name, d)| (name.to_string(), d))
                .collect(),
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("time", &self.clock.time())
            .field("step", &self.clock.step())
            .field("dt", &self.dt)
            .field("controller", &self.controller)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}
