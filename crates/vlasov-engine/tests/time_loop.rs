//! Integration tests: accept/reject control flow of the adaptive loop.
//!
//! Uses mock operators from `vlasov-test-utils` so every stage outcome is
//! scripted and the expected `dt` sequence is exact.

use vlasov_core::{FrameIndex, OperatorError, StepId};
use vlasov_engine::{Diagnostics, Simulation, SimulationConfig, StepError};
use vlasov_operator::StepOutcome;
use vlasov_test_utils::{
    ConstOperator, FailingOperator, MemorySink, ScriptedOperator, StableLimitOperator,
    ToyModelBuilder,
};

fn config(initial_dt: f64) -> SimulationConfig {
    SimulationConfig {
        t_start: 0.0,
        t_end: 1.0,
        n_frames: 5,
        initial_dt,
        ..SimulationConfig::default()
    }
}

fn scripted(
    script: impl IntoIterator<Item = StepOutcome>,
    fallback: StepOutcome,
) -> ScriptedOperator {
    ScriptedOperator::new("kinetic[elc]", 2, script, fallback)
}

// ---------------------------------------------------------------
// Rejection and retry
// ---------------------------------------------------------------

#[test]
fn forced_rejection_retries_once_at_half_dt() {
    let kinetic = scripted([StepOutcome::reject(0.05)], StepOutcome::accept(0.07));
    let log = kinetic.log();
    let model = ToyModelBuilder::new(4)
        .species_with("elc", -1.0, Box::new(kinetic))
        .build();
    let mut sim = Simulation::new(config(0.1), model).unwrap();
    let before = sim.state().duplicate();

    let first = sim.attempt_step().unwrap();
    assert!(!first.accepted);
    assert_eq!(first.metrics.stages_run, 1);
    assert_eq!(sim.time(), 0.0);
    assert_eq!(sim.step(), StepId(0));
    assert_eq!(sim.dt(), 0.05);
    assert!(sim.state().bit_eq(&before));

    let second = sim.attempt_step().unwrap();
    assert!(second.accepted);
    assert_eq!(second.dt, 0.05);
    assert_eq!(second.metrics.stages_run, 3);
    assert_eq!(sim.time(), 0.05);
    assert_eq!(sim.step(), StepId(1));
    // the retry's own suggestion, not the rejected attempt's
    assert_eq!(sim.dt(), 0.07);
    assert_eq!(log.dts(), vec![0.1, 0.05, 0.05, 0.05]);
    assert_eq!(sim.summary().rejected_attempts, 1);
}

#[test]
fn rejection_in_late_stage_leaves_state_bit_identical() {
    let kinetic = scripted(
        [StepOutcome::accept(1.0), StepOutcome::accept(1.0), StepOutcome::reject(0.02)],
        StepOutcome::accept(1.0),
    );
    let model = ToyModelBuilder::new(6)
        .species_with("elc", -1.0, Box::new(kinetic))
        .build();
    let mut sim = Simulation::new(config(0.1), model).unwrap();
    let before = sim.state().duplicate();

    let report = sim.attempt_step().unwrap();
    assert!(!report.accepted);
    assert_eq!(report.metrics.stages_run, 3);
    assert!(sim.state().bit_eq(&before));
    assert_eq!(sim.dt(), 0.02);
    assert_eq!(sim.consecutive_rejections(), 1);

    assert!(sim.attempt_step().unwrap().accepted);
    assert_eq!(sim.consecutive_rejections(), 0);
}

#[test]
fn retry_limit_aborts_run() {
    let kinetic = scripted([], StepOutcome::reject(0.05));
    let model = ToyModelBuilder::new(4)
        .species_with("elc", -1.0, Box::new(kinetic))
        .build();
    let cfg = SimulationConfig {
        max_consecutive_rejections: 3,
        ..config(0.1)
    };
    let mut sim = Simulation::new(cfg, model).unwrap();

    assert!(!sim.attempt_step().unwrap().accepted);
    assert!(!sim.attempt_step().unwrap().accepted);
    match sim.attempt_step() {
        Err(StepError::RetryLimitExceeded {
            rejections, dt, ..
        }) => {
            assert_eq!(rejections, 3);
            assert_eq!(dt, 0.05);
        }
        other => panic!("expected RetryLimitExceeded, got {other:?}"),
    }
    assert_eq!(sim.time(), 0.0);
}

#[test]
fn suggestion_below_floor_is_fatal() {
    for bad in [1e-20, 0.0, -1.0, f64::NAN] {
        let kinetic = scripted([], StepOutcome::reject(bad));
        let model = ToyModelBuilder::new(4)
            .species_with("elc", -1.0, Box::new(kinetic))
            .build();
        let mut sim = Simulation::new(config(0.1), model).unwrap();
        match sim.attempt_step() {
            Err(StepError::DtBelowFloor { floor, .. }) => assert_eq!(floor, 1e-12),
            other => panic!("expected DtBelowFloor for {bad}, got {other:?}"),
        }
    }
}

// ---------------------------------------------------------------
// Step-size policy
// ---------------------------------------------------------------

#[test]
fn unconstrained_operators_keep_current_dt() {
    let model = ToyModelBuilder::new(4).species("elc", -1.0).build();
    let mut sim = Simulation::new(config(0.125), model).unwrap();
    sim.attempt_step().unwrap();
    assert_eq!(sim.dt(), 0.125);
}

#[test]
fn max_dt_caps_suggestions() {
    let kinetic = scripted([], StepOutcome::accept(10.0));
    let model = ToyModelBuilder::new(4)
        .species_with("elc", -1.0, Box::new(kinetic))
        .build();
    let cfg = SimulationConfig {
        max_dt: Some(0.2),
        ..config(0.1)
    };
    let mut sim = Simulation::new(cfg, model).unwrap();
    let report = sim.attempt_step().unwrap();
    assert_eq!(report.next_dt, 0.2);
}

#[test]
fn last_step_is_clamped_to_end_time() {
    let model = ToyModelBuilder::new(4).species("elc", -1.0).build();
    let mut sim = Simulation::new(config(0.3), model).unwrap();
    let mut dts = Vec::new();
    while !sim.is_done() {
        dts.push(sim.attempt_step().unwrap().dt);
    }
    assert_eq!(sim.time(), 1.0);
    assert_eq!(dts.len(), 4);
    assert!((dts[3] - 0.1).abs() < 1e-12);
    // clamping does not shrink the step carried forward
    assert_eq!(sim.dt(), 0.3);
    assert!(matches!(
        sim.attempt_step(),
        Err(StepError::Finished { time }) if time == 1.0
    ));
}

#[test]
fn clock_is_monotonic_and_never_overshoots() {
    let model = ToyModelBuilder::new(4)
        .species_with("elc", -1.0, Box::new(StableLimitOperator::new("cfl", 2, 0.07)))
        .build();
    let mut sim = Simulation::new(config(0.5), model).unwrap();
    let mut last = sim.time();
    while !sim.is_done() {
        let report = sim.attempt_step().unwrap();
        if report.accepted {
            assert!(sim.time() > last);
        } else {
            assert_eq!(sim.time(), last);
        }
        assert!(sim.time() <= 1.0);
        last = sim.time();
    }
    assert_eq!(sim.time(), 1.0);
}

// ---------------------------------------------------------------
// Fatal operator failures
// ---------------------------------------------------------------

#[test]
fn non_finite_result_is_fatal() {
    let model = ToyModelBuilder::new(4)
        .species("elc", -1.0)
        .maxwell(Box::new(ConstOperator::new("maxwell", 1, f64::NAN)))
        .build();
    let mut sim = Simulation::new(config(0.1), model).unwrap();
    let before = sim.state().duplicate();
    match sim.attempt_step() {
        Err(StepError::Operator(OperatorError::NonFinite { field, .. })) => {
            assert_eq!(field, "em")
        }
        other => panic!("expected NonFinite, got {other:?}"),
    }
    assert!(sim.state().bit_eq(&before));
    assert_eq!(sim.time(), 0.0);
}

#[test]
fn operator_error_surfaces() {
    let model = ToyModelBuilder::new(4)
        .species("elc", -1.0)
        .maxwell(Box::new(FailingOperator::new("maxwell", 1, 4)))
        .build();
    let mut sim = Simulation::new(config(0.1), model).unwrap();
    // three calls in the first step, the fifth call fails in stage B
    assert!(sim.attempt_step().unwrap().accepted);
    match sim.attempt_step() {
        Err(StepError::Operator(OperatorError::ExecutionFailed { reason })) => {
            assert!(reason.contains("deliberate"))
        }
        other => panic!("expected ExecutionFailed, got {other:?}"),
    }
    assert_eq!(sim.step(), StepId(1));
}

// ---------------------------------------------------------------
// Frames
// ---------------------------------------------------------------

#[test]
fn frames_follow_fixed_cadence() {
    let sink = MemorySink::new();
    let model = ToyModelBuilder::new(4)
        .species_with("elc", -1.0, Box::new(StableLimitOperator::new("cfl", 2, 0.03)))
        .diagnostics(Diagnostics::new(Box::new(sink.clone())))
        .build();
    let mut sim = Simulation::new(config(0.1), model).unwrap();
    let summary = sim.run().unwrap();

    assert_eq!(summary.final_time, 1.0);
    assert_eq!(summary.frames_written, 6);
    assert_eq!(summary.rejected_attempts, 1);
    assert!(summary.accepted_steps >= 34);

    let frames = sink.frames();
    assert_eq!(frames.len(), 6);
    assert_eq!(frames[0], (FrameIndex(0), 0.0));
    for (k, (frame, time)) in frames.iter().enumerate() {
        assert_eq!(*frame, FrameIndex(k as u32));
        let nominal = 0.2 * k as f64;
        assert!(*time >= nominal - 1e-9, "frame {k} early at {time}");
        assert!(*time - nominal <= 0.03 + 1e-9, "frame {k} late at {time}");
    }
    assert_eq!(frames[5].1, 1.0);

    // every state member is persisted in every frame
    assert_eq!(sink.fields().len(), 6 * 2);
    assert!(sink.field("em", FrameIndex(5)).is_some());
    assert_eq!(sink.flushes(), 6);
}

#[test]
fn one_step_past_every_threshold_still_ends_with_final_frame() {
    let sink = MemorySink::new();
    let model = ToyModelBuilder::new(2)
        .species("elc", -1.0)
        .diagnostics(Diagnostics::new(Box::new(sink.clone())))
        .build();
    let cfg = SimulationConfig {
        n_frames: 10,
        ..config(0.45)
    };
    let mut sim = Simulation::new(cfg, model).unwrap();
    sim.run().unwrap();

    let frames = sink.frames();
    assert_eq!(frames.first(), Some(&(FrameIndex(0), 0.0)));
    assert_eq!(frames.last().map(|f| f.1), Some(1.0));
    assert!(frames.len() <= 11);
}

#[test]
fn operator_timings_cover_every_operator() {
    let model = ToyModelBuilder::new(4)
        .species("elc", -1.0)
        .species("ion", 1.0)
        .build();
    let mut sim = Simulation::new(config(0.25), model).unwrap();
    sim.run().unwrap();
    let names: Vec<String> = sim.timings().iter().map(|(n, _)| n.to_string()).collect();
    assert_eq!(
        names,
        ["kinetic[elc]", "kinetic[ion]", "maxwell", "BroadcastMoment"]
    );
    let last = sim.last_metrics();
    assert!(last.accepted);
    assert_eq!(last.stages_run, 3);
    assert_eq!(last.operator_us.len(), 4);
}
