//! End-to-end control loop tests against the simulated fader.
//!
//! Uses the real monotonic clock at a fast sample rate so the loop thread
//! behaves like it does on hardware, just quicker.
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use fader_core::mocks::{RecordingMotor, ScriptedAdc};
use fader_core::{
    BuildError, CalibrationTable, FaderBuilder, FaderError, FaderEvent, FaderLoop, GoalHandle,
    LoopConfig, PositionFeed, SamplerCfg,
};
use fader_hardware::{SimConfig, SimulatedFader};
use fader_traits::MonotonicClock;

fn fast_cfg() -> LoopConfig {
    LoopConfig {
        sampler: SamplerCfg {
            sample_rate_hz: 1000,
            tolerance_ticks: 4,
        },
        ..LoopConfig::default()
    }
}

fn spawn(sim: &SimulatedFader) -> FaderLoop {
    FaderLoop::spawn(
        sim.adc(),
        sim.motor(),
        CalibrationTable::default(),
        fast_cfg(),
        Arc::new(MonotonicClock::new()),
    )
    .unwrap()
}

/// Wait for the first event matching `pred`, failing after `timeout`.
fn wait_for(fl: &FaderLoop, timeout: Duration, pred: impl Fn(&FaderEvent) -> bool) -> FaderEvent {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match fl.events().recv_timeout(left) {
            Ok(ev) if pred(&ev) => return ev,
            Ok(_) => {}
            Err(e) => panic!("no matching event: {e}"),
        }
    }
}

#[test]
fn seek_arrives_and_clears_goal() {
    let sim = SimulatedFader::default();
    let fl = spawn(&sim);
    fl.set_goal(Some(50.0));
    let ev = wait_for(&fl, Duration::from_secs(5), |e| {
        matches!(e, FaderEvent::Arrived { .. })
    });
    let FaderEvent::Arrived { goal, position } = ev else {
        unreachable!()
    };
    assert_eq!(goal, 50.0);
    assert!((position - 50.0).abs() < 1.0, "position {position}");
    assert_eq!(fl.goal().get(), None);
    assert!(sim.is_enabled());
    fl.shutdown().unwrap();
    assert!(!sim.is_enabled());
}

#[test]
fn stuck_knob_reports_safety_stop() {
    let sim = SimulatedFader::new(SimConfig {
        stuck: true,
        ..SimConfig::default()
    });
    let fl = spawn(&sim);
    fl.set_goal(Some(80.0));
    let ev = wait_for(&fl, Duration::from_secs(5), |e| {
        matches!(e, FaderEvent::SafetyStop { .. })
    });
    assert!(matches!(ev, FaderEvent::SafetyStop { goal, .. } if goal == 80.0));
    assert_eq!(fl.goal().get(), None);
    // The loop keeps running after a safety stop.
    assert!(!fl.is_finished());
    fl.shutdown().unwrap();
}

#[test]
fn manual_moves_are_reported() {
    let sim = SimulatedFader::default();
    let fl = spawn(&sim);
    sim.nudge_to(689.0);
    let ev = wait_for(&fl, Duration::from_secs(5), |e| {
        matches!(e, FaderEvent::Position(p) if (*p - 50.0).abs() < 0.01)
    });
    assert_eq!(ev.position(), 50.0);
    assert_eq!(fl.latest(), Some(50.0));
    fl.shutdown().unwrap();
}

#[test]
fn adc_failure_stops_loop_and_disables_motor() {
    let sim = SimulatedFader::new(SimConfig {
        fail_after: Some(20),
        ..SimConfig::default()
    });
    let fl = spawn(&sim);
    fl.set_goal(Some(90.0));
    let goal = fl.goal();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !fl.is_finished() {
        assert!(Instant::now() < deadline, "loop did not stop");
        std::thread::sleep(Duration::from_millis(5));
    }
    let err = fl.shutdown().unwrap_err();
    assert_eq!(err.downcast_ref::<FaderError>(), Some(&FaderError::Timeout));
    assert!(!sim.is_enabled());
    assert_eq!(goal.get(), None);
}

#[test]
fn shutdown_mid_seek_clears_goal_and_disables_motor() {
    let sim = SimulatedFader::new(SimConfig {
        ticks_per_read: 0.5,
        ..SimConfig::default()
    });
    let fl = spawn(&sim);
    let goal = fl.goal();
    fl.set_goal(Some(95.0));
    std::thread::sleep(Duration::from_millis(30));
    fl.shutdown().unwrap();
    assert!(!sim.is_enabled());
    assert_eq!(goal.get(), None);
}

#[test]
fn dropping_the_handle_stops_the_loop() {
    let sim = SimulatedFader::default();
    {
        let fl = spawn(&sim);
        fl.set_goal(Some(70.0));
    }
    assert!(!sim.is_enabled());
}

#[test]
fn run_returns_on_shutdown_flag() {
    let motor = RecordingMotor::new();
    let adc = ScriptedAdc::new([600]);
    let goal = GoalHandle::new();
    let (feed, rx) = PositionFeed::bounded(4);
    let flag = Arc::new(AtomicBool::new(true));
    fader_core::runner::run(
        adc,
        motor.clone(),
        &CalibrationTable::default(),
        &LoopConfig::default(),
        Arc::new(MonotonicClock::new()),
        &goal,
        &feed,
        flag,
    )
    .unwrap();
    assert!(rx.try_recv().is_err());
    assert!(!motor.is_enabled());
}

#[test]
fn builder_reports_missing_parts() {
    let err = FaderBuilder::new()
        .with_motor(RecordingMotor::new())
        .try_spawn()
        .err()
        .unwrap();
    assert_eq!(err.downcast_ref::<BuildError>(), Some(&BuildError::MissingAdc));
}

#[test]
fn builder_rejects_invalid_config_before_spawning() {
    let motor = RecordingMotor::new();
    let err = FaderBuilder::new()
        .with_adc(ScriptedAdc::new([600]))
        .with_motor(motor.clone())
        .with_event_capacity(0)
        .spawn()
        .err()
        .unwrap();
    assert!(err.downcast_ref::<BuildError>().is_some());
    assert!(motor.calls().is_empty());
}

#[test]
fn builder_spawns_with_simulator() {
    let sim = SimulatedFader::default();
    let fl = FaderBuilder::new()
        .with_adc(sim.adc())
        .with_motor(sim.motor())
        .with_sampler(fast_cfg().sampler)
        .spawn()
        .unwrap();
    fl.set_goal(Some(30.0));
    wait_for(&fl, Duration::from_secs(5), |e| {
        matches!(e, FaderEvent::Arrived { .. })
    });
    fl.shutdown().unwrap();
}
