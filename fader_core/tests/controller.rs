use std::time::Duration;

use fader_core::mocks::{MotorCall, RecordingMotor};
use fader_core::{
    ControlCfg, ControllerState, FaderEvent, GoalHandle, MotorGuard, SafetyCfg, SeekController,
};
use fader_traits::Clock;
use fader_traits::clock::test_clock::TestClock;
use rstest::{fixture, rstest};

struct Rig {
    ctl: SeekController,
    motor: RecordingMotor,
    guard: MotorGuard<RecordingMotor>,
    goal: GoalHandle,
    clock: TestClock,
}

impl Rig {
    /// Feed `position` as if sampled `at_ms` after the rig was built.
    fn step(&mut self, position: f32, at_ms: u64) -> Option<FaderEvent> {
        let at = Duration::from_millis(at_ms);
        self.clock.advance(at.saturating_sub(self.clock.elapsed()));
        self.ctl
            .step(&mut self.guard, position, &self.goal, self.clock.now())
            .unwrap()
    }
}

#[fixture]
fn rig() -> Rig {
    let motor = RecordingMotor::new();
    let guard = MotorGuard::wake(motor.clone()).unwrap();
    motor.clear();
    Rig {
        ctl: SeekController::new(&ControlCfg::default(), &SafetyCfg::default()).unwrap(),
        motor,
        guard,
        goal: GoalHandle::new(),
        clock: TestClock::new(),
    }
}

#[rstest]
fn far_goal_drives_forward_at_full_speed(mut rig: Rig) {
    rig.goal.set(Some(75.0));
    assert_eq!(rig.step(50.0, 0), None);
    assert_eq!(rig.ctl.state(), ControllerState::Seeking);
    assert_eq!(
        rig.motor.calls(),
        vec![MotorCall::Speed(100), MotorCall::Forward]
    );
}

#[rstest]
fn goal_below_drives_backward(mut rig: Rig) {
    rig.goal.set(Some(20.0));
    rig.step(30.0, 0);
    assert_eq!(
        rig.motor.calls(),
        vec![MotorCall::Speed(80), MotorCall::Backward]
    );
}

#[rstest]
fn within_settle_threshold_arrives(mut rig: Rig) {
    rig.goal.set(Some(75.0));
    let ev = rig.step(74.2, 0);
    assert_eq!(
        ev,
        Some(FaderEvent::Arrived {
            goal: 75.0,
            position: 74.2
        })
    );
    assert_eq!(rig.goal.get(), None);
    assert_eq!(rig.motor.calls(), vec![MotorCall::Speed(0), MotorCall::Brake]);
    assert_eq!(rig.ctl.state(), ControllerState::Settling);
}

#[rstest]
fn commands_are_only_sent_on_change(mut rig: Rig) {
    rig.goal.set(Some(90.0));
    rig.step(10.0, 0);
    rig.step(12.0, 16);
    rig.step(14.0, 32);
    assert_eq!(
        rig.motor.calls(),
        vec![MotorCall::Speed(100), MotorCall::Forward]
    );
    // Entering the slow tier only changes speed.
    rig.step(70.0, 48);
    assert_eq!(
        rig.motor.calls(),
        vec![MotorCall::Speed(100), MotorCall::Forward, MotorCall::Speed(80)]
    );
}

#[rstest]
fn out_of_range_goal_is_clamped(mut rig: Rig) {
    rig.goal.set(Some(150.0));
    let ev = rig.step(99.5, 0);
    assert_eq!(
        ev,
        Some(FaderEvent::Arrived {
            goal: 100.0,
            position: 99.5
        })
    );
    assert_eq!(rig.goal.get(), None);
}

#[rstest]
fn stalled_knob_triggers_safety_stop(mut rig: Rig) {
    rig.goal.set(Some(75.0));
    for i in 0..4 {
        assert_eq!(rig.step(50.0 + 0.01 * i as f32, i * 16), None);
    }
    let ev = rig.step(50.04, 64);
    assert_eq!(
        ev,
        Some(FaderEvent::SafetyStop {
            goal: 75.0,
            position: 50.04
        })
    );
    assert_eq!(rig.goal.get(), None);
    assert_eq!(rig.ctl.state(), ControllerState::SafetyStopped);
    assert_eq!(
        rig.motor.calls(),
        vec![
            MotorCall::Speed(100),
            MotorCall::Forward,
            MotorCall::Speed(0),
            MotorCall::Brake
        ]
    );
}

#[rstest]
fn moving_knob_keeps_seeking(mut rig: Rig) {
    rig.goal.set(Some(90.0));
    for i in 0..20u64 {
        assert_eq!(rig.step(10.0 + i as f32, i * 16), None);
    }
    assert!(rig.ctl.is_seeking());
}

#[rstest]
fn new_goal_resets_safety_window(mut rig: Rig) {
    rig.goal.set(Some(75.0));
    for i in 0..4 {
        assert_eq!(rig.step(50.0, i * 16), None);
    }
    rig.goal.set(Some(80.0));
    for i in 4..8 {
        assert_eq!(rig.step(50.0, i * 16), None, "step {i}");
    }
    assert!(matches!(
        rig.step(50.0, 128),
        Some(FaderEvent::SafetyStop { goal, .. }) if goal == 80.0
    ));
}

#[rstest]
fn external_clear_cancels_seek(mut rig: Rig) {
    rig.goal.set(Some(75.0));
    rig.step(50.0, 0);
    rig.goal.clear();
    assert_eq!(
        rig.step(55.0, 16),
        Some(FaderEvent::Cancelled { position: 55.0 })
    );
    assert_eq!(
        rig.motor.calls(),
        vec![
            MotorCall::Speed(100),
            MotorCall::Forward,
            MotorCall::Speed(0),
            MotorCall::Brake
        ]
    );
    // Quiet during the cooldown, then idle positions flow again.
    assert_eq!(rig.step(56.0, 100), None);
    assert_eq!(rig.step(57.0, 166), Some(FaderEvent::Position(57.0)));
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
}

#[rstest]
fn idle_positions_wait_for_cooldown_after_arrival(mut rig: Rig) {
    assert_eq!(rig.step(40.0, 0), Some(FaderEvent::Position(40.0)));
    rig.goal.set(Some(60.0));
    assert!(matches!(rig.step(59.5, 10), Some(FaderEvent::Arrived { .. })));
    assert_eq!(rig.step(59.5, 50), None);
    assert_eq!(rig.step(59.6, 159), None);
    assert_eq!(rig.step(59.6, 160), Some(FaderEvent::Position(59.6)));
}

#[rstest]
fn goal_during_cooldown_starts_new_seek(mut rig: Rig) {
    rig.goal.set(Some(60.0));
    rig.step(59.5, 0);
    rig.goal.set(Some(20.0));
    assert_eq!(rig.step(59.5, 20), None);
    assert!(rig.ctl.is_seeking());
    assert_eq!(rig.motor.calls().last(), Some(&MotorCall::Backward));
}

#[rstest]
fn motor_failure_propagates(mut rig: Rig) {
    rig.motor.fail_on_motion();
    rig.goal.set(Some(75.0));
    let err = rig
        .ctl
        .step(&mut rig.guard, 50.0, &rig.goal, rig.clock.now())
        .unwrap_err();
    assert!(err.downcast_ref::<fader_core::FaderError>().is_some());
}
