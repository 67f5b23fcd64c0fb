use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fader_core::calibration::CalibrationTable;
use fader_core::mocks::RecordingMotor;
use fader_core::{ControlCfg, GoalHandle, MotorGuard, SafetyCfg, SeekController};
use std::time::Instant;

// Triangle sweep across the full ADC range, like a fader being ridden.
fn synth_ticks(n: usize) -> Vec<u16> {
    (0..n)
        .map(|i| {
            let phase = (i % 2046) as u16;
            if phase < 1023 { phase } else { 2046 - phase }
        })
        .collect()
}

fn bench_map(c: &mut Criterion) {
    let table = CalibrationTable::default();
    let ticks = synth_ticks(4096);
    c.bench_function("map_4096_ticks", |b| {
        b.iter(|| {
            let mut acc = 0.0f32;
            for &t in &ticks {
                acc += table.map(black_box(t));
            }
            black_box(acc)
        })
    });
}

fn bench_controller_step(c: &mut Criterion) {
    let table = CalibrationTable::default();
    let positions: Vec<f32> = synth_ticks(1024).into_iter().map(|t| table.map(t)).collect();
    c.bench_function("controller_step_1024", |b| {
        b.iter_batched(
            || {
                let ctl =
                    SeekController::new(&ControlCfg::default(), &SafetyCfg::default()).unwrap();
                let guard = MotorGuard::wake(RecordingMotor::new()).unwrap();
                let goal = GoalHandle::new();
                goal.set(Some(100.0));
                (ctl, guard, goal)
            },
            |(mut ctl, mut guard, goal)| {
                let now = Instant::now();
                for &p in &positions {
                    black_box(ctl.step(&mut guard, p, &goal, now).unwrap());
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_map, bench_controller_step);
criterion_main!(benches);
