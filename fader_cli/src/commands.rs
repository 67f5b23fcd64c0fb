//! Subcommand implementations.
//!
//! Results go to stdout (plain text or JSON lines); logs go to stderr.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::{Result, WrapErr};
use fader_core::config::{BoundsCfg, CrawlCfg, SweepCfg};
use fader_core::sampler::{RawMonitor, read_tick};
use fader_core::{
    CalibrationTable, Calibrator, FaderBuilder, FaderError, FaderEvent, FaderLoop, LoopConfig,
    SamplerCfg, SweepDirection,
};
use fader_traits::{Clock, MonotonicClock};
use serde_json::json;

use crate::cli::json_mode;
use crate::hw;

/// Poll interval for Ctrl-C and deadlines while waiting on events.
const POLL: Duration = Duration::from_millis(50);

/// Everything a subcommand needs: validated config, active table, Ctrl-C flag.
pub struct Ctx {
    pub cfg: fader_config::Config,
    pub table: CalibrationTable,
    pub shutdown: Arc<AtomicBool>,
}

impl Ctx {
    fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::new(MonotonicClock::new())
    }

    fn cancelled(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn spawn_loop(&self) -> Result<FaderLoop> {
        let (adc, motor) = hw::open(&self.cfg)?;
        FaderBuilder::new()
            .with_adc(adc)
            .with_motor(motor)
            .with_table(self.table.clone())
            .with_loop_config(LoopConfig::from(&self.cfg))
            .with_clock(self.clock())
            .spawn()
            .wrap_err("start control loop")
    }

    fn calibrator(&self) -> Result<Calibrator<hw::BoxedAdc, hw::BoxedMotor>> {
        let (adc, motor) = hw::open(&self.cfg)?;
        Ok(Calibrator::new(
            adc,
            motor,
            self.clock(),
            BoundsCfg::from(&self.cfg),
            SweepCfg::from(&self.cfg.sweep),
        )
        .with_crawl(CrawlCfg::from(&self.cfg.crawl))
        .with_cancel(self.shutdown.clone()))
    }
}

fn print_event(ev: &FaderEvent) {
    if json_mode() {
        let v = match *ev {
            FaderEvent::Position(p) => json!({ "event": "position", "position": p }),
            FaderEvent::Arrived { goal, position } => {
                json!({ "event": "arrived", "goal": goal, "position": position })
            }
            FaderEvent::SafetyStop { goal, position } => {
                json!({ "event": "safety_stop", "goal": goal, "position": position })
            }
            FaderEvent::Cancelled { position } => {
                json!({ "event": "cancelled", "position": position })
            }
        };
        println!("{v}");
    } else {
        match *ev {
            FaderEvent::Position(p) => println!("position {p:6.2}%"),
            FaderEvent::Arrived { goal, position } => {
                println!("arrived at {position:.2}% (goal {goal:.2}%)");
            }
            FaderEvent::SafetyStop { goal, position } => {
                println!("safety stop at {position:.2}% (goal {goal:.2}%)");
            }
            FaderEvent::Cancelled { position } => println!("cancelled at {position:.2}%"),
        }
    }
}

/// Stop the loop and surface its error, if any.
fn finish(fl: FaderLoop, outcome: Result<()>) -> Result<()> {
    let stopped = fl.shutdown().wrap_err("control loop");
    outcome.and(stopped)
}

pub fn seek(ctx: &Ctx, to: f32, timeout_ms: u64) -> Result<()> {
    if !to.is_finite() {
        eyre::bail!("seek target must be a finite number");
    }
    if !(0.0..=100.0).contains(&to) {
        tracing::warn!(to, "target outside 0..=100; it will be clamped");
    }
    let fl = ctx.spawn_loop()?;
    fl.set_goal(Some(to));
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    let outcome = loop {
        if ctx.cancelled() {
            fl.set_goal(None);
            break Err(eyre::Report::new(FaderError::Cancelled));
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            fl.set_goal(None);
            break Err(eyre::Report::new(FaderError::State(format!(
                "seek did not settle within {timeout_ms} ms"
            ))));
        }
        match fl.events().recv_timeout(left.min(POLL)) {
            Ok(ev @ FaderEvent::Arrived { .. }) => {
                print_event(&ev);
                break Ok(());
            }
            Ok(FaderEvent::SafetyStop { goal, position }) => {
                break Err(eyre::Report::new(FaderError::SafetyStop { goal, position }));
            }
            Ok(ev) => tracing::debug!(?ev, "event while seeking"),
            Err(_) if fl.is_finished() => break Ok(()),
            Err(_) => {}
        }
    };
    finish(fl, outcome)
}

pub fn follow(ctx: &Ctx, count: Option<usize>) -> Result<()> {
    let fl = ctx.spawn_loop()?;
    let mut seen = 0usize;
    while !ctx.cancelled() && count.is_none_or(|n| seen < n) && !fl.is_finished() {
        if let Ok(ev) = fl.events().recv_timeout(POLL) {
            print_event(&ev);
            seen += 1;
        }
    }
    finish(fl, Ok(()))
}

pub fn calibrate(ctx: &Ctx) -> Result<()> {
    let mut cal = ctx.calibrator()?;
    let table = cal.interp_shift(&ctx.table)?;
    let points = table.points();
    if json_mode() {
        println!(
            "{}",
            json!({ "breakpoints": points, "dead_zones": table.dead_zones() })
        );
    } else {
        // Same layout `--calibration` accepts.
        println!("percent,tick");
        for (k, tick) in points.iter().enumerate() {
            println!("{},{}", k * 10, tick);
        }
    }
    Ok(())
}

pub fn sweep(ctx: &Ctx, direction: SweepDirection) -> Result<()> {
    let mut cal = ctx.calibrator()?;
    let report = cal.sweep(&ctx.table, direction)?;
    if json_mode() {
        let crossings: Vec<_> = report
            .crossings
            .iter()
            .map(|c| {
                json!({
                    "percent": c.percent,
                    "tick": c.tick,
                    "elapsed_ms": c.elapsed.as_secs_f64() * 1e3,
                })
            })
            .collect();
        let dir = match direction {
            SweepDirection::Forward => "forward",
            SweepDirection::Backward => "backward",
        };
        println!(
            "{}",
            json!({ "direction": dir, "stalled": report.stalled, "crossings": crossings })
        );
    } else {
        for c in &report.crossings {
            println!(
                "{:3}%: {:4} --> {:.3} s",
                c.percent,
                c.tick,
                c.elapsed.as_secs_f64()
            );
        }
        if report.stalled {
            println!(
                "stalled after {} of 11 break-points",
                report.crossings.len()
            );
        }
    }
    Ok(())
}

pub fn crawl(ctx: &Ctx, until: Option<u16>) -> Result<()> {
    let mut cal = ctx.calibrator()?;
    if let Some(until) = until {
        let mut cfg = CrawlCfg::from(&ctx.cfg.crawl);
        cfg.until = until;
        cal = cal.with_crawl(cfg);
    }
    let report = cal.crawl()?;
    if json_mode() {
        let steps: Vec<_> = report
            .steps
            .iter()
            .map(|s| json!({ "tick": s.tick, "delta": s.delta }))
            .collect();
        println!("{}", json!({ "start": report.start, "steps": steps }));
    } else {
        println!("{:4}", report.start);
        for s in &report.steps {
            println!("{:4} {:+}", s.tick, s.delta);
        }
    }
    Ok(())
}

pub fn raw(ctx: &Ctx, count: Option<usize>) -> Result<()> {
    let (adc, _motor) = hw::open(&ctx.cfg)?;
    let period = SamplerCfg::from(&ctx.cfg.sampler).period();
    let monitor = RawMonitor::new(adc, ctx.clock(), period, ctx.shutdown.clone());
    for tick in monitor.take(count.unwrap_or(usize::MAX)) {
        let tick = tick?;
        let position = ctx.table.map(tick);
        if json_mode() {
            println!("{}", json!({ "tick": tick, "position": position }));
        } else {
            println!("{tick:4}  ({position:6.2}%)");
        }
    }
    Ok(())
}

pub fn self_check(ctx: &Ctx) -> Result<()> {
    let (mut adc, _motor) = hw::open(&ctx.cfg)?;
    let tick = read_tick(&mut adc).wrap_err("read fader position")?;
    let position = ctx.table.map(tick);
    if json_mode() {
        println!(
            "{}",
            json!({ "status": "ok", "tick": tick, "position": position })
        );
    } else {
        println!("OK: tick {tick}, position {position:.2}%");
    }
    Ok(())
}
