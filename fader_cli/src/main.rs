mod cli;
mod commands;
mod error_fmt;
mod hw;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use fader_core::{CalibrationTable, FaderError};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::commands::Ctx;
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

const DEFAULT_CONFIG: &str = "etc/fader_config.toml";

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error hooks: {e}");
    }

    if let Err(err) = run(cli) {
        if cli::json_mode() {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
            tracing::debug!(error = ?err, "command failed");
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    cfg.validate().wrap_err("invalid configuration")?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::info!(config = %cli.config.display(), "configuration loaded");

    let table = load_table(&cli, &cfg)?;
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .wrap_err("install Ctrl-C handler")?;
    }

    let ctx = Ctx {
        cfg,
        table,
        shutdown,
    };
    match cli.cmd {
        Commands::Seek { to, timeout_ms } => commands::seek(&ctx, to, timeout_ms),
        Commands::Follow { count } => commands::follow(&ctx, count),
        Commands::Calibrate => commands::calibrate(&ctx),
        Commands::Sweep { direction } => commands::sweep(&ctx, direction.into()),
        Commands::Crawl { until } => commands::crawl(&ctx, until),
        Commands::Raw { count } => commands::raw(&ctx, count),
        Commands::SelfCheck => commands::self_check(&ctx),
    }
}

/// The default path may be absent (built-in defaults); an explicit path must exist.
fn load_config(path: &Path) -> Result<fader_config::Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        return Ok(fader_config::Config::default());
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    fader_config::load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))
}

fn load_table(cli: &Cli, cfg: &fader_config::Config) -> Result<CalibrationTable> {
    let c = &cfg.calibration;
    let table = match &cli.calibration {
        Some(path) => {
            let points = fader_config::load_breakpoints_csv(path)
                .wrap_err("load calibration override")?;
            CalibrationTable::from_slice(&points, c.dead_zone_low, c.dead_zone_high)?
        }
        None => CalibrationTable::try_from(c)?,
    };
    tracing::debug!(points = ?table.points(), "calibration table active");
    Ok(table)
}

fn init_tracing(cli: &Cli, logging: &fader_config::Logging) -> Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    // Logs go to stderr so stdout stays machine-readable.
    if cli.json {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = dir.unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            "never" => tracing_appender::rolling::never(dir, name),
            other => {
                return Err(eyre::Report::new(FaderError::Config(format!(
                    "logging.rotation must be never|daily|hourly, got {other:?}"
                ))));
            }
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))?)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")
}
