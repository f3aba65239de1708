mod cli;
mod devices;
mod error_fmt;

use std::path::Path;

use clap::Parser;
use eyre::{Result, WrapErr};
use raincatch_config::Config;
use raincatch_core::{CycleReport, Settings, build_controller};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error report handler: {e}");
    }

    if let Err(err) = real_main(cli) {
        tracing::error!(error = ?err, "raincatch failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(path: &Path) -> Result<(Config, bool)> {
    if !path.exists() {
        return Ok((Config::default(), false));
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = raincatch_config::load_toml(&text).wrap_err("parse config")?;
    Ok((cfg, true))
}

fn init_tracing(cli: &Cli, logging: &raincatch_config::Logging) -> Result<()> {
    use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

    // an explicit --log-level beats [logging] level; RUST_LOG beats both
    let level = match logging.level.as_deref() {
        Some(configured) if cli.log_level == "info" => configured,
        _ => cli.log_level.as_str(),
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err("invalid log level")?;

    // stdout carries command output; logs go to stderr
    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn print_cycle(n: usize, r: &CycleReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(r)?);
    } else {
        println!(
            "cycle {n}: {} volume={:.2} L raining={} override={:?} lid={:?} actions={:?} sent={} dropped={}",
            r.timestamp,
            r.volume_liters,
            r.raining,
            r.command,
            r.lid,
            r.actions,
            r.events_delivered,
            r.events_dropped
        );
    }
    Ok(())
}

fn real_main(cli: Cli) -> Result<()> {
    let (mut cfg, found) = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging)?;
    if found {
        tracing::info!(path = %cli.config.display(), "config loaded");
    } else {
        tracing::info!(path = %cli.config.display(), "config file not found; using defaults");
    }

    if let Some(csv) = &cli.calibration {
        cfg.calibration = raincatch_config::load_calibration_csv(csv)?;
        tracing::info!(
            slope = cfg.calibration.slope_l_per_cm,
            intercept = cfg.calibration.intercept_l,
            "volume calibration loaded"
        );
    }
    cfg.validate().wrap_err("invalid configuration")?;

    let mut settings = Settings::from(&cfg);
    if let Commands::Run {
        cycle_secs: Some(secs),
        ..
    } = &cli.cmd
    {
        settings.controller.cycle_secs = *secs;
    }

    let devices = devices::assemble(&cfg, cli.offline)?;
    let mut controller = build_controller(devices, settings, None)?;

    match cli.cmd {
        Commands::Run {
            cycles: Some(n), ..
        } => {
            for (i, report) in controller.run_cycles(n).iter().enumerate() {
                print_cycle(i + 1, report, cli.json)?;
            }
            Ok(())
        }
        Commands::Run { cycles: None, .. } => controller.run(),
        Commands::SelfCheck => {
            let d = controller.diagnose();
            if cli.json {
                println!("{}", serde_json::to_string(&d)?);
            } else {
                match d.volume() {
                    Ok(v) => println!("volume: {v:.2} L"),
                    Err(e) => println!("volume: {e}"),
                }
                println!("rain: local={} remote={}", d.rain.local, d.rain.remote);
                println!("override: {:?}", d.command);
                println!("time: {}", d.timestamp);
            }
            d.volume().map(drop).wrap_err("self-check")
        }
        Commands::Actuate { direction } => {
            let r = controller.actuate(direction.into())?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "direction": r.direction,
                        "steps": r.steps,
                        "stepping_ms": r.stepping.as_millis() as u64,
                    })
                );
            } else {
                println!(
                    "actuated {:?}: {} steps in {} ms",
                    r.direction,
                    r.steps,
                    r.stepping.as_millis()
                );
            }
            Ok(())
        }
    }
}
