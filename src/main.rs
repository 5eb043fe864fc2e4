//! dmon - live performance monitor for Android apps
//!
//! This is the binary entry point. All logic lives in the library.

use clap::Parser;
use color_eyre::eyre::{bail, Result};
use dmon_app::config;
use droid_monitor::commands;
use droid_monitor::headless::HeadlessEvent;
use droid_monitor::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    dmon_core::logging::init(cli.log_dir.as_deref())?;

    if cli.command == Command::InitConfig {
        let Some(path) = cli.config.clone().or_else(config::default_config_path) else {
            bail!("No config directory on this platform; pass --config <PATH>");
        };
        if config::init_config(&path)? {
            eprintln!("Wrote {}", path.display());
        } else {
            eprintln!("{} already exists", path.display());
        }
        return Ok(());
    }

    let settings = commands::resolve_settings(cli.config.as_deref(), cli.overrides());

    let result = match &cli.command {
        Command::Monitor { .. } => run_monitor(&settings, cli.headless).await,
        Command::Focus => run_focus(&settings, cli.headless).await,
        Command::Startup { activity } => run_startup(&settings, activity, cli.headless).await,
        Command::InitConfig => Ok(()),
    };

    if let Err(e) = &result {
        if cli.headless {
            HeadlessEvent::error(e.to_string(), true).emit();
        }
    }
    result
}

async fn run_monitor(settings: &config::Settings, headless: bool) -> Result<()> {
    let report = commands::monitor(settings, headless).await?;
    if report.is_fatal() {
        bail!("Monitoring stopped: {}", report.stop_reason);
    }
    if !headless {
        eprintln!("Stopped after {} samples", report.ticks);
    }
    Ok(())
}

async fn run_focus(settings: &config::Settings, headless: bool) -> Result<()> {
    let window = commands::focus(settings).await?;
    if headless {
        HeadlessEvent::focus(window).emit();
        return Ok(());
    }
    match window {
        Some(window) => println!("{}", window),
        None => bail!("Could not find the current focus window"),
    }
    Ok(())
}

async fn run_startup(settings: &config::Settings, activity: &str, headless: bool) -> Result<()> {
    let timing = commands::startup(settings, activity).await?;
    if headless {
        HeadlessEvent::startup(timing).emit();
        return Ok(());
    }

    let ms = |value: Option<u64>| value.map_or_else(|| "N/A".to_string(), |v| format!("{} ms", v));
    println!("Activity:  {}", timing.activity.as_deref().unwrap_or(activity));
    println!("TotalTime: {}", ms(timing.total_time_ms));
    println!("WaitTime:  {}", ms(timing.wait_time_ms));
    println!("ThisTime:  {}", ms(timing.this_time_ms));
    Ok(())
}
