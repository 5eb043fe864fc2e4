//! Subcommand entry points

use std::path::Path;
use std::sync::Arc;

use dmon_app::config::{self, DeviceSettings, Settings, SettingsOverrides};
use dmon_app::{
    CancelToken, FanoutSink, LatestSink, LogSink, Monitor, MonitorConfig, MonitorReport,
};
use dmon_core::prelude::*;
use dmon_device::{AdbDevice, AdbTool, DeviceQuery, StartupTiming};

use crate::dashboard::Dashboard;
use crate::event::spawn_quit_listener;
use crate::headless::HeadlessSink;
use crate::signals::spawn_signal_handler;

/// Load settings from `--config` or the default path, then apply CLI overrides.
pub fn resolve_settings(config_path: Option<&Path>, overrides: SettingsOverrides) -> Settings {
    let mut settings = config::load_settings_from(config_path);
    settings.apply(overrides);
    settings
}

/// `adb` handle for the configured device.
pub fn connect(device: &DeviceSettings) -> Result<AdbDevice> {
    let tool = AdbTool::locate(device.adb_path()).context("Failed to locate adb")?;
    debug!("Using adb at {}", tool.path().display());

    Ok(AdbDevice::new(tool)
        .with_serial(device.serial().unwrap_or_default())
        .with_timeout(device.command_timeout()))
}

/// Run the Sampling Loop until Ctrl-C.
///
/// Headless runs print NDJSON; otherwise the dashboard takes over the
/// terminal until `q` or Ctrl-C. Ticks are logged to the log file either way.
pub async fn monitor(settings: &Settings, headless: bool) -> Result<MonitorReport> {
    let package = settings.monitor.package.trim().to_string();
    if package.is_empty() {
        return Err(Error::config(
            "No package to monitor. Pass one or set [monitor] package in the config file.",
        ));
    }

    let device = Arc::new(connect(&settings.device)?);
    let cancel = CancelToken::new();
    spawn_signal_handler(cancel.clone());

    let mut monitor_config = MonitorConfig::from_settings(&settings.monitor);
    monitor_config.package = package.clone();
    let monitor = Monitor::new(device, monitor_config, cancel.clone());

    if headless {
        let sink = FanoutSink::new()
            .with(HeadlessSink)
            .with(LogSink::new(package));
        return Ok(monitor.run(&sink).await);
    }

    let latest = Arc::new(LatestSink::new());
    let dashboard = Dashboard::new(latest.reader(), &settings.ui);
    let sink = FanoutSink::new()
        .with(latest)
        .with(LogSink::new(package.clone()));

    let mut terminal = ratatui::try_init()?;
    let keys = spawn_quit_listener(cancel.clone());

    let run = async {
        let report = monitor.run(&sink).await;
        // Stops the dashboard when setup fails.
        cancel.cancel();
        report
    };
    let (report, draws) = tokio::join!(run, dashboard.run(cancel.clone(), &mut terminal));

    ratatui::restore();
    if let Err(e) = keys.await {
        debug!("Key listener failed: {}", e);
    }
    debug!("Dashboard drew {} frames", draws);
    Ok(report)
}

/// Current focused window.
pub async fn focus(settings: &Settings) -> Result<Option<String>> {
    connect(&settings.device)?.focused_window().await
}

/// Cold-start `activity` and report its launch timings.
pub async fn startup(settings: &Settings, activity: &str) -> Result<StartupTiming> {
    connect(&settings.device)?.app_startup(activity).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cli_overrides_win_over_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[monitor]\npackage = \"from.file\"\ninterval_ms = 1000\n\n[device]\nserial = \"ABC\"\n",
        )
        .unwrap();

        let settings = resolve_settings(
            Some(&path),
            SettingsOverrides {
                package: Some("from.cli".to_string()),
                ..SettingsOverrides::default()
            },
        );

        assert_eq!(settings.monitor.package, "from.cli");
        assert_eq!(settings.monitor.interval_ms, 1000);
        assert_eq!(settings.device.serial(), Some("ABC"));
    }

    #[tokio::test]
    async fn test_monitor_without_package_is_config_error() {
        let err = monitor(&Settings::default(), true).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
