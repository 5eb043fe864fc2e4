//! Configuration types for droid-monitor
//!
//! Defines:
//! - `Settings` - Global application settings (`config.toml`)
//! - `DeviceSettings`, `MonitorSettings`, `UiSettings` - its sections

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Shortest sampling interval accepted, in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 100;

/// Shortest dashboard refresh accepted, in milliseconds.
pub const MIN_REFRESH_MS: u64 = 50;

/// Adreno busy-percentage file exposed by the kgsl driver.
pub const DEFAULT_GPU_BUSY_PATH: &str = "/sys/class/kgsl/kgsl-3d0/gpu_busy_percentage";

/// Application settings (config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub monitor: MonitorSettings,

    #[serde(default)]
    pub ui: UiSettings,
}

/// How to reach the device
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// Path to `adb`. Empty means locate it.
    #[serde(default)]
    pub adb_path: String,

    /// Device serial for `adb -s`. Empty means the default device.
    #[serde(default)]
    pub serial: String,

    /// Per-command time limit. 0 disables it.
    #[serde(default)]
    pub command_timeout_ms: u64,
}

impl DeviceSettings {
    pub fn adb_path(&self) -> Option<&Path> {
        non_empty(&self.adb_path).map(Path::new)
    }

    pub fn serial(&self) -> Option<&str> {
        non_empty(&self.serial)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_ms > 0).then(|| Duration::from_millis(self.command_timeout_ms))
    }
}

/// What to sample and how often
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitorSettings {
    /// Package to monitor (e.g., "com.example.app")
    #[serde(default)]
    pub package: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Input device for `getevent`. Empty disables touch counting.
    #[serde(default = "default_touch_device")]
    pub touch_device: String,

    /// Poll per-process CPU with `top`
    #[serde(default = "default_true")]
    pub cpu_top: bool,

    /// GPU busy file on the device. Empty disables GPU sampling.
    #[serde(default = "default_gpu_busy_path")]
    pub gpu_busy_path: String,

    #[serde(default = "default_gpu_interval_ms")]
    pub gpu_interval_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            package: String::new(),
            interval_ms: default_interval_ms(),
            touch_device: default_touch_device(),
            cpu_top: true,
            gpu_busy_path: default_gpu_busy_path(),
            gpu_interval_ms: default_gpu_interval_ms(),
        }
    }
}

impl MonitorSettings {
    /// Sampling interval, clamped to [`MIN_INTERVAL_MS`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn gpu_interval(&self) -> Duration {
        Duration::from_millis(self.gpu_interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn touch_device(&self) -> Option<&str> {
        non_empty(&self.touch_device)
    }

    pub fn gpu_busy_path(&self) -> Option<&str> {
        non_empty(&self.gpu_busy_path)
    }
}

fn default_interval_ms() -> u64 {
    500
}

fn default_touch_device() -> String {
    "/dev/input/event0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_gpu_busy_path() -> String {
    DEFAULT_GPU_BUSY_PATH.to_string()
}

fn default_gpu_interval_ms() -> u64 {
    1000
}

/// Dashboard settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UiSettings {
    /// Redraw cadence
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    /// Samples kept for the FPS sparkline
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
            history_size: default_history_size(),
        }
    }
}

impl UiSettings {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(MIN_REFRESH_MS))
    }
}

fn default_refresh_ms() -> u64 {
    500
}

fn default_history_size() -> usize {
    120
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.monitor.interval(), Duration::from_millis(500));
        assert_eq!(settings.monitor.touch_device(), Some("/dev/input/event0"));
        assert_eq!(settings.monitor.gpu_busy_path(), Some(DEFAULT_GPU_BUSY_PATH));
        assert!(settings.monitor.cpu_top);
        assert_eq!(settings.device.adb_path(), None);
        assert_eq!(settings.device.command_timeout(), None);
        assert_eq!(settings.ui.history_size, 120);
    }

    #[test]
    fn test_interval_is_clamped() {
        let monitor = MonitorSettings {
            interval_ms: 10,
            gpu_interval_ms: 0,
            ..MonitorSettings::default()
        };
        assert_eq!(monitor.interval(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(monitor.gpu_interval(), Duration::from_millis(MIN_INTERVAL_MS));
    }

    #[test]
    fn test_empty_strings_disable_features() {
        let monitor = MonitorSettings {
            touch_device: "  ".to_string(),
            gpu_busy_path: String::new(),
            ..MonitorSettings::default()
        };
        assert_eq!(monitor.touch_device(), None);
        assert_eq!(monitor.gpu_busy_path(), None);
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let settings: Settings = toml::from_str("[monitor]\npackage = \"com.example\"\n").unwrap();
        assert_eq!(settings.monitor.package, "com.example");
        assert_eq!(settings.monitor.interval_ms, 500);
        assert_eq!(settings.monitor.gpu_interval_ms, 1000);
        assert_eq!(settings.ui, UiSettings::default());
    }

    #[test]
    fn test_command_timeout() {
        let device = DeviceSettings {
            command_timeout_ms: 1500,
            ..DeviceSettings::default()
        };
        assert_eq!(device.command_timeout(), Some(Duration::from_millis(1500)));
    }
}
