//! Settings file loading and command-line overrides

use std::path::{Path, PathBuf};

use dmon_core::prelude::*;

use super::types::Settings;

const CONFIG_DIR_NAME: &str = "droid-monitor";
const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_CONFIG: &str = r#"# droid-monitor configuration

[device]
adb_path = ""            # Empty: ANDROID_HOME / ANDROID_SDK_ROOT platform-tools, then PATH
serial = ""              # Empty: the default device
command_timeout_ms = 0   # 0: wait for every adb command indefinitely

[monitor]
package = ""             # e.g. "com.example.app"
interval_ms = 500        # Sampling interval, at least 100
touch_device = "/dev/input/event0"   # Empty: no touch counting
cpu_top = true           # Poll per-process CPU with top
gpu_busy_path = "/sys/class/kgsl/kgsl-3d0/gpu_busy_percentage"   # Empty: no GPU sampling
gpu_interval_ms = 1000

[ui]
refresh_ms = 500         # Dashboard redraw cadence
history_size = 120       # Samples kept for the FPS sparkline
"#;

/// `<config_dir>/droid-monitor/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILENAME))
}

/// Load settings from `config_path`.
///
/// A missing, unreadable or invalid file yields defaults.
pub fn load_settings(config_path: &Path) -> Settings {
    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Load from an explicit path, or from [`default_config_path`].
pub fn load_settings_from(explicit: Option<&Path>) -> Settings {
    match explicit {
        Some(path) => {
            if !path.exists() {
                warn!("Config file {:?} does not exist, using defaults", path);
            }
            load_settings(path)
        }
        None => default_config_path()
            .map(|path| load_settings(&path))
            .unwrap_or_default(),
    }
}

/// Write the commented default config to `config_path`.
///
/// An existing file is left untouched. Returns whether a file was written.
pub fn init_config(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        debug!("Config file {:?} already exists", config_path);
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::config(format!("Failed to create {:?}: {}", parent, e)))?;
    }

    std::fs::write(config_path, DEFAULT_CONFIG)
        .map_err(|e| Error::config(format!("Failed to write {:?}: {}", config_path, e)))?;

    info!("Created default config at {:?}", config_path);
    Ok(true)
}

/// Values given on the command line, applied over the file settings
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub package: Option<String>,
    pub interval_ms: Option<u64>,
    pub serial: Option<String>,
    pub adb_path: Option<PathBuf>,
    pub touch_device: Option<String>,
    /// Disable touch counting regardless of `touch_device`
    pub no_touch: bool,
}

impl Settings {
    pub fn apply(&mut self, overrides: SettingsOverrides) {
        if let Some(package) = overrides.package {
            self.monitor.package = package;
        }
        if let Some(interval_ms) = overrides.interval_ms {
            self.monitor.interval_ms = interval_ms;
        }
        if let Some(serial) = overrides.serial {
            self.device.serial = serial;
        }
        if let Some(adb_path) = overrides.adb_path {
            self.device.adb_path = adb_path.to_string_lossy().into_owned();
        }
        if let Some(touch_device) = overrides.touch_device {
            self.monitor.touch_device = touch_device;
        }
        if overrides.no_touch {
            self.monitor.touch_device.clear();
        }
    }
}
