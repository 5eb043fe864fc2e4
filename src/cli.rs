//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dmon_app::config::SettingsOverrides;

/// droid-monitor - frame timing, I/O, CPU, GPU and memory for Android apps
#[derive(Parser, Debug)]
#[command(name = "dmon")]
#[command(about = "Live performance monitor for Android apps over adb", long_about = None)]
pub struct Cli {
    /// Config file (default: <config_dir>/droid-monitor/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for log files
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Device serial, as listed by `adb devices`
    #[arg(long, short = 's', global = true)]
    pub serial: Option<String>,

    /// Path to the adb executable
    #[arg(long, global = true, value_name = "PATH")]
    pub adb: Option<PathBuf>,

    /// Emit NDJSON events on stdout instead of human-readable output
    #[arg(long, global = true)]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Sample the app until Ctrl-C
    Monitor {
        /// Package to monitor (e.g., com.example.app); defaults to the config file
        #[arg(value_name = "PACKAGE")]
        package: Option<String>,

        /// Sampling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Input device to count touches on (e.g., /dev/input/event2)
        #[arg(long, value_name = "DEVICE")]
        touch_device: Option<String>,

        /// Do not count touches
        #[arg(long)]
        no_touch: bool,
    },

    /// Print the focused window
    Focus,

    /// Cold-start an activity and print its launch timings
    Startup {
        /// Component to start (e.g., com.example.app/.MainActivity)
        #[arg(value_name = "ACTIVITY")]
        activity: String,
    },

    /// Write the default config file
    InitConfig,
}

impl Cli {
    /// Command-line values that override the config file.
    pub fn overrides(&self) -> SettingsOverrides {
        let mut overrides = SettingsOverrides {
            serial: self.serial.clone(),
            adb_path: self.adb.clone(),
            ..SettingsOverrides::default()
        };

        if let Command::Monitor {
            package,
            interval_ms,
            touch_device,
            no_touch,
        } = &self.command
        {
            overrides.package = package.clone();
            overrides.interval_ms = *interval_ms;
            overrides.touch_device = touch_device.clone();
            overrides.no_touch = *no_touch;
        }

        overrides
    }
}
