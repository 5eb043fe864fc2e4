//! Configuration file parsing for droid-monitor
//!
//! Settings live in `<config_dir>/droid-monitor/config.toml` unless a path
//! is given on the command line.

pub mod settings;
pub mod types;

pub use settings::{
    default_config_path, init_config, load_settings, load_settings_from, SettingsOverrides,
};
pub use types::*;
