//! droid-monitor
//!
//! Command-line front end for the sampling loop in `dmon-app`: the `dmon`
//! CLI, the terminal dashboard and headless NDJSON output.

pub mod cli;
pub mod commands;
pub mod dashboard;
pub mod event;
pub mod headless;
pub mod signals;

pub use cli::{Cli, Command};
