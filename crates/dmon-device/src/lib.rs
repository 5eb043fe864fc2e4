//! # dmon-device - Device Query Layer
//!
//! Talks to an Android device through `adb shell` and turns the text it
//! prints into [`dmon_core`] domain types.
//!
//! ## Public API
//!
//! ### Query Seam
//! - [`DeviceQuery`] - Async trait the sampling loop and workers call
//! - [`AdbDevice`] - `adb`-backed implementation, optional serial and per-command timeout
//! - [`AdbTool`] - Locate the `adb` executable (config, `ANDROID_HOME`, `PATH`)
//!
//! ### Parsers
//! - [`parse_focused_window()`], [`parse_cpuinfo()`], [`parse_meminfo()`] - `dumpsys` output
//! - [`parse_pidof()`], [`parse_io_counters()`], [`parse_gpu_busy()`] - process and sysfs reads
//! - [`parse_top_cpu()`] - one `top` iteration
//! - [`parse_startup_timing()`] - `am start -W`
//!
//! ### Touch Events
//! - [`EventStream`] - Line stream from `getevent -lt`
//! - [`count_syn_reports()`] - Count input reports until shutdown
//!
//! With the `test-helpers` feature, `test_utils::FakeDevice` provides a
//! scripted [`DeviceQuery`].

pub mod adb;
pub mod dumpsys;
pub mod procfs;
pub mod query;
pub mod startup;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod top;
pub mod touch;

pub use adb::{AdbDevice, AdbTool};
pub use dumpsys::{parse_cpuinfo, parse_focused_window, parse_meminfo};
pub use procfs::{parse_gpu_busy, parse_io_counters, parse_pidof};
pub use query::{DeviceQuery, LocalDeviceQuery};
pub use startup::{parse_startup_timing, StartupTiming};
pub use top::{parse_top_cpu, strip_ansi};
pub use touch::{count_syn_reports, EventStream};
