//! # dmon-app - Sampling Loop and Metrics Sinks
//!
//! Runs a monitoring session against any [`dmon_device::DeviceQuery`] and
//! hands the results to a [`MetricsSink`].
//!
//! ## Public API
//!
//! ### Sampling
//! - [`Monitor`] - Setup, fixed-interval polling, worker lifecycle
//! - [`MonitorConfig`] - Package, interval and worker selection
//! - [`MonitorReport`] - Final estimator state and stop reason
//! - [`CancelToken`] - Shared cancellation flag
//!
//! ### Workers
//! - [`Workers`] - `top` CPU poller, GPU poller and touch counter
//! - [`Gauges`] - Lock-free slots the workers write and the loop reads
//!
//! ### Sinks
//! - [`MetricsSink`] - Per-tick and lifecycle callbacks
//! - [`LatestSink`] / [`LatestReader`] - Latest-value slot for a refresh timer
//! - [`LogSink`] - Readable log block per tick
//! - [`FanoutSink`] - Forward to several sinks
//!
//! ### Configuration
//! - [`config::Settings`] - `config.toml` contents
//! - [`config::load_settings_from()`], [`config::init_config()`]

pub mod cancel;
pub mod config;
pub mod gauges;
pub mod monitor;
pub mod monitor_event;
pub mod sink;
pub mod workers;

pub use cancel::CancelToken;
pub use gauges::{Counter, Gauge, Gauges};
pub use monitor::{Monitor, MonitorConfig, MonitorReport};
pub use monitor_event::{MonitorEvent, StopReason};
pub use sink::{format_tick, FanoutSink, LatestReader, LatestSink, LogSink, MetricsSink};
pub use workers::{WorkerPlan, Workers, TOP_POLL_INTERVAL};
