//! Headless mode - NDJSON event output
//!
//! With `--headless`, dmon prints one JSON object per line on stdout instead
//! of the dashboard. Each object has an "event" field naming its type.
//!
//! # Example Output
//!
//! ```json
//! {"event":"monitor_started","package":"com.example.app","pid":4242,"window":"com.example.app/com.example.app.MainActivity","timestamp":1704700001000}
//! {"event":"metrics","sequence":1,"timestamp":"2024-01-08T09:00:01.500+01:00","focused_window":"com.example.app/com.example.app.MainActivity","io":{"read_bytes_per_sec":2048.0,"write_bytes_per_sec":0.0},"frames":{"fps":57.5,"accepted_frames":23,"jank_count":1,"jank_ratio":4.3,"vsync_overruns":1.0},...}
//! {"event":"monitor_stopped","reason":"cancelled","ticks":12,"fatal":false,"timestamp":1704700007000}
//! ```

use std::io::{self, Write};

use chrono::Utc;
use dmon_app::{MetricsSink, MonitorEvent, StopReason};
use dmon_core::MetricsTick;
use dmon_device::StartupTiming;
use serde::Serialize;
use tracing::error;

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Setup succeeded, polling begins
    MonitorStarted {
        package: String,
        pid: u32,
        window: Option<String>,
        timestamp: i64,
    },

    /// One sampling tick
    Metrics(MetricsTick),

    /// The run ended
    MonitorStopped {
        reason: String,
        ticks: u64,
        fatal: bool,
        timestamp: i64,
    },

    /// `dmon focus`
    Focus {
        window: Option<String>,
        timestamp: i64,
    },

    /// `dmon startup`
    Startup {
        #[serde(flatten)]
        timing: StartupTiming,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = self.write_to(&mut stdout) {
            error!("Failed to write headless event to stdout: {}", e);
        }
    }

    /// Write this event as one NDJSON line and flush.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        let json = serde_json::to_string(self).map_err(io::Error::other)?;
        writeln!(out, "{}", json)?;
        out.flush()
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn from_monitor_event(event: &MonitorEvent) -> Self {
        match event {
            MonitorEvent::Started {
                package,
                pid,
                window,
            } => Self::MonitorStarted {
                package: package.clone(),
                pid: *pid,
                window: window.clone(),
                timestamp: Self::now(),
            },
            MonitorEvent::Stopped { reason, ticks } => Self::MonitorStopped {
                reason: reason.to_string(),
                ticks: *ticks,
                fatal: matches!(reason, StopReason::Fatal(_)),
                timestamp: Self::now(),
            },
        }
    }

    pub fn focus(window: Option<String>) -> Self {
        Self::Focus {
            window,
            timestamp: Self::now(),
        }
    }

    pub fn startup(timing: StartupTiming) -> Self {
        Self::Startup {
            timing,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }
}

/// [`MetricsSink`] printing every tick and lifecycle event as NDJSON on stdout
#[derive(Debug, Default)]
pub struct HeadlessSink;

impl MetricsSink for HeadlessSink {
    fn publish(&self, tick: &MetricsTick) {
        HeadlessEvent::Metrics(tick.clone()).emit();
    }

    fn on_event(&self, event: &MonitorEvent) {
        HeadlessEvent::from_monitor_event(event).emit();
    }
}
