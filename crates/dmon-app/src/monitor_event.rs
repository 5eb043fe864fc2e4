//! Lifecycle events emitted by the sampling loop for sinks

use std::fmt;

/// Why a monitoring run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The cancel token was triggered
    Cancelled,
    /// A setup precondition failed; polling never started
    Fatal(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Fatal(message) => write!(f, "{}", message),
        }
    }
}

/// Lifecycle of one monitoring run.
///
/// Per-tick data travels as [`dmon_core::MetricsTick`]; these mark the
/// boundaries around it.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Setup succeeded and polling is about to begin
    Started {
        package: String,
        pid: u32,
        window: Option<String>,
    },

    /// The run ended
    Stopped { reason: StopReason, ticks: u64 },
}
