//! # Performance Domain Types
//!
//! Domain data types for frame samples, I/O counters, CPU and memory readings,
//! the per-tick [`MetricsTick`] aggregate, and a generic ring buffer for
//! rolling chart history.
//!
//! These types are the shared vocabulary between:
//! - `dmon-device` (parsing adb shell output)
//! - `dmon-app` (sampling loop, sinks)

use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;

use crate::jank::JankReport;

// ── Frame budget ─────────────────────────────────────────────────────────────

/// Budget for a single frame at 60 FPS, in milliseconds.
pub const FRAME_BUDGET_MS: f64 = 16.67;

/// Display refresh rate the FPS estimate is scaled to.
pub const TARGET_FPS: f64 = 60.0;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

// ── FrameSample ──────────────────────────────────────────────────────────────

/// Timestamps for one rendered frame of the focused window.
///
/// Both values come straight from the `IntendedVsync` and `FrameCompleted`
/// columns of `dumpsys gfxinfo <pkg> framestats` and are in nanoseconds on
/// the device's monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSample {
    pub intended_vsync_ns: i64,
    pub frame_completed_ns: i64,
}

impl FrameSample {
    pub fn new(intended_vsync_ns: i64, frame_completed_ns: i64) -> Self {
        Self {
            intended_vsync_ns,
            frame_completed_ns,
        }
    }

    /// Frame duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        (self.frame_completed_ns - self.intended_vsync_ns) as f64 / NANOS_PER_MILLI
    }

    /// Whether this frame exceeded the 60 FPS budget.
    pub fn is_janky(&self) -> bool {
        self.duration_ms() > FRAME_BUDGET_MS
    }
}

// ── I/O counters ─────────────────────────────────────────────────────────────

/// Cumulative byte counters from `/proc/<pid>/io`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// [`IoCounters`] stamped with the host instant they were read at.
#[derive(Debug, Clone, Copy)]
pub struct IoCounterSnapshot {
    pub counters: IoCounters,
    pub taken_at: Instant,
}

impl IoCounterSnapshot {
    pub fn new(counters: IoCounters, taken_at: Instant) -> Self {
        Self { counters, taken_at }
    }

    /// Snapshot stamped with the current instant.
    pub fn now(counters: IoCounters) -> Self {
        Self::new(counters, Instant::now())
    }
}

/// I/O throughput in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IoRates {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
}

impl IoRates {
    pub fn read_kb_per_sec(&self) -> f64 {
        self.read_bytes_per_sec / 1024.0
    }

    pub fn write_kb_per_sec(&self) -> f64 {
        self.write_bytes_per_sec / 1024.0
    }
}

// ── CPU / memory ─────────────────────────────────────────────────────────────

/// CPU load from `dumpsys cpuinfo`, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CpuUsage {
    /// Load attributed to the monitored package.
    pub package_percent: f64,
    /// Whole-device load (the `TOTAL` line).
    pub total_percent: f64,
}

/// Memory summary from `dumpsys meminfo <pkg>`.
///
/// PSS and RSS are in kilobytes, as reported by the device.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MemoryUsage {
    pub total_pss_kb: u64,
    pub total_rss_kb: Option<u64>,
    pub views: Option<u64>,
    pub activities: Option<u64>,
}

impl MemoryUsage {
    /// Format kilobytes as a human-readable string (e.g., "12.5 MB").
    pub fn format_kb(kb: u64) -> String {
        const MB: u64 = 1024;
        const GB: u64 = 1024 * 1024;
        match kb {
            k if k >= GB => format!("{:.1} GB", k as f64 / GB as f64),
            k if k >= MB => format!("{:.1} MB", k as f64 / MB as f64),
            k => format!("{} KB", k),
        }
    }
}

// ── MetricsTick ──────────────────────────────────────────────────────────────

/// Everything one sampling iteration produced.
///
/// `None` marks a metric that was unavailable for this tick.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsTick {
    /// Tick number, starting at 1.
    pub sequence: u64,
    pub timestamp: chrono::DateTime<chrono::Local>,
    pub focused_window: Option<String>,
    pub io: Option<IoRates>,
    pub frames: JankReport,
    pub cpu: Option<CpuUsage>,
    /// Per-process CPU from `top`, in percent.
    pub process_cpu: Option<f64>,
    pub gpu_busy: Option<f64>,
    pub memory: Option<MemoryUsage>,
    /// PSS growth rate in KB/s.
    pub memory_rate_kb_per_sec: Option<f64>,
    /// Touch reports (`SYN_REPORT`) seen since the previous tick.
    pub touches: Option<u64>,
}

// ── RingBuffer<T> ────────────────────────────────────────────────────────────

/// A fixed-capacity circular buffer that overwrites the oldest entries
/// when full. Used for rolling chart history.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with the given capacity (at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over items from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.buf.iter()
    }

    /// Get the most recently pushed item.
    pub fn latest(&self) -> Option<&T> {
        self.buf.back()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
