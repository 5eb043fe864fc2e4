//! Throughput from successive cumulative readings
//!
//! Both trackers keep only the latest reading. When two readings share the
//! same instant the delta is skipped: the previous rate is returned and the
//! older reading stays the baseline.

use std::time::Instant;

use crate::performance::{IoCounterSnapshot, IoRates};

/// Turns consecutive `/proc/<pid>/io` snapshots into byte rates.
#[derive(Debug, Clone)]
pub struct IoRateTracker {
    previous: IoCounterSnapshot,
    rates: IoRates,
}

impl IoRateTracker {
    /// Start tracking from the baseline taken before polling begins.
    pub fn new(baseline: IoCounterSnapshot) -> Self {
        Self {
            previous: baseline,
            rates: IoRates::default(),
        }
    }

    /// Fold in a new snapshot and return the current rates.
    ///
    /// Counters that went backwards (the process restarted under the same
    /// pid) count as zero bytes for this interval.
    pub fn update(&mut self, current: IoCounterSnapshot) -> IoRates {
        let elapsed = current
            .taken_at
            .saturating_duration_since(self.previous.taken_at)
            .as_secs_f64();
        if elapsed <= 0.0 {
            tracing::debug!("IO snapshot taken at the same instant, holding previous rate");
            return self.rates;
        }

        let read = current
            .counters
            .read_bytes
            .saturating_sub(self.previous.counters.read_bytes);
        let write = current
            .counters
            .write_bytes
            .saturating_sub(self.previous.counters.write_bytes);

        self.rates = IoRates {
            read_bytes_per_sec: read as f64 / elapsed,
            write_bytes_per_sec: write as f64 / elapsed,
        };
        self.previous = current;
        self.rates
    }

    pub fn rates(&self) -> IoRates {
        self.rates
    }

    pub fn baseline(&self) -> &IoCounterSnapshot {
        &self.previous
    }
}

/// PSS growth rate in KB/s from successive meminfo readings.
///
/// Negative while the process is releasing memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRateTracker {
    previous: Option<(u64, Instant)>,
    rate: Option<f64>,
}

impl MemoryRateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a PSS reading. The first reading only sets the baseline.
    pub fn update(&mut self, pss_kb: u64, taken_at: Instant) -> Option<f64> {
        let Some((previous_kb, previous_at)) = self.previous else {
            self.previous = Some((pss_kb, taken_at));
            return None;
        };

        let elapsed = taken_at.saturating_duration_since(previous_at).as_secs_f64();
        if elapsed <= 0.0 {
            return self.rate;
        }

        let rate = (pss_kb as f64 - previous_kb as f64) / elapsed;
        self.previous = Some((pss_kb, taken_at));
        self.rate = Some(rate);
        self.rate
    }

    pub fn rate(&self) -> Option<f64> {
        self.rate
    }
}
