//! Lock-free metric slots written by background workers
//!
//! Each slot has exactly one writer task and is read by the sampling loop
//! once per tick. All accesses use `Relaxed` ordering: a reader may see a
//! value one update old, which only delays it by a tick. No slot is
//! ever used to publish other memory.

use std::sync::atomic::{AtomicU64, Ordering};

/// Bit pattern marking an unset gauge. It is a NaN, which no reading produces.
const UNSET: u64 = u64::MAX;

/// An `f64` reading stored as bits in an `AtomicU64`
#[derive(Debug)]
pub struct Gauge {
    bits: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(UNSET),
        }
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Mark the reading unavailable.
    pub fn clear(&self) {
        self.bits.store(UNSET, Ordering::Relaxed);
    }

    pub fn get(&self) -> Option<f64> {
        match self.bits.load(Ordering::Relaxed) {
            UNSET => None,
            bits => Some(f64::from_bits(bits)),
        }
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

/// Event counter drained by the sampling loop
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Return the count so far and reset it to zero.
    pub fn take(&self) -> u64 {
        self.value.swap(0, Ordering::Relaxed)
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Slots shared between the workers and the sampling loop
#[derive(Debug, Default)]
pub struct Gauges {
    /// `%CPU` from the `top` poller
    pub process_cpu: Gauge,
    /// GPU busy percentage from the GPU poller
    pub gpu_busy: Gauge,
    /// Touch reports since the last tick
    pub touches: Counter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_starts_unset() {
        assert_eq!(Gauge::new().get(), None);
    }

    #[test]
    fn test_gauge_set_and_clear() {
        let gauge = Gauge::new();
        gauge.set(12.5);
        assert_eq!(gauge.get(), Some(12.5));

        gauge.set(0.0);
        assert_eq!(gauge.get(), Some(0.0));

        gauge.clear();
        assert_eq!(gauge.get(), None);
    }

    #[test]
    fn test_counter_take_resets() {
        let counter = Counter::default();
        counter.increment();
        counter.increment();

        assert_eq!(counter.take(), 2);
        assert_eq!(counter.take(), 0);
    }

    #[test]
    fn test_counter_across_threads() {
        let counter = std::sync::Arc::new(Counter::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || (0..1000).for_each(|_| counter.increment()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.get(), 4000);
    }
}
