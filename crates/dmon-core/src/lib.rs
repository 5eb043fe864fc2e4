//! # dmon-core - Core Domain Types
//!
//! Foundation crate for droid-monitor. Provides the frame-timing analysis
//! pipeline, domain types shared by the device and app layers, error handling,
//! and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Frame Timing (`framestats`, `jank`)
//! - [`parse_frame_samples()`] - Extract the focused window's frames from a `gfxinfo framestats` dump
//! - [`EstimatorState`] - Cross-tick de-duplication mark and held FPS
//! - [`JankReport`] - FPS, jank count and jank ratio for one tick
//!
//! ### Domain Types (`performance`)
//! - [`FrameSample`] - Intended-vsync / frame-completed timestamp pair
//! - [`IoCounters`], [`IoCounterSnapshot`], [`IoRates`] - Per-process I/O accounting
//! - [`CpuUsage`], [`MemoryUsage`] - `dumpsys` summaries
//! - [`MetricsTick`] - Everything one sampling iteration produced
//! - [`RingBuffer`] - Fixed-capacity history for charts
//!
//! ### Rates (`rates`)
//! - [`IoRateTracker`], [`MemoryRateTracker`] - Deltas over elapsed time with a zero-elapsed guard
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use dmon_core::prelude::*;
//! ```

pub mod error;
pub mod framestats;
pub mod jank;
pub mod logging;
pub mod performance;
pub mod rates;

/// Prelude for common imports used throughout all droid-monitor crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{Error, Result, ResultExt};
pub use framestats::{parse_frame_samples, ColumnIndex, PROFILE_DATA_MARKER};
pub use jank::{extra_vsyncs, EstimatorState, JankReport, NO_FRAMES_SEEN};
pub use performance::{
    CpuUsage, FrameSample, IoCounterSnapshot, IoCounters, IoRates, MemoryUsage, MetricsTick,
    RingBuffer, FRAME_BUDGET_MS, TARGET_FPS,
};
pub use rates::{IoRateTracker, MemoryRateTracker};
