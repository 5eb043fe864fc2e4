//! Jank and effective-FPS estimation from frame samples
//!
//! Averaging frame durations hides dropped frames, so the estimate instead
//! counts how many vsync intervals the accepted frames actually consumed:
//!
//! ```text
//! fps = frames / (frames + extra_vsyncs) * 60
//! ```
//!
//! A frame that overruns its 16.67ms budget occupies `floor(d / 16.67)`
//! extra vsyncs, or `d / 16.67 - 1` when `d` is an exact multiple of the
//! budget.
//!
//! The on-device buffer keeps roughly the last 128 frames, so consecutive
//! dumps overlap. [`EstimatorState`] remembers the newest vsync timestamp
//! already counted and only frames strictly newer than it are accepted.

use serde::Serialize;

use crate::performance::{FrameSample, FRAME_BUDGET_MS, TARGET_FPS};

/// Vsync high-water mark before any frame has been seen.
pub const NO_FRAMES_SEEN: i64 = -1;

/// Estimator state carried across polling ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorState {
    /// `intended_vsync_ns` of the most recently accepted frame.
    pub last_seen_vsync_ns: i64,
    /// FPS reported by the last tick that accepted frames.
    pub last_fps: f64,
}

impl Default for EstimatorState {
    fn default() -> Self {
        Self {
            last_seen_vsync_ns: NO_FRAMES_SEEN,
            last_fps: TARGET_FPS,
        }
    }
}

/// Outcome of one estimation pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct JankReport {
    pub fps: f64,
    /// Frames newer than the previous high-water mark.
    pub accepted_frames: usize,
    pub jank_count: usize,
    /// Janky frames as a percentage of accepted frames.
    pub jank_ratio: f64,
    /// Extra vsync intervals consumed by slow frames.
    pub vsync_overruns: f64,
}

impl JankReport {
    /// True when no new frames arrived and `fps` is the carried-over value.
    pub fn is_held(&self) -> bool {
        self.accepted_frames == 0
    }
}

impl EstimatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick's samples into the state and report FPS and jank.
    ///
    /// Samples are walked in dump order; each accepted sample raises the
    /// high-water mark, so a later sample that is not newer than an earlier
    /// accepted one in the same dump is dropped too. With nothing accepted the
    /// previous FPS is returned and jank figures are zero.
    pub fn estimate(&mut self, samples: &[FrameSample]) -> JankReport {
        let mut frame_count = 0usize;
        let mut jank_count = 0usize;
        let mut vsync_overruns = 0.0f64;
        for sample in samples {
            if sample.intended_vsync_ns <= self.last_seen_vsync_ns {
                continue;
            }
            self.last_seen_vsync_ns = sample.intended_vsync_ns;
            frame_count += 1;
            if sample.is_janky() {
                jank_count += 1;
                vsync_overruns += extra_vsyncs(sample.duration_ms());
            }
        }

        if frame_count == 0 {
            return JankReport {
                fps: self.last_fps,
                ..JankReport::default()
            };
        }

        let fps = frame_count as f64 / (frame_count as f64 + vsync_overruns) * TARGET_FPS;
        self.last_fps = fps;

        JankReport {
            fps,
            accepted_frames: frame_count,
            jank_count,
            jank_ratio: jank_count as f64 / frame_count as f64 * 100.0,
            vsync_overruns,
        }
    }
}

/// Vsync intervals a frame of `duration_ms` used beyond its own.
pub fn extra_vsyncs(duration_ms: f64) -> f64 {
    if duration_ms % FRAME_BUDGET_MS == 0.0 {
        duration_ms / FRAME_BUDGET_MS - 1.0
    } else {
        (duration_ms / FRAME_BUDGET_MS).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET_NS: i64 = 16_670_000;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_two_on_budget_frames_give_60_fps() {
        let mut state = EstimatorState::new();
        let samples = [
            FrameSample::new(0, BUDGET_NS),
            FrameSample::new(BUDGET_NS * 2, BUDGET_NS * 3),
        ];

        let report = state.estimate(&samples);

        assert_eq!(report.accepted_frames, 2);
        assert_eq!(report.jank_count, 0);
        assert!(approx_eq(report.vsync_overruns, 0.0));
        assert!(approx_eq(report.fps, 60.0));
        assert!(approx_eq(report.jank_ratio, 0.0));
        assert_eq!(state.last_seen_vsync_ns, BUDGET_NS * 2);
    }

    #[test]
    fn test_single_50ms_frame_gives_20_fps() {
        let mut state = EstimatorState::new();
        let report = state.estimate(&[FrameSample::new(1_000, 1_000 + 50_000_000)]);

        assert_eq!(report.jank_count, 1);
        assert!(approx_eq(report.vsync_overruns, 2.0));
        assert!(approx_eq(report.fps, 20.0));
        assert!(approx_eq(report.jank_ratio, 100.0));
    }

    #[test]
    fn test_empty_tick_holds_previous_fps() {
        let mut state = EstimatorState {
            last_seen_vsync_ns: 500,
            last_fps: 45.0,
        };

        let report = state.estimate(&[]);

        assert!(report.is_held());
        assert!(approx_eq(report.fps, 45.0));
        assert_eq!(report.jank_count, 0);
        assert!(approx_eq(report.jank_ratio, 0.0));
        assert_eq!(state.last_seen_vsync_ns, 500);
    }

    #[test]
    fn test_stale_samples_hold_previous_fps() {
        let mut state = EstimatorState {
            last_seen_vsync_ns: 10_000,
            last_fps: 52.5,
        };
        let samples = [
            FrameSample::new(9_000, 60_000_000),
            FrameSample::new(10_000, 10_000 + BUDGET_NS),
        ];

        let report = state.estimate(&samples);

        assert!(report.is_held());
        assert!(approx_eq(report.fps, 52.5));
        assert_eq!(report.jank_count, 0);
    }

    #[test]
    fn test_refeeding_accepted_samples_is_idempotent() {
        let mut state = EstimatorState::new();
        let samples = [
            FrameSample::new(100, 100 + 20_000_000),
            FrameSample::new(200, 200 + 10_000_000),
        ];

        let first = state.estimate(&samples);
        let second = state.estimate(&samples);

        assert_eq!(first.accepted_frames, 2);
        assert_eq!(second.accepted_frames, 0);
        assert!(approx_eq(second.fps, first.fps));
    }

    #[test]
    fn test_overlapping_dump_counts_only_new_frames() {
        let mut state = EstimatorState::new();
        state.estimate(&[FrameSample::new(100, 200), FrameSample::new(300, 400)]);

        let report = state.estimate(&[
            FrameSample::new(300, 400),
            FrameSample::new(500, 500 + 40_000_000),
        ]);

        assert_eq!(report.accepted_frames, 1);
        assert_eq!(report.jank_count, 1);
        assert_eq!(state.last_seen_vsync_ns, 500);
    }

    #[test]
    fn test_out_of_order_sample_after_newer_one_is_dropped() {
        let mut state = EstimatorState::new();
        let report = state.estimate(&[FrameSample::new(900, 1_000), FrameSample::new(800, 850)]);

        assert_eq!(report.accepted_frames, 1);
        assert_eq!(state.last_seen_vsync_ns, 900);
    }

    #[test]
    fn test_high_water_mark_is_monotonic() {
        let mut state = EstimatorState::new();
        let ticks: [&[FrameSample]; 4] = [
            &[FrameSample::new(50, 60)],
            &[FrameSample::new(10, 20)],
            &[],
            &[FrameSample::new(40, 45), FrameSample::new(70, 90)],
        ];

        let mut previous = state.last_seen_vsync_ns;
        for tick in ticks {
            state.estimate(tick);
            assert!(state.last_seen_vsync_ns >= previous);
            previous = state.last_seen_vsync_ns;
        }
        assert_eq!(state.last_seen_vsync_ns, 70);
    }

    #[test]
    fn test_fps_stays_within_bounds() {
        let durations_ms = [0.5, 16.67, 16.68, 33.34, 100.0, 1_000.0];
        for (i, duration) in durations_ms.iter().enumerate() {
            let mut state = EstimatorState::new();
            let start = (i as i64 + 1) * 1_000_000_000;
            let end = start + (duration * 1_000_000.0) as i64;
            let report = state.estimate(&[FrameSample::new(start, end)]);
            assert!(report.fps > 0.0, "fps must be positive for {}ms", duration);
            assert!(report.fps <= 60.0, "fps must not exceed 60 for {}ms", duration);
        }
    }

    #[test]
    fn test_jank_threshold_boundary() {
        let mut state = EstimatorState::new();
        let on_budget = state.estimate(&[FrameSample::new(0, 16_670_000)]);
        assert_eq!(on_budget.jank_count, 0);

        let over_budget = state.estimate(&[FrameSample::new(100_000_000, 116_680_000)]);
        assert_eq!(over_budget.jank_count, 1);
    }

    #[test]
    fn test_frame_completed_before_vsync_still_advances_mark() {
        let mut state = EstimatorState::new();
        let samples = [FrameSample::new(100, 0), FrameSample::new(200, 300)];

        let report = state.estimate(&samples);

        assert_eq!(report.accepted_frames, 2);
        assert_eq!(report.jank_count, 0);
        assert!(approx_eq(report.fps, 60.0));
        assert_eq!(state.last_seen_vsync_ns, 200);
    }

    #[test]
    fn test_extra_vsyncs_rounding() {
        assert!(approx_eq(extra_vsyncs(50.0), 2.0));
        assert!(approx_eq(extra_vsyncs(20.0), 1.0));
        assert!(approx_eq(extra_vsyncs(16.68), 1.0));
        // Exact multiple of the budget: the frame's own vsync is not extra.
        assert!(approx_eq(extra_vsyncs(FRAME_BUDGET_MS * 2.0), 1.0));
    }

    #[test]
    fn test_default_state() {
        let state = EstimatorState::default();
        assert_eq!(state.last_seen_vsync_ns, NO_FRAMES_SEEN);
        assert!(approx_eq(state.last_fps, 60.0));
    }
}
