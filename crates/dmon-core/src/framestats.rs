//! Frame stats parsing for `dumpsys gfxinfo <package> framestats`
//!
//! The dump is split into per-window sections. A section may carry a profile
//! block framed by `---PROFILEDATA---` marker lines: a CSV header naming the
//! columns, then one comma-separated row per frame.
//!
//! ```text
//! Window: com.example/com.example.MainActivity
//! ---PROFILEDATA---
//! Flags,FrameTimelineVsyncId,IntendedVsync,Vsync,...,FrameCompleted,...
//! 0,1201,4086519372114,4086519372114,...,4086527503656,...
//! ---PROFILEDATA---
//! ```
//!
//! Column order differs between Android releases, so the `IntendedVsync` and
//! `FrameCompleted` positions are looked up from each dump's header.

use std::collections::HashMap;

use crate::performance::FrameSample;

/// Marker line that opens and closes a profile block.
pub const PROFILE_DATA_MARKER: &str = "---PROFILEDATA---";

const INTENDED_VSYNC_COLUMN: &str = "IntendedVsync";
const FRAME_COMPLETED_COLUMN: &str = "FrameCompleted";

/// Positions of the two timestamp columns within a profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub intended_vsync: usize,
    pub frame_completed: usize,
}

impl ColumnIndex {
    /// Build the index from a CSV header line.
    ///
    /// Returns `None` when either column is missing.
    pub fn from_header(header: &str) -> Option<Self> {
        let columns: HashMap<&str, usize> = header
            .split(',')
            .map(str::trim)
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(index, name)| (name, index))
            .collect();

        Some(Self {
            intended_vsync: *columns.get(INTENDED_VSYNC_COLUMN)?,
            frame_completed: *columns.get(FRAME_COMPLETED_COLUMN)?,
        })
    }

    /// Parse one profile row. Short or non-numeric rows yield `None`.
    pub fn parse_row(&self, row: &str) -> Option<FrameSample> {
        let fields: Vec<&str> = row.split(',').collect();
        let intended_vsync = fields.get(self.intended_vsync)?.trim().parse::<i64>().ok()?;
        let frame_completed = fields.get(self.frame_completed)?.trim().parse::<i64>().ok()?;
        Some(FrameSample::new(intended_vsync, frame_completed))
    }
}

#[derive(Debug)]
enum ParseState {
    /// Looking for the focused window's section header.
    SeekingWindow,
    /// Inside the focused window's section, before its profile block.
    InSection,
    /// Inside the profile block. `columns` is unset until the header is seen;
    /// `unusable` marks a header that lacked one of the timestamp columns.
    InBlock {
        columns: Option<ColumnIndex>,
        unusable: bool,
    },
}

/// Extract the focused window's frame samples from a framestats dump.
///
/// Only the first profile block after the window's section header is read,
/// and only once its closing marker has been seen. A missing window, a
/// missing or unterminated block, or a header without the timestamp columns
/// all yield an empty list: there is simply no new frame data this tick.
/// Rows that are short or non-numeric are skipped individually.
pub fn parse_frame_samples(dump: &str, focused_window: &str) -> Vec<FrameSample> {
    let focused_window = focused_window.trim();
    if focused_window.is_empty() {
        return Vec::new();
    }

    let mut state = ParseState::SeekingWindow;
    let mut samples = Vec::new();
    let mut skipped_rows = 0usize;

    for line in dump.lines() {
        let line = line.trim();

        match state {
            ParseState::SeekingWindow => {
                if is_window_header(line, focused_window) {
                    state = ParseState::InSection;
                }
            }
            ParseState::InSection => {
                if line.contains(PROFILE_DATA_MARKER) {
                    state = ParseState::InBlock {
                        columns: None,
                        unusable: false,
                    };
                } else if is_section_start(line) && !is_window_header(line, focused_window) {
                    // Next window's section began before ours had a block.
                    state = ParseState::SeekingWindow;
                }
            }
            ParseState::InBlock {
                ref mut columns,
                ref mut unusable,
            } => {
                if line.contains(PROFILE_DATA_MARKER) {
                    if skipped_rows > 0 {
                        tracing::debug!("Skipped {} malformed framestats rows", skipped_rows);
                    }
                    return samples;
                }
                if line.is_empty() || *unusable {
                    continue;
                }
                match *columns {
                    None if line.contains(INTENDED_VSYNC_COLUMN) => {
                        *columns = ColumnIndex::from_header(line);
                        if columns.is_none() {
                            tracing::debug!("framestats header lacks timestamp columns: {}", line);
                            *unusable = true;
                        }
                    }
                    None => skipped_rows += 1,
                    Some(index) => match index.parse_row(line) {
                        Some(sample) => samples.push(sample),
                        None => skipped_rows += 1,
                    },
                }
            }
        }
    }

    if matches!(state, ParseState::InBlock { .. }) {
        tracing::debug!("framestats profile block for {} was not terminated", focused_window);
    }
    Vec::new()
}

fn is_window_header(line: &str, focused_window: &str) -> bool {
    line.contains("Window") && line.contains(focused_window)
}

fn is_section_start(line: &str) -> bool {
    line.starts_with("Window")
}
