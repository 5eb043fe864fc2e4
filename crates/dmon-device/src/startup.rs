//! Cold-start timing from `am start -S -W <activity>`

use dmon_core::prelude::*;
use serde::Serialize;

/// Launch timings reported by the activity manager, in milliseconds.
///
/// - `total_time_ms`: all activities of the launch, including process creation
/// - `wait_time_ms`: the whole `startActivity` call inside the activity manager
/// - `this_time_ms`: the last activity in the launch chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StartupTiming {
    pub activity: Option<String>,
    pub status: Option<String>,
    pub total_time_ms: Option<u64>,
    pub wait_time_ms: Option<u64>,
    pub this_time_ms: Option<u64>,
}

/// Parse `am start -W` output.
///
/// ```text
/// Stopping: com.example.shop
/// Starting: Intent { cmp=com.example.shop/.MainActivity }
/// Status: ok
/// LaunchState: COLD
/// Activity: com.example.shop/.MainActivity
/// TotalTime: 812
/// WaitTime: 830
/// Complete
/// ```
///
/// An `Error:` line becomes [`Error::Device`]; output without any timing is a
/// parse error.
pub fn parse_startup_timing(output: &str) -> Result<StartupTiming> {
    let mut timing = StartupTiming::default();

    for line in output.lines().map(str::trim) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "Error" => return Err(Error::device(format!("am start failed: {}", value))),
            "Status" => timing.status = Some(value.to_string()),
            "Activity" => timing.activity = Some(value.to_string()),
            "TotalTime" => timing.total_time_ms = value.parse().ok(),
            "WaitTime" => timing.wait_time_ms = value.parse().ok(),
            "ThisTime" => timing.this_time_ms = value.parse().ok(),
            _ => {}
        }
    }

    if timing.total_time_ms.is_none() && timing.wait_time_ms.is_none() {
        return Err(Error::parse("am start output has no TotalTime or WaitTime"));
    }

    Ok(timing)
}
