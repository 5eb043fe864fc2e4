//! Parsers for process lookup, `/proc/<pid>/io` and GPU busy readings

use dmon_core::IoCounters;
use regex::Regex;
use std::sync::LazyLock;

static PERCENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("Invalid percent regex"));

/// First pid printed by `pidof <package>`.
pub fn parse_pidof(output: &str) -> Option<u32> {
    output
        .split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
}

/// Parse `/proc/<pid>/io`.
///
/// ```text
/// rchar: 3214221
/// wchar: 120934
/// read_bytes: 8192
/// write_bytes: 40960
/// ```
///
/// Both `read_bytes` and `write_bytes` must be present; other keys and
/// malformed lines are ignored.
pub fn parse_io_counters(output: &str) -> Option<IoCounters> {
    let mut read_bytes = None;
    let mut write_bytes = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Ok(value) = value.trim().parse::<u64>() else {
            continue;
        };
        match key.trim() {
            "read_bytes" => read_bytes = Some(value),
            "write_bytes" => write_bytes = Some(value),
            _ => {}
        }
    }

    Some(IoCounters {
        read_bytes: read_bytes?,
        write_bytes: write_bytes?,
    })
}

/// Parse a GPU busy reading.
///
/// Accepts the Adreno `gpu_busy_percentage` form (`42 %`), a bare
/// percentage, kgsl log lines ending in `percentage busy 42%`, and the raw
/// `gpubusy` counter pair `<busy> <total>`.
pub fn parse_gpu_busy(output: &str) -> Option<f64> {
    if let Some(caps) = PERCENT_PATTERN.captures_iter(output).last() {
        return caps[1].parse().ok();
    }

    let numbers: Vec<f64> = output
        .split_whitespace()
        .map_while(|token| token.parse::<f64>().ok())
        .collect();
    match numbers.as_slice() {
        [percent] => Some(*percent),
        [_, total] if *total == 0.0 => Some(0.0),
        [busy, total] => Some(busy / total * 100.0),
        _ => None,
    }
}
