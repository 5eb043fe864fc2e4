//! Per-process CPU from `top -n 1 -p <pid>`

use regex::Regex;
use std::sync::LazyLock;

static ANSI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("Invalid ANSI escape regex"));

/// Data column used when the header has no `%CPU` token.
const FALLBACK_CPU_COLUMN: usize = 8;

/// Remove terminal escape sequences; toybox `top` colours its header row.
pub fn strip_ansi(text: &str) -> String {
    ANSI_PATTERN.replace_all(text, "").into_owned()
}

/// Parse the `%CPU` figure for `pid` from one `top` iteration.
///
/// ```text
///   PID USER         PR  NI VIRT  RES  SHR S[%CPU] %MEM     TIME+ ARGS
/// 12345 u0_a123      10 -10  14G 212M 120M S  12.3   2.7   0:42.17 com.example.shop
/// ```
///
/// toybox merges the state and CPU headings into one `S[%CPU]` token while
/// the rows keep them apart, so the data column is one past that token.
/// The row for `pid` is preferred; otherwise the first row after the header.
pub fn parse_top_cpu(output: &str, pid: u32) -> Option<f64> {
    let cleaned = strip_ansi(output);
    let lines: Vec<&str> = cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let header_at = lines
        .iter()
        .position(|line| line.contains("%CPU") || line.contains("TIME+ ARGS"))?;
    let column = cpu_column(lines[header_at]);

    let rows = &lines[header_at + 1..];
    let pid = pid.to_string();
    let row = rows
        .iter()
        .find(|row| row.split_whitespace().next() == Some(pid.as_str()))
        .or_else(|| rows.first())?;

    row.split_whitespace().nth(column)?.parse().ok()
}

fn cpu_column(header: &str) -> usize {
    header
        .split_whitespace()
        .position(|token| token.contains("%CPU"))
        .map(|index| {
            if header.contains("[%CPU]") {
                index + 1
            } else {
                index
            }
        })
        .unwrap_or(FALLBACK_CPU_COLUMN)
}
