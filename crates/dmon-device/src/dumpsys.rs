//! Parsers for `dumpsys` output: window focus, cpuinfo and meminfo

use dmon_core::{CpuUsage, MemoryUsage};
use regex::Regex;
use std::sync::LazyLock;

/// Lines of `dumpsys cpuinfo` that carry a load figure start with a percentage.
static CPU_LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)%").expect("Invalid cpuinfo line regex"));

/// Parse the focused window from `dumpsys window` output.
///
/// Reads the `mCurrentFocus` line, e.g.
/// `mCurrentFocus=Window{a1b2c3 u0 com.example/com.example.MainActivity}`, and
/// returns its last token without the closing brace. The `pkg/.Activity`
/// shorthand is expanded to `pkg/pkg.Activity` so the name matches the window
/// labels in `gfxinfo` dumps. `mCurrentFocus=null` yields `None`.
pub fn parse_focused_window(output: &str) -> Option<String> {
    let line = output.lines().find(|line| line.contains("mCurrentFocus"))?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    let window = tokens[tokens.len() - 1].trim_end_matches('}');
    if window.is_empty() {
        return None;
    }

    Some(expand_activity_shorthand(window))
}

fn expand_activity_shorthand(window: &str) -> String {
    match window.split_once("/.") {
        Some((package, activity)) => format!("{package}/{package}.{activity}"),
        None => window.to_string(),
    }
}

/// Parse package and total CPU load from `dumpsys cpuinfo`.
///
/// ```text
///   12% 12345/com.example.shop: 8.1% user + 3.9% kernel / faults: 120 minor
///   35% TOTAL: 20% user + 12% kernel + 1.2% iowait
/// ```
///
/// Loads of several processes named exactly `package` are summed. Returns
/// `None` when neither the package nor the `TOTAL` line is present.
pub fn parse_cpuinfo(output: &str, package: &str) -> Option<CpuUsage> {
    let mut package_percent = None::<f64>;
    let mut total_percent = None::<f64>;

    for line in output.lines().map(str::trim) {
        let Some(caps) = CPU_LINE_PATTERN.captures(line) else {
            continue;
        };
        let Ok(percent) = caps[1].parse::<f64>() else {
            continue;
        };

        let Some(process) = line.split_whitespace().nth(1) else {
            continue;
        };
        if process.starts_with("TOTAL") {
            total_percent = Some(percent);
        } else if process_name(process) == Some(package) {
            *package_percent.get_or_insert(0.0) += percent;
        }
    }

    if package_percent.is_none() && total_percent.is_none() {
        return None;
    }

    Some(CpuUsage {
        package_percent: package_percent.unwrap_or(0.0),
        total_percent: total_percent.unwrap_or(0.0),
    })
}

/// `12345/com.example.shop:` -> `com.example.shop`
fn process_name(token: &str) -> Option<&str> {
    let (_, name) = token.split_once('/')?;
    Some(name.trim_end_matches(':'))
}

/// Parse the summary figures of `dumpsys meminfo <package>`.
///
/// Recent releases print a summary line
/// `TOTAL PSS:   123456   TOTAL RSS:   234567   TOTAL SWAP PSS:   12`;
/// older ones only have a `TOTAL  123456 ...` table row, whose first column
/// is PSS. `Views:` and `Activities:` come from the Objects section.
pub fn parse_meminfo(output: &str) -> Option<MemoryUsage> {
    let mut total_pss_kb = None;
    let mut table_total_kb = None;
    let mut total_rss_kb = None;
    let mut views = None;
    let mut activities = None;

    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.first() {
            Some(&"TOTAL") if table_total_kb.is_none() => {
                table_total_kb = tokens.get(1).and_then(|t| t.parse::<u64>().ok());
            }
            _ => {}
        }

        total_pss_kb = total_pss_kb.or_else(|| labelled_value(&tokens, &["TOTAL", "PSS:"]));
        total_rss_kb = total_rss_kb.or_else(|| labelled_value(&tokens, &["TOTAL", "RSS:"]));
        views = views.or_else(|| labelled_value(&tokens, &["Views:"]));
        activities = activities.or_else(|| labelled_value(&tokens, &["Activities:"]));
    }

    Some(MemoryUsage {
        total_pss_kb: total_pss_kb.or(table_total_kb)?,
        total_rss_kb,
        views,
        activities,
    })
}

/// Value following the token sequence `label`, e.g. `["TOTAL", "PSS:"]`.
fn labelled_value(tokens: &[&str], label: &[&str]) -> Option<u64> {
    tokens
        .windows(label.len() + 1)
        .find(|window| &window[..label.len()] == label)
        .and_then(|window| window[label.len()].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focused_window_full_name() {
        let output = "  mCurrentFocus=Window{a1b2c3 u0 com.example.shop/com.example.shop.MainActivity}\n  mFocusedApp=ActivityRecord{...}";
        assert_eq!(
            parse_focused_window(output).as_deref(),
            Some("com.example.shop/com.example.shop.MainActivity")
        );
    }

    #[test]
    fn test_focused_window_shorthand_is_expanded() {
        let output = "mCurrentFocus=Window{f00 u0 com.example.shop/.ui.CartActivity}";
        assert_eq!(
            parse_focused_window(output).as_deref(),
            Some("com.example.shop/com.example.shop.ui.CartActivity")
        );
    }

    #[test]
    fn test_focused_window_without_activity() {
        let output = "  mCurrentFocus=Window{4b2 u0 NotificationShade}";
        assert_eq!(
            parse_focused_window(output).as_deref(),
            Some("NotificationShade")
        );
    }

    #[test]
    fn test_focused_window_null() {
        assert_eq!(parse_focused_window("  mCurrentFocus=null"), None);
        assert_eq!(parse_focused_window(""), None);
    }

    const CPUINFO: &str = "\
Load: 5.01 / 4.87 / 4.65
CPU usage from 60123ms to 1023ms ago (2024-05-01 10:00:00.000 to 2024-05-01 10:01:00.000):
  12% 12345/com.example.shop: 8.1% user + 3.9% kernel / faults: 120 minor
  3.5% 12399/com.example.shop:push: 2% user + 1.5% kernel
  4% 12400/com.example.shop: 3% user + 1% kernel
  9.2% 1000/system_server: 5% user + 4.2% kernel
35% TOTAL: 20% user + 12% kernel + 1.2% iowait + 0.5% irq";

    #[test]
    fn test_cpuinfo_package_and_total() {
        let usage = parse_cpuinfo(CPUINFO, "com.example.shop").unwrap();
        assert!((usage.package_percent - 16.0).abs() < 1e-9);
        assert!((usage.total_percent - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpuinfo_package_absent() {
        let usage = parse_cpuinfo(CPUINFO, "com.other").unwrap();
        assert_eq!(usage.package_percent, 0.0);
        assert!((usage.total_percent - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpuinfo_nothing_found() {
        assert_eq!(parse_cpuinfo("Load: 1.0 / 1.0 / 1.0", "com.example.shop"), None);
    }

    const MEMINFO: &str = "\
Applications Memory Usage (in Kilobytes):
Uptime: 4087214 Realtime: 4087214

** MEMINFO in pid 12345 [com.example.shop] **
                   Pss  Private  Private  SwapPss      Rss     Heap     Heap     Heap
                 Total    Dirty    Clean    Dirty    Total     Size    Alloc     Free
                ------   ------   ------   ------   ------   ------   ------   ------
  Native Heap    21204    21148        0       12    23456    32768    25000     7768
        TOTAL   104567    80420    12000      120   180001    65536    50000    15536

 App Summary
                       Pss(KB)                        Rss(KB)
                        ------                         ------
           Java Heap:    12000                          24000
               TOTAL PSS:   104567            TOTAL RSS:   180001       TOTAL SWAP PSS:      120

 Objects
               Views:      245         ViewRootImpl:        2
         AppContexts:        6           Activities:        1
              Assets:       22        AssetManagers:        0
       Local Binders:       40        Proxy Binders:       45
    Death Recipients:        3             WebViews:        0";

    #[test]
    fn test_meminfo_summary() {
        let usage = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(usage.total_pss_kb, 104_567);
        assert_eq!(usage.total_rss_kb, Some(180_001));
        assert_eq!(usage.views, Some(245));
        assert_eq!(usage.activities, Some(1));
    }

    #[test]
    fn test_meminfo_table_total_fallback() {
        let output = "\
** MEMINFO in pid 4321 [com.legacy] **
        TOTAL    56789    40000     1000        0
 Objects
               Views:       12         ViewRootImpl:        1";
        let usage = parse_meminfo(output).unwrap();
        assert_eq!(usage.total_pss_kb, 56_789);
        assert_eq!(usage.total_rss_kb, None);
        assert_eq!(usage.views, Some(12));
        assert_eq!(usage.activities, None);
    }

    #[test]
    fn test_meminfo_missing_process() {
        assert_eq!(parse_meminfo("No process found for: com.example.shop"), None);
    }
}
