//! Metrics sinks: where each [`MetricsTick`] goes
//!
//! The sampling loop hands every tick to one [`MetricsSink`] and never looks
//! at what the sink does with it. Sinks must not block; a slow consumer reads
//! from a [`LatestSink`] instead of being called directly.

use std::io::Write;
use std::sync::Mutex;

use dmon_core::{MemoryUsage, MetricsTick};
use tokio::sync::watch;

use crate::monitor_event::{MonitorEvent, StopReason};

/// Receiver of sampling-loop output
pub trait MetricsSink: Send + Sync {
    /// Called once per tick. Fire-and-forget.
    fn publish(&self, tick: &MetricsTick);

    /// Called when the run starts and stops.
    fn on_event(&self, _event: &MonitorEvent) {}
}

impl<S: MetricsSink + ?Sized> MetricsSink for std::sync::Arc<S> {
    fn publish(&self, tick: &MetricsTick) {
        (**self).publish(tick)
    }

    fn on_event(&self, event: &MonitorEvent) {
        (**self).on_event(event)
    }
}

// ─────────────────────────────────────────────────────────────────
// LatestSink
// ─────────────────────────────────────────────────────────────────

/// Single-slot handoff of the newest tick.
///
/// Publishing overwrites the slot; readers see only the latest value and
/// never block the sampling loop.
#[derive(Debug)]
pub struct LatestSink {
    tx: watch::Sender<Option<MetricsTick>>,
}

impl LatestSink {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn reader(&self) -> LatestReader {
        LatestReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> Option<MetricsTick> {
        self.tx.borrow().clone()
    }
}

impl Default for LatestSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for LatestSink {
    fn publish(&self, tick: &MetricsTick) {
        self.tx.send_replace(Some(tick.clone()));
    }
}

/// Read side of a [`LatestSink`]
#[derive(Debug, Clone)]
pub struct LatestReader {
    rx: watch::Receiver<Option<MetricsTick>>,
}

impl LatestReader {
    /// Newest tick, marking it seen.
    pub fn snapshot(&mut self) -> Option<MetricsTick> {
        self.rx.borrow_and_update().clone()
    }

    /// Whether a tick arrived since the last [`snapshot`](Self::snapshot).
    pub fn has_new(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

// ─────────────────────────────────────────────────────────────────
// LogSink
// ─────────────────────────────────────────────────────────────────

/// Writes a readable block per tick through `tracing`, and optionally to a
/// line writer such as stdout.
pub struct LogSink {
    package: String,
    writer: Option<Mutex<Box<dyn Write + Send>>>,
}

impl LogSink {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            writer: None,
        }
    }

    pub fn with_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.writer = Some(Mutex::new(Box::new(writer)));
        self
    }

    fn emit(&self, lines: &[String]) {
        for line in lines {
            tracing::info!(target: "dmon::metrics", "{}", line);
        }

        let Some(writer) = &self.writer else {
            return;
        };
        let mut writer = writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(writer, "{}", line))
            .and_then(|_| writer.flush());
        if let Err(e) = result {
            tracing::debug!("Failed to write metrics log: {}", e);
        }
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("package", &self.package)
            .field("writer", &self.writer.is_some())
            .finish()
    }
}

impl MetricsSink for LogSink {
    fn publish(&self, tick: &MetricsTick) {
        self.emit(&format_tick(tick, &self.package));
    }

    fn on_event(&self, event: &MonitorEvent) {
        let line = match event {
            MonitorEvent::Started {
                package,
                pid,
                window,
            } => format!(
                "Monitoring {} (PID: {}, Window: {})",
                package,
                pid,
                window.as_deref().unwrap_or("unknown")
            ),
            MonitorEvent::Stopped {
                reason: StopReason::Cancelled,
                ticks,
            } => format!("Monitoring stopped after {} samples", ticks),
            MonitorEvent::Stopped {
                reason: StopReason::Fatal(message),
                ..
            } => format!("Monitoring could not start: {}", message),
        };
        self.emit(&[line]);
    }
}

/// Render one tick as log lines. Unavailable metrics are reported as such.
pub fn format_tick(tick: &MetricsTick, package: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "#{} {}",
        tick.sequence,
        tick.timestamp.format("%H:%M:%S")
    )];

    lines.push(match &tick.focused_window {
        Some(window) => format!("The current focus window: {}", window),
        None => "Could not find the current focus window".to_string(),
    });

    lines.push(match &tick.io {
        Some(io) => format!(
            "Read: {:.1} kBytes/s, Write: {:.1} kBytes/s",
            io.read_kb_per_sec(),
            io.write_kb_per_sec()
        ),
        None => "IO: N/A".to_string(),
    });

    let frames = &tick.frames;
    lines.push(if frames.is_held() {
        format!("FPS: {:.2} (no new frames)", frames.fps)
    } else {
        format!(
            "FPS: {:.2}, janky frames: {}/{} ({:.1}%)",
            frames.fps, frames.jank_count, frames.accepted_frames, frames.jank_ratio
        )
    });

    lines.push(match &tick.cpu {
        Some(cpu) => format!(
            "{} CPU usage: {:.1}%, total CPU usage: {:.1}%",
            package, cpu.package_percent, cpu.total_percent
        ),
        None => "No valid CPU info".to_string(),
    });
    if let Some(percent) = tick.process_cpu {
        lines.push(format!("Process CPU (top): {:.1}%", percent));
    }
    if let Some(percent) = tick.gpu_busy {
        lines.push(format!("GPU busy: {:.1}%", percent));
    }

    lines.push(match &tick.memory {
        Some(memory) => format_memory(memory, tick.memory_rate_kb_per_sec),
        None => "No valid memory info".to_string(),
    });

    if let Some(touches) = tick.touches {
        lines.push(format!("Touch reports: {}", touches));
    }

    lines
}

fn format_memory(memory: &MemoryUsage, rate_kb_per_sec: Option<f64>) -> String {
    let optional = |value: Option<u64>| value.map_or_else(|| "N/A".to_string(), |v| v.to_string());
    let mut line = format!(
        "Memory: Total PSS: {}, Total RSS: {}, Views: {}, Activities: {}",
        MemoryUsage::format_kb(memory.total_pss_kb),
        memory
            .total_rss_kb
            .map_or_else(|| "N/A".to_string(), MemoryUsage::format_kb),
        optional(memory.views),
        optional(memory.activities)
    );
    if let Some(rate) = rate_kb_per_sec {
        line.push_str(&format!(", PSS rate: {:+.1} KB/s", rate));
    }
    line
}

// ─────────────────────────────────────────────────────────────────
// FanoutSink
// ─────────────────────────────────────────────────────────────────

/// Forwards every call to each inner sink in order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MetricsSink for FanoutSink {
    fn publish(&self, tick: &MetricsTick) {
        for sink in &self.sinks {
            sink.publish(tick);
        }
    }

    fn on_event(&self, event: &MonitorEvent) {
        for sink in &self.sinks {
            sink.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmon_core::{CpuUsage, IoRates, JankReport};
    use std::sync::Arc;

    fn tick(sequence: u64) -> MetricsTick {
        MetricsTick {
            sequence,
            timestamp: chrono::Local::now(),
            focused_window: Some("com.example/com.example.Main".to_string()),
            io: Some(IoRates {
                read_bytes_per_sec: 2048.0,
                write_bytes_per_sec: 512.0,
            }),
            frames: JankReport {
                fps: 37.5,
                accepted_frames: 5,
                jank_count: 2,
                jank_ratio: 40.0,
                vsync_overruns: 3.0,
            },
            cpu: Some(CpuUsage {
                package_percent: 12.0,
                total_percent: 35.0,
            }),
            process_cpu: None,
            gpu_busy: Some(42.0),
            memory: Some(MemoryUsage {
                total_pss_kb: 102_400,
                total_rss_kb: None,
                views: Some(245),
                activities: Some(1),
            }),
            memory_rate_kb_per_sec: Some(-12.0),
            touches: Some(3),
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_latest_sink_keeps_newest() {
        let sink = LatestSink::new();
        let mut reader = sink.reader();
        assert!(reader.snapshot().is_none());

        sink.publish(&tick(1));
        sink.publish(&tick(2));

        assert!(reader.has_new());
        assert_eq!(reader.snapshot().map(|t| t.sequence), Some(2));
        assert!(!reader.has_new());
        assert_eq!(sink.snapshot().map(|t| t.sequence), Some(2));
    }

    #[test]
    fn test_format_tick_lines() {
        let lines = format_tick(&tick(7), "com.example");

        assert!(lines[0].starts_with("#7 "));
        assert_eq!(lines[1], "The current focus window: com.example/com.example.Main");
        assert_eq!(lines[2], "Read: 2.0 kBytes/s, Write: 0.5 kBytes/s");
        assert_eq!(lines[3], "FPS: 37.50, janky frames: 2/5 (40.0%)");
        assert_eq!(lines[4], "com.example CPU usage: 12.0%, total CPU usage: 35.0%");
        assert_eq!(lines[5], "GPU busy: 42.0%");
        assert_eq!(
            lines[6],
            "Memory: Total PSS: 100.0 MB, Total RSS: N/A, Views: 245, Activities: 1, PSS rate: -12.0 KB/s"
        );
        assert_eq!(lines[7], "Touch reports: 3");
    }

    #[test]
    fn test_format_tick_unavailable_metrics() {
        let mut t = tick(1);
        t.focused_window = None;
        t.io = None;
        t.cpu = None;
        t.gpu_busy = None;
        t.memory = None;
        t.touches = None;
        t.frames = JankReport {
            fps: 45.0,
            ..JankReport::default()
        };

        let lines = format_tick(&t, "com.example");

        assert_eq!(
            &lines[1..],
            &[
                "Could not find the current focus window",
                "IO: N/A",
                "FPS: 45.00 (no new frames)",
                "No valid CPU info",
                "No valid memory info",
            ]
        );
    }

    #[test]
    fn test_log_sink_writes_lines() {
        let buf = SharedBuf::default();
        let sink = LogSink::new("com.example").with_writer(buf.clone());

        sink.publish(&tick(3));
        sink.on_event(&MonitorEvent::Stopped {
            reason: StopReason::Cancelled,
            ticks: 3,
        });

        let out = buf.contents();
        assert!(out.contains("FPS: 37.50"));
        assert!(out.ends_with("Monitoring stopped after 3 samples\n"));
    }

    #[test]
    fn test_fanout_forwards_to_all() {
        let first = Arc::new(LatestSink::new());
        let second = Arc::new(LatestSink::new());
        let fanout = FanoutSink::new().with(first.clone()).with(second.clone());

        fanout.publish(&tick(9));

        assert_eq!(fanout.len(), 2);
        assert_eq!(first.snapshot().map(|t| t.sequence), Some(9));
        assert_eq!(second.snapshot().map(|t| t.sequence), Some(9));
    }
}
