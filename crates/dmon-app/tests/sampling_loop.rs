//! Sampling loop runs against a scripted device.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dmon_app::{
    CancelToken, MetricsSink, Monitor, MonitorConfig, MonitorEvent, MonitorReport, StopReason,
};
use dmon_core::MetricsTick;
use dmon_device::test_utils::FakeDevice;

const PACKAGE: &str = "com.example.shop";
const MAIN_ACTIVITY: &str = "com.example.shop/com.example.shop.MainActivity";
const DUMP: &str = include_str!("../../dmon-core/tests/fixtures/gfxinfo_framestats.txt");

/// Records everything and cancels the run after `stop_after` ticks.
struct RecordingSink {
    ticks: Mutex<Vec<MetricsTick>>,
    events: Mutex<Vec<MonitorEvent>>,
    stop_after: usize,
    cancel: CancelToken,
}

impl RecordingSink {
    fn new(stop_after: usize, cancel: CancelToken) -> Self {
        Self {
            ticks: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            stop_after,
            cancel,
        }
    }

    fn ticks(&self) -> Vec<MetricsTick> {
        self.ticks.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingSink {
    fn publish(&self, tick: &MetricsTick) {
        let mut ticks = self.ticks.lock().unwrap();
        ticks.push(tick.clone());
        if ticks.len() >= self.stop_after {
            self.cancel.cancel();
        }
    }

    fn on_event(&self, event: &MonitorEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn running_app() -> FakeDevice {
    FakeDevice::new()
        .with_pid(4242)
        .with_focused_window(MAIN_ACTIVITY)
        .with_io(0, 0)
}

async fn run(
    device: Arc<FakeDevice>,
    config: MonitorConfig,
    ticks: usize,
) -> (MonitorReport, RecordingSink) {
    let cancel = CancelToken::new();
    let sink = RecordingSink::new(ticks, cancel.clone());
    let report = Monitor::new(device, config, cancel).run(&sink).await;
    (report, sink)
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_pid_stops_before_polling() {
    let device = Arc::new(FakeDevice::new());

    let (report, sink) = run(device.clone(), MonitorConfig::new(PACKAGE), 1).await;

    assert_eq!(
        report.stop_reason,
        StopReason::Fatal("Could not find PID for package: com.example.shop".to_string())
    );
    assert_eq!(
        sink.events(),
        vec![MonitorEvent::Stopped {
            reason: report.stop_reason.clone(),
            ticks: 0
        }]
    );
    assert_eq!(device.call_count("reset_frame_counters"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_io_baseline_is_fatal() {
    let device = Arc::new(
        FakeDevice::new()
            .with_pid(4242)
            .with_io_failure("cat: /proc/4242/io: Permission denied"),
    );

    let (report, sink) = run(device.clone(), MonitorConfig::new(PACKAGE), 1).await;

    assert_eq!(
        report.stop_reason,
        StopReason::Fatal("Could not get IO stats for PID: 4242".to_string())
    );
    assert!(sink.ticks().is_empty());
    assert_eq!(device.call_count("reset_frame_counters"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pid_lookup_failure_is_fatal() {
    let device = Arc::new(FakeDevice::new().with_pid_failure("error: device offline"));

    let (report, sink) = run(device.clone(), MonitorConfig::new(PACKAGE), 1).await;

    assert_eq!(
        report.stop_reason,
        StopReason::Fatal(format!("Could not find PID for package: {}", PACKAGE))
    );
    assert!(sink.ticks().is_empty());
    assert_eq!(device.calls(), vec![format!("resolve_pid {}", PACKAGE)]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_window_at_startup_only_warns() {
    let device = Arc::new(FakeDevice::new().with_pid(4242).with_io(0, 0));

    let (report, sink) = run(device, MonitorConfig::new(PACKAGE), 1).await;

    assert!(!report.is_fatal());
    assert_eq!(
        sink.events()[0],
        MonitorEvent::Started {
            package: PACKAGE.to_string(),
            pid: 4242,
            window: None
        }
    );
    assert_eq!(sink.ticks()[0].focused_window, None);
}

#[tokio::test(start_paused = true)]
async fn test_tick_queries_run_in_order() {
    let device = Arc::new(running_app());

    run(device.clone(), MonitorConfig::new(PACKAGE), 1).await;

    assert_eq!(
        device.calls(),
        vec![
            "resolve_pid com.example.shop",
            "focused_window",
            "io_counters 4242",
            "reset_frame_counters com.example.shop",
            "focused_window",
            "io_counters 4242",
            "frame_stats_dump com.example.shop",
            "cpu_usage com.example.shop",
            "memory_usage com.example.shop",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_dumps_are_not_recounted() {
    let device = Arc::new(running_app().with_frame_dump(DUMP));

    let (report, sink) = run(device, MonitorConfig::new(PACKAGE), 3).await;
    let ticks = sink.ticks();

    assert_eq!(ticks.len(), 3);
    assert_eq!(ticks[0].frames.accepted_frames, 5);
    assert_eq!(ticks[0].frames.jank_count, 2);
    assert!((ticks[0].frames.fps - 37.5).abs() < 1e-9);

    for tick in &ticks[1..] {
        assert!(tick.frames.is_held());
        assert_eq!(tick.frames.jank_count, 0);
        assert!((tick.frames.fps - 37.5).abs() < 1e-9);
    }
    assert_eq!(report.estimator.last_seen_vsync_ns, 4_086_636_038_776);
    assert_eq!(
        ticks.iter().map(|t| t.sequence).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test(start_paused = true)]
async fn test_io_and_memory_rates_over_interval() {
    let device = Arc::new(
        running_app()
            .with_io(1024, 512)
            .with_memory(10_000)
            .with_memory(10_500),
    );

    let (_, sink) = run(device, MonitorConfig::new(PACKAGE), 2).await;
    let ticks = sink.ticks();

    // The baseline took (0, 0); the first tick reads (1024, 512) 500ms later.
    let first_io = ticks[0].io.expect("io rate");
    assert!((first_io.read_bytes_per_sec - 2048.0).abs() < 1e-6);
    assert!((first_io.write_bytes_per_sec - 1024.0).abs() < 1e-6);
    assert_eq!(ticks[1].io.map(|io| io.read_bytes_per_sec), Some(0.0));

    assert_eq!(ticks[0].memory_rate_kb_per_sec, None);
    let rate = ticks[1].memory_rate_kb_per_sec.expect("memory rate");
    assert!((rate - 1000.0).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_failing_queries_degrade_the_tick() {
    let device = Arc::new(
        running_app()
            .with_io_failure("device offline")
            .with_reset_failure("dumpsys: can't find service"),
    );

    let (report, sink) = run(device.clone(), MonitorConfig::new(PACKAGE), 2).await;
    let ticks = sink.ticks();

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(ticks.len(), 2);
    assert!(ticks.iter().all(|t| t.io.is_none()));
    assert!(ticks.iter().all(|t| t.cpu.is_none() && t.memory.is_none()));
    assert_eq!(device.call_count("reset_frame_counters"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_sleep_stops_without_a_tick() {
    let device = Arc::new(running_app());
    let cancel = CancelToken::new();
    let sink = RecordingSink::new(usize::MAX, cancel.clone());

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        canceller.cancel();
    });

    let started = tokio::time::Instant::now();
    let report = Monitor::new(device.clone(), MonitorConfig::new(PACKAGE), cancel)
        .run(&sink)
        .await;

    assert_eq!(report.ticks, 0);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(device.call_count("frame_stats_dump"), 0);
    assert_eq!(
        sink.events().last(),
        Some(&MonitorEvent::Stopped {
            reason: StopReason::Cancelled,
            ticks: 0
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_worker_gauges_reach_the_tick() {
    let device = Arc::new(
        running_app()
            .with_process_cpu(12.5)
            .with_gpu_busy(40.0)
            .with_touch_events(
                "[ 1.0] EV_SYN SYN_REPORT 00000000\n\
                 [ 1.1] EV_SYN SYN_REPORT 00000000\n\
                 [ 1.2] EV_SYN SYN_REPORT 00000000\n",
            ),
    );
    let config = MonitorConfig::new(PACKAGE)
        .with_cpu_top(true)
        .with_gpu_busy(
            "/sys/class/kgsl/kgsl-3d0/gpu_busy_percentage",
            Duration::from_secs(1),
        )
        .with_touch_device("/dev/input/event2");

    let (_, sink) = run(device, config, 2).await;
    let ticks = sink.ticks();

    assert_eq!(ticks[0].process_cpu, Some(12.5));
    assert_eq!(ticks[0].gpu_busy, Some(40.0));
    assert_eq!(ticks[0].touches, Some(3));
    // The counter is drained every tick.
    assert_eq!(ticks[1].touches, Some(0));
}
