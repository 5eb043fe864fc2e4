//! Sampling Loop
//!
//! One [`Monitor`] run resolves the target process, takes an I/O baseline and
//! then polls the device on a fixed interval until its [`CancelToken`] fires.
//! Each tick:
//!
//! 1. reset the on-device frame counters (best effort)
//! 2. sleep for the interval, racing cancellation
//! 3. query focused window, I/O counters, frame stats, CPU and memory
//! 4. fold frame samples into the [`EstimatorState`] and I/O and PSS
//!    readings into their rate trackers
//! 5. publish one [`MetricsTick`]
//!
//! Any query may come back empty or fail; that metric is `None` for the tick
//! and the loop carries on. Only setup failures end a run early.

use std::sync::Arc;
use std::time::Duration;

use dmon_core::prelude::*;
use dmon_core::{
    parse_frame_samples, EstimatorState, IoCounterSnapshot, IoRateTracker, MemoryRateTracker,
    MetricsTick,
};
use dmon_device::DeviceQuery;

use crate::cancel::CancelToken;
use crate::config::MonitorSettings;
use crate::gauges::Gauges;
use crate::monitor_event::{MonitorEvent, StopReason};
use crate::sink::MetricsSink;
use crate::workers::{WorkerPlan, Workers};

/// What to monitor and which workers to run
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub package: String,
    pub interval: Duration,
    pub touch_device: Option<String>,
    pub cpu_top: bool,
    pub gpu_busy_path: Option<String>,
    pub gpu_interval: Duration,
}

impl MonitorConfig {
    /// Poll `package` every 500ms with no background workers.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            interval: Duration::from_millis(500),
            touch_device: None,
            cpu_top: false,
            gpu_busy_path: None,
            gpu_interval: Duration::from_secs(1),
        }
    }

    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            package: settings.package.clone(),
            interval: settings.interval(),
            touch_device: settings.touch_device().map(String::from),
            cpu_top: settings.cpu_top,
            gpu_busy_path: settings.gpu_busy_path().map(String::from),
            gpu_interval: settings.gpu_interval(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_touch_device(mut self, input_device: impl Into<String>) -> Self {
        self.touch_device = Some(input_device.into());
        self
    }

    pub fn with_cpu_top(mut self, enabled: bool) -> Self {
        self.cpu_top = enabled;
        self
    }

    pub fn with_gpu_busy(mut self, path: impl Into<String>, interval: Duration) -> Self {
        self.gpu_busy_path = Some(path.into());
        self.gpu_interval = interval;
        self
    }

    fn worker_plan(&self, pid: u32) -> WorkerPlan {
        WorkerPlan {
            pid,
            cpu_top: self.cpu_top,
            gpu_busy_path: self.gpu_busy_path.clone(),
            gpu_interval: self.gpu_interval,
            touch_device: self.touch_device.clone(),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone)]
pub struct MonitorReport {
    /// Estimator state after the last tick. Kept for inspection; a new run
    /// starts from a fresh state.
    pub estimator: EstimatorState,
    /// Ticks published
    pub ticks: u64,
    pub stop_reason: StopReason,
}

impl MonitorReport {
    pub fn is_fatal(&self) -> bool {
        matches!(self.stop_reason, StopReason::Fatal(_))
    }
}

/// What setup hands to the polling cycle
struct Baseline {
    pid: u32,
    window: Option<String>,
    io: IoRateTracker,
}

/// Per-run state owned by the polling cycle
struct TickState {
    pid: u32,
    estimator: EstimatorState,
    io: IoRateTracker,
    memory: MemoryRateTracker,
    sequence: u64,
}

/// Drives one monitoring run against a [`DeviceQuery`]
pub struct Monitor<D> {
    device: Arc<D>,
    config: MonitorConfig,
    gauges: Arc<Gauges>,
    cancel: CancelToken,
}

impl<D> Monitor<D>
where
    D: DeviceQuery + Send + Sync + 'static,
{
    pub fn new(device: Arc<D>, config: MonitorConfig, cancel: CancelToken) -> Self {
        Self {
            device,
            config,
            gauges: Arc::new(Gauges::default()),
            cancel,
        }
    }

    /// Slots the background workers write into.
    pub fn gauges(&self) -> Arc<Gauges> {
        self.gauges.clone()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run until cancelled or until setup fails.
    ///
    /// Errors never escape: setup failures end the run with
    /// [`StopReason::Fatal`], per-tick failures degrade that tick's metric.
    pub async fn run<S>(self, sink: &S) -> MonitorReport
    where
        S: MetricsSink + ?Sized,
    {
        let package = self.config.package.clone();

        let baseline = match self.setup().await {
            Ok(baseline) => baseline,
            Err(e) => {
                debug_assert!(e.is_fatal(), "setup returned a non-fatal error: {e}");
                error!("Monitoring {} could not start: {}", package, e);
                let reason = StopReason::Fatal(e.to_string());
                sink.on_event(&MonitorEvent::Stopped {
                    reason: reason.clone(),
                    ticks: 0,
                });
                return MonitorReport {
                    estimator: EstimatorState::new(),
                    ticks: 0,
                    stop_reason: reason,
                };
            }
        };

        info!(
            "Monitoring {} (PID: {}, Window: {})",
            package,
            baseline.pid,
            baseline.window.as_deref().unwrap_or("unknown")
        );
        sink.on_event(&MonitorEvent::Started {
            package: package.clone(),
            pid: baseline.pid,
            window: baseline.window.clone(),
        });

        let workers = Workers::spawn(
            self.device.clone(),
            &self.config.worker_plan(baseline.pid),
            self.gauges.clone(),
            self.cancel.clone(),
        );

        let mut state = TickState {
            pid: baseline.pid,
            estimator: EstimatorState::new(),
            io: baseline.io,
            memory: MemoryRateTracker::new(),
            sequence: 0,
        };

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if let Err(e) = self.device.reset_frame_counters(&package).await {
                warn!("Failed to reset frame counters for {}: {}", package, e);
            }
            if self.cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }

            match self.sample(&mut state).await {
                Some(tick) => sink.publish(&tick),
                None => break,
            }
        }

        workers.shutdown().await;
        info!("Monitoring {} stopped after {} ticks", package, state.sequence);
        sink.on_event(&MonitorEvent::Stopped {
            reason: StopReason::Cancelled,
            ticks: state.sequence,
        });

        MonitorReport {
            estimator: state.estimator,
            ticks: state.sequence,
            stop_reason: StopReason::Cancelled,
        }
    }

    async fn setup(&self) -> Result<Baseline> {
        let package = &self.config.package;

        let pid = self
            .device
            .resolve_pid(package)
            .await
            .map_err(|e| escalate(e, Error::process_not_found(package.as_str())))?
            .ok_or_else(|| Error::process_not_found(package.as_str()))?;
        debug!("{} is running as PID {}", package, pid);

        let window = match self.device.focused_window().await {
            Ok(Some(window)) => {
                if !window.contains(package.as_str()) {
                    warn!("Focused window {} does not belong to {}", window, package);
                }
                Some(window)
            }
            Ok(None) => {
                warn!("Could not find the current focus window");
                None
            }
            Err(e) => {
                warn!("Could not query the current focus window: {}", e);
                None
            }
        };

        let counters = match self.device.io_counters(pid).await {
            Ok(Some(counters)) => counters,
            Ok(None) => return Err(Error::IoBaseline { pid }),
            Err(e) => return Err(escalate(e, Error::IoBaseline { pid })),
        };

        Ok(Baseline {
            pid,
            window,
            io: IoRateTracker::new(IoCounterSnapshot::new(counters, now())),
        })
    }

    /// Query every metric once. `None` when cancelled partway through.
    async fn sample(&self, state: &mut TickState) -> Option<MetricsTick> {
        let package = self.config.package.as_str();
        let pid = state.pid;

        let focused_window = match self.device.focused_window().await {
            Ok(window) => window,
            Err(e) => {
                query_failed("Focus window", &e);
                None
            }
        };
        if focused_window.is_none() {
            info!("Could not find the current focus window");
        }
        if self.cancel.is_cancelled() {
            return None;
        }

        let io = match self.device.io_counters(pid).await {
            Ok(Some(counters)) => Some(state.io.update(IoCounterSnapshot::new(counters, now()))),
            Ok(None) => {
                info!("IO counters unavailable for PID {}", pid);
                None
            }
            Err(e) => {
                query_failed("IO counters", &e);
                None
            }
        };
        if self.cancel.is_cancelled() {
            return None;
        }

        let samples = match &focused_window {
            Some(window) => {
                let dump = match self.device.frame_stats_dump(package).await {
                    Ok(dump) => dump,
                    Err(e) => {
                        query_failed("Frame stats", &e);
                        None
                    }
                };
                if self.cancel.is_cancelled() {
                    return None;
                }
                dump.map(|dump| parse_frame_samples(&dump, window))
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };
        let frames = state.estimator.estimate(&samples);
        if frames.is_held() {
            debug!("No new frames, holding FPS at {:.2}", frames.fps);
        }

        let cpu = match self.device.cpu_usage(package).await {
            Ok(cpu) => cpu,
            Err(e) => {
                query_failed("CPU usage", &e);
                None
            }
        };
        if self.cancel.is_cancelled() {
            return None;
        }

        let memory = match self.device.memory_usage(package).await {
            Ok(memory) => memory,
            Err(e) => {
                query_failed("Memory usage", &e);
                None
            }
        };
        if self.cancel.is_cancelled() {
            return None;
        }
        let memory_rate_kb_per_sec = memory
            .as_ref()
            .and_then(|memory| state.memory.update(memory.total_pss_kb, now()));

        let touches = self
            .config
            .touch_device
            .is_some()
            .then(|| self.gauges.touches.take());

        state.sequence += 1;
        Some(MetricsTick {
            sequence: state.sequence,
            timestamp: chrono::Local::now(),
            focused_window,
            io,
            frames,
            cpu,
            process_cpu: self.gauges.process_cpu.get(),
            gpu_busy: self.gauges.gpu_busy.get(),
            memory,
            memory_rate_kb_per_sec,
            touches,
        })
    }
}

/// A setup step failed. Fatal errors pass through; anything else is reported
/// as `fallback`, the setup error for that step.
fn escalate(e: Error, fallback: Error) -> Error {
    if e.is_fatal() {
        e
    } else {
        debug!("Setup query failed: {}", e);
        fallback
    }
}

/// Log a per-tick query failure. Transient device errors are expected noise.
fn query_failed(what: &str, e: &Error) {
    if e.is_recoverable() {
        info!("{} unavailable: {}", what, e);
    } else {
        warn!("{} unavailable: {}", what, e);
    }
}

/// Host instant on the tokio clock, so paused-time tests see exact intervals.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
