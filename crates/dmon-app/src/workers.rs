//! Background workers feeding [`Gauges`]
//!
//! Each worker owns one slot: the `top` poller writes `process_cpu`, the GPU
//! poller writes `gpu_busy` and the touch counter bumps `touches`. They stop
//! when the cancel token fires and are aborted if still running after that.

use std::sync::Arc;
use std::time::Duration;

use dmon_core::prelude::*;
use dmon_device::{count_syn_reports, DeviceQuery};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cancel::CancelToken;
use crate::config::MIN_INTERVAL_MS;
use crate::gauges::Gauges;

/// Cadence of the `top` poller; one `top -n 1` takes about a second anyway.
pub const TOP_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What the workers should sample
#[derive(Debug, Clone, Default)]
pub struct WorkerPlan {
    pub pid: u32,
    pub cpu_top: bool,
    pub gpu_busy_path: Option<String>,
    pub gpu_interval: Duration,
    pub touch_device: Option<String>,
}

/// Handles of the running workers
#[derive(Debug, Default)]
pub struct Workers {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Workers {
    /// Spawn the workers the plan asks for.
    pub fn spawn<D>(
        device: Arc<D>,
        plan: &WorkerPlan,
        gauges: Arc<Gauges>,
        cancel: CancelToken,
    ) -> Self
    where
        D: DeviceQuery + Send + Sync + 'static,
    {
        let mut handles = Vec::new();

        if plan.cpu_top {
            handles.push((
                "top",
                tokio::spawn(poll_process_cpu(
                    device.clone(),
                    plan.pid,
                    gauges.clone(),
                    cancel.clone(),
                )),
            ));
        }

        if let Some(path) = plan.gpu_busy_path.clone() {
            handles.push((
                "gpu",
                tokio::spawn(poll_gpu_busy(
                    device.clone(),
                    path,
                    plan.gpu_interval,
                    gauges.clone(),
                    cancel.clone(),
                )),
            ));
        }

        if let Some(input_device) = plan.touch_device.clone() {
            handles.push((
                "touch",
                tokio::spawn(count_touches(device, input_device, gauges, cancel)),
            ));
        }

        debug!("Started {} background workers", handles.len());
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop the workers. Call after the cancel token has fired; any worker
    /// still blocked in a device call is aborted.
    pub async fn shutdown(self) {
        for (name, handle) in self.handles {
            if !handle.is_finished() {
                trace!("Aborting {} worker", name);
                handle.abort();
            }
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("{} worker failed: {}", name, e);
                }
            }
        }
    }
}

async fn poll_process_cpu<D>(device: Arc<D>, pid: u32, gauges: Arc<Gauges>, cancel: CancelToken)
where
    D: DeviceQuery + Send + Sync + 'static,
{
    let mut tick = tokio::time::interval(TOP_POLL_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {}
        }

        match device.process_cpu(pid).await {
            Ok(Some(percent)) => gauges.process_cpu.set(percent),
            Ok(None) => gauges.process_cpu.clear(),
            Err(e) => {
                debug!("top poll failed for pid {}: {}", pid, e);
                gauges.process_cpu.clear();
            }
        }

        if cancel.is_cancelled() {
            break;
        }
    }
}

async fn poll_gpu_busy<D>(
    device: Arc<D>,
    path: String,
    interval: Duration,
    gauges: Arc<Gauges>,
    cancel: CancelToken,
) where
    D: DeviceQuery + Send + Sync + 'static,
{
    let mut tick = tokio::time::interval(interval.max(Duration::from_millis(MIN_INTERVAL_MS)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reported_failure = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {}
        }

        match device.gpu_busy(&path).await {
            Ok(Some(percent)) => {
                gauges.gpu_busy.set(percent);
                reported_failure = false;
            }
            result => {
                gauges.gpu_busy.clear();
                if !reported_failure {
                    match result {
                        Err(e) => info!("GPU busy unavailable from {}: {}", path, e),
                        _ => info!("GPU busy unreadable from {}", path),
                    }
                    reported_failure = true;
                }
            }
        }

        if cancel.is_cancelled() {
            break;
        }
    }
}

async fn count_touches<D>(
    device: Arc<D>,
    input_device: String,
    gauges: Arc<Gauges>,
    cancel: CancelToken,
) where
    D: DeviceQuery + Send + Sync + 'static,
{
    let mut stream = match device.touch_events(&input_device).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Touch counting unavailable for {}: {}", input_device, e);
            return;
        }
    };

    match count_syn_reports(&mut stream, cancel.cancelled(), || gauges.touches.increment()).await {
        Ok(total) => debug!("Counted {} touch reports on {}", total, input_device),
        Err(e) => warn!("Touch event stream for {} failed: {}", input_device, e),
    }
}
