//! The device query seam between the sampling loop and a device

use dmon_core::prelude::*;
use dmon_core::{CpuUsage, IoCounters, MemoryUsage};

use crate::startup::StartupTiming;
use crate::touch::EventStream;

/// Queries the sampling loop and workers issue against a device.
///
/// `Ok(None)` means the device answered but the figure was not there (no
/// such process, window or block). `Err` means the query itself failed.
/// Callers treat both as "unavailable this tick".
///
/// Implement [`DeviceQuery`]; the `Send` variant is what the app layer
/// requires so queries can run on spawned tasks.
#[trait_variant::make(DeviceQuery: Send)]
pub trait LocalDeviceQuery {
    /// Pid of the package's main process.
    async fn resolve_pid(&self, package: &str) -> Result<Option<u32>>;

    /// Clear the on-device frame history so the next dump only holds new frames.
    async fn reset_frame_counters(&self, package: &str) -> Result<()>;

    /// Window that currently has input focus, as `package/activity`.
    async fn focused_window(&self) -> Result<Option<String>>;

    /// Raw `gfxinfo framestats` dump for the package.
    async fn frame_stats_dump(&self, package: &str) -> Result<Option<String>>;

    async fn io_counters(&self, pid: u32) -> Result<Option<IoCounters>>;

    async fn cpu_usage(&self, package: &str) -> Result<Option<CpuUsage>>;

    async fn memory_usage(&self, package: &str) -> Result<Option<MemoryUsage>>;

    /// `%CPU` of one process as reported by `top`.
    async fn process_cpu(&self, pid: u32) -> Result<Option<f64>>;

    /// GPU busy percentage read from `path` on the device.
    async fn gpu_busy(&self, path: &str) -> Result<Option<f64>>;

    /// Force-stop and cold-start `activity`, reporting launch timings.
    async fn app_startup(&self, activity: &str) -> Result<StartupTiming>;

    /// Open a live stream of input events from `input_device`.
    async fn touch_events(&self, input_device: &str) -> Result<EventStream>;
}
