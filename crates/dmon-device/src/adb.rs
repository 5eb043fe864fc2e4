//! `adb`-backed [`DeviceQuery`] implementation

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use dmon_core::prelude::*;
use dmon_core::{CpuUsage, IoCounters, MemoryUsage};
use tokio::process::Command;
use tokio::time::timeout;

use crate::dumpsys::{parse_cpuinfo, parse_focused_window, parse_meminfo};
use crate::procfs::{parse_gpu_busy, parse_io_counters, parse_pidof};
use crate::query::DeviceQuery;
use crate::startup::{parse_startup_timing, StartupTiming};
use crate::top::parse_top_cpu;
use crate::touch::EventStream;

const SDK_ENV_VARS: [&str; 2] = ["ANDROID_HOME", "ANDROID_SDK_ROOT"];

#[cfg(windows)]
const ADB_BINARY: &str = "adb.exe";
#[cfg(not(windows))]
const ADB_BINARY: &str = "adb";

/// Location of the `adb` executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbTool {
    path: PathBuf,
}

impl AdbTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Find `adb`.
    ///
    /// Search order: `explicit` (when non-empty and present), then
    /// `platform-tools` under `ANDROID_HOME` and `ANDROID_SDK_ROOT`, then `PATH`.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
            if path.is_file() {
                return Ok(Self::new(path));
            }
            warn!("Configured adb path {} does not exist, searching SDK and PATH", path.display());
        }

        for var in SDK_ENV_VARS {
            let Some(sdk) = std::env::var_os(var) else {
                continue;
            };
            let candidate = PathBuf::from(sdk).join("platform-tools").join(ADB_BINARY);
            if candidate.is_file() {
                debug!("Using adb from {}: {}", var, candidate.display());
                return Ok(Self::new(candidate));
            }
        }

        which::which("adb")
            .map(Self::new)
            .map_err(|_| Error::AdbNotFound)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A device reached through `adb [-s <serial>] shell`
#[derive(Debug, Clone)]
pub struct AdbDevice {
    tool: AdbTool,
    serial: Option<String>,
    timeout: Option<Duration>,
}

impl AdbDevice {
    pub fn new(tool: AdbTool) -> Self {
        Self {
            tool,
            serial: None,
            timeout: None,
        }
    }

    /// Target a specific device. An empty serial means the default device.
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        let serial = serial.into();
        self.serial = (!serial.trim().is_empty()).then_some(serial);
        self
    }

    /// Per-command time limit. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Arguments passed to `adb` for a shell command.
    pub fn shell_args(&self, shell_command: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if let Some(serial) = &self.serial {
            args.push("-s".to_string());
            args.push(serial.clone());
        }
        args.push("shell".to_string());
        args.push(shell_command.to_string());
        args
    }

    /// Run a shell command on the device and return its stdout.
    pub async fn shell(&self, shell_command: &str) -> Result<String> {
        trace!("adb shell {}", shell_command);

        let mut command = Command::new(self.tool.path());
        command
            .args(self.shell_args(shell_command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => timeout(limit, command.output())
                .await
                .map_err(|_| Error::Timeout {
                    command: shell_command.to_string(),
                    millis: limit.as_millis() as u64,
                })?,
            None => command.output().await,
        }
        .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::device(format!(
                "`{}` exited with {}: {}",
                shell_command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn spawn_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::AdbNotFound
    } else {
        Error::ProcessSpawn {
            reason: e.to_string(),
        }
    }
}

impl DeviceQuery for AdbDevice {
    async fn resolve_pid(&self, package: &str) -> Result<Option<u32>> {
        // pidof exits non-zero when nothing matches
        match self.shell(&format!("pidof {}", package)).await {
            Ok(output) => Ok(parse_pidof(&output)),
            Err(Error::Device { message }) => {
                debug!("pidof {}: {}", package, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn reset_frame_counters(&self, package: &str) -> Result<()> {
        self.shell(&format!("dumpsys gfxinfo {} reset", package))
            .await
            .map(|_| ())
    }

    async fn focused_window(&self) -> Result<Option<String>> {
        let output = self.shell("dumpsys window | grep mCurrentFocus").await?;
        Ok(parse_focused_window(&output))
    }

    async fn frame_stats_dump(&self, package: &str) -> Result<Option<String>> {
        let output = self
            .shell(&format!("dumpsys gfxinfo {} framestats", package))
            .await?;
        Ok((!output.trim().is_empty()).then_some(output))
    }

    async fn io_counters(&self, pid: u32) -> Result<Option<IoCounters>> {
        let output = self.shell(&format!("cat /proc/{}/io", pid)).await?;
        Ok(parse_io_counters(&output))
    }

    async fn cpu_usage(&self, package: &str) -> Result<Option<CpuUsage>> {
        let output = self.shell("dumpsys cpuinfo").await?;
        Ok(parse_cpuinfo(&output, package))
    }

    async fn memory_usage(&self, package: &str) -> Result<Option<MemoryUsage>> {
        let output = self.shell(&format!("dumpsys meminfo {}", package)).await?;
        Ok(parse_meminfo(&output))
    }

    async fn process_cpu(&self, pid: u32) -> Result<Option<f64>> {
        let output = self.shell(&format!("top -n 1 -p {}", pid)).await?;
        Ok(parse_top_cpu(&output, pid))
    }

    async fn gpu_busy(&self, path: &str) -> Result<Option<f64>> {
        let output = self.shell(&format!("cat {}", path)).await?;
        Ok(parse_gpu_busy(&output))
    }

    async fn app_startup(&self, activity: &str) -> Result<StartupTiming> {
        info!("Cold-starting {}", activity);
        let output = self.shell(&format!("am start -S -W {}", activity)).await?;
        parse_startup_timing(&output)
    }

    async fn touch_events(&self, input_device: &str) -> Result<EventStream> {
        let child = Command::new(self.tool.path())
            .args(self.shell_args(&format!("getevent -lt {}", input_device)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        info!("Counting touch events from {}", input_device);
        EventStream::from_child(child)
    }
}
