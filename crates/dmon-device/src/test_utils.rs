//! Scripted [`DeviceQuery`] for tests
//!
//! Each query family has a queue of replies. Replies are handed out in
//! order and the last one repeats, so a single scripted value answers every
//! call. An empty queue answers `Ok(None)`. Every call is recorded.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use dmon_core::prelude::*;
use dmon_core::{CpuUsage, IoCounters, MemoryUsage};

use crate::query::DeviceQuery;
use crate::startup::StartupTiming;
use crate::touch::EventStream;

type Reply<T> = std::result::Result<T, String>;

#[derive(Debug)]
struct Script<T> {
    replies: VecDeque<Reply<T>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: VecDeque::new(),
        }
    }
}

impl<T: Clone> Script<T> {
    fn push(&mut self, reply: Reply<T>) {
        self.replies.push_back(reply);
    }

    fn next(&mut self) -> Option<Reply<T>> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }

    fn answer(&mut self) -> Result<Option<T>> {
        match self.next() {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(message)) => Err(Error::device(message)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    pid: Script<u32>,
    reset: Script<()>,
    focused_window: Script<String>,
    frame_dumps: Script<String>,
    io: Script<IoCounters>,
    cpu: Script<CpuUsage>,
    memory: Script<MemoryUsage>,
    process_cpu: Script<f64>,
    gpu: Script<f64>,
    startup: Script<StartupTiming>,
    touch_events: Option<String>,
    calls: Vec<String>,
}

/// In-memory device with scripted replies
#[derive(Debug, Default)]
pub struct FakeDevice {
    state: Mutex<FakeState>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_pid(self, pid: u32) -> Self {
        self.state().pid.push(Ok(pid));
        self
    }

    pub fn with_pid_failure(self, message: &str) -> Self {
        self.state().pid.push(Err(message.to_string()));
        self
    }

    pub fn with_focused_window(self, window: &str) -> Self {
        self.state().focused_window.push(Ok(window.to_string()));
        self
    }

    pub fn with_frame_dump(self, dump: &str) -> Self {
        self.state().frame_dumps.push(Ok(dump.to_string()));
        self
    }

    pub fn with_io(self, read_bytes: u64, write_bytes: u64) -> Self {
        self.state().io.push(Ok(IoCounters {
            read_bytes,
            write_bytes,
        }));
        self
    }

    pub fn with_io_failure(self, message: &str) -> Self {
        self.state().io.push(Err(message.to_string()));
        self
    }

    pub fn with_cpu(self, package_percent: f64, total_percent: f64) -> Self {
        self.state().cpu.push(Ok(CpuUsage {
            package_percent,
            total_percent,
        }));
        self
    }

    pub fn with_memory(self, total_pss_kb: u64) -> Self {
        self.state().memory.push(Ok(MemoryUsage {
            total_pss_kb,
            ..MemoryUsage::default()
        }));
        self
    }

    pub fn with_process_cpu(self, percent: f64) -> Self {
        self.state().process_cpu.push(Ok(percent));
        self
    }

    pub fn with_gpu_busy(self, percent: f64) -> Self {
        self.state().gpu.push(Ok(percent));
        self
    }

    pub fn with_reset_failure(self, message: &str) -> Self {
        self.state().reset.push(Err(message.to_string()));
        self
    }

    pub fn with_startup(self, timing: StartupTiming) -> Self {
        self.state().startup.push(Ok(timing));
        self
    }

    /// Text served by [`DeviceQuery::touch_events`], one event per line.
    pub fn with_touch_events(self, events: &str) -> Self {
        self.state().touch_events = Some(events.to_string());
        self
    }

    /// Queries made so far, e.g. `"reset_frame_counters com.example"`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of recorded calls whose name starts with `query`.
    pub fn call_count(&self, query: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.split(' ').next() == Some(query))
            .count()
    }

    fn record(&self, call: String) -> MutexGuard<'_, FakeState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

impl DeviceQuery for FakeDevice {
    async fn resolve_pid(&self, package: &str) -> Result<Option<u32>> {
        self.record(format!("resolve_pid {}", package)).pid.answer()
    }

    async fn reset_frame_counters(&self, package: &str) -> Result<()> {
        self.record(format!("reset_frame_counters {}", package))
            .reset
            .answer()
            .map(|_| ())
    }

    async fn focused_window(&self) -> Result<Option<String>> {
        self.record("focused_window".to_string())
            .focused_window
            .answer()
    }

    async fn frame_stats_dump(&self, package: &str) -> Result<Option<String>> {
        self.record(format!("frame_stats_dump {}", package))
            .frame_dumps
            .answer()
    }

    async fn io_counters(&self, pid: u32) -> Result<Option<IoCounters>> {
        self.record(format!("io_counters {}", pid)).io.answer()
    }

    async fn cpu_usage(&self, package: &str) -> Result<Option<CpuUsage>> {
        self.record(format!("cpu_usage {}", package)).cpu.answer()
    }

    async fn memory_usage(&self, package: &str) -> Result<Option<MemoryUsage>> {
        self.record(format!("memory_usage {}", package)).memory.answer()
    }

    async fn process_cpu(&self, pid: u32) -> Result<Option<f64>> {
        self.record(format!("process_cpu {}", pid)).process_cpu.answer()
    }

    async fn gpu_busy(&self, path: &str) -> Result<Option<f64>> {
        self.record(format!("gpu_busy {}", path)).gpu.answer()
    }

    async fn app_startup(&self, activity: &str) -> Result<StartupTiming> {
        self.record(format!("app_startup {}", activity))
            .startup
            .answer()?
            .ok_or_else(|| Error::parse("no startup timing scripted"))
    }

    async fn touch_events(&self, input_device: &str) -> Result<EventStream> {
        let events = self
            .record(format!("touch_events {}", input_device))
            .touch_events
            .clone()
            .ok_or_else(|| Error::device(format!("{}: No such file or directory", input_device)))?;
        Ok(EventStream::from_reader(std::io::Cursor::new(events.into_bytes())))
    }
}
