//! Live dashboard
//!
//! A refresh timer re-reads the latest published tick on a fixed cadence and
//! redraws a header plus rolling sparkline charts for FPS, I/O, CPU and GPU.
//! It redraws on every cadence, new data or not, and never waits on the
//! sampling loop.

use std::time::Duration;

use dmon_app::config::UiSettings;
use dmon_app::{CancelToken, LatestReader};
use dmon_core::{MemoryUsage, MetricsTick, RingBuffer, TARGET_FPS};
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Sparkline, Widget};
use ratatui::Terminal;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// FPS at or above this value is healthy (green).
const FPS_GREEN_THRESHOLD: f64 = 55.0;
/// FPS at or above this value (but below green) is degraded (yellow).
const FPS_YELLOW_THRESHOLD: f64 = 30.0;

const PERCENT_MAX: u64 = 100;

/// One rolling chart
#[derive(Debug)]
pub struct Chart {
    pub title: &'static str,
    unit: &'static str,
    /// Fixed top of the scale. `None` scales to the visible data.
    max: Option<u64>,
    color: Color,
    /// Title coloured by FPS health instead of `color`.
    fps_health: bool,
    values: RingBuffer<f64>,
}

impl Chart {
    fn new(
        title: &'static str,
        unit: &'static str,
        max: Option<u64>,
        color: Color,
        size: usize,
    ) -> Self {
        Self {
            title,
            unit,
            max,
            color,
            fps_health: false,
            values: RingBuffer::new(size),
        }
    }

    fn with_fps_health(mut self) -> Self {
        self.fps_health = true;
        self
    }

    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.values.push(value);
        }
    }

    pub fn values(&self) -> &RingBuffer<f64> {
        &self.values
    }

    fn title_style(&self) -> Style {
        if self.fps_health {
            return fps_style(self.values.latest().copied());
        }
        Style::default().fg(self.color)
    }
}

impl Widget for &Chart {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let latest = self
            .values
            .latest()
            .map_or_else(|| "N/A".to_string(), |v| format!("{:.1}{}", v, self.unit));

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" {} {} ", self.title, latest),
                self.title_style(),
            ));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        if self.values.is_empty() {
            Paragraph::new("No data yet")
                .style(Style::default().fg(Color::DarkGray))
                .render(inner, buf);
            return;
        }

        // Newest values on the right; older ones fall off the left edge.
        let skip = self.values.len().saturating_sub(inner.width as usize);
        let data: Vec<u64> = self
            .values
            .iter()
            .skip(skip)
            .map(|v| v.max(0.0).round() as u64)
            .collect();

        let mut sparkline = Sparkline::default()
            .data(&data)
            .style(Style::default().fg(self.color));
        if let Some(max) = self.max {
            sparkline = sparkline.max(max);
        }
        sparkline.render(inner, buf);
    }
}

pub struct Dashboard {
    reader: LatestReader,
    refresh: Duration,
    fps: Chart,
    io_read: Chart,
    io_write: Chart,
    cpu_package: Chart,
    cpu_total: Chart,
    gpu: Chart,
    latest: Option<MetricsTick>,
}

impl Dashboard {
    pub fn new(reader: LatestReader, ui: &UiSettings) -> Self {
        let size = ui.history_size;
        Self {
            reader,
            refresh: ui.refresh(),
            fps: Chart::new("FPS", "", Some(TARGET_FPS as u64), Color::Cyan, size)
                .with_fps_health(),
            io_read: Chart::new("I/O read", " kB/s", None, Color::Blue, size),
            io_write: Chart::new("I/O write", " kB/s", None, Color::Magenta, size),
            cpu_package: Chart::new("CPU app", "%", Some(PERCENT_MAX), Color::Yellow, size),
            cpu_total: Chart::new("CPU total", "%", Some(PERCENT_MAX), Color::LightRed, size),
            gpu: Chart::new("GPU busy", "%", Some(PERCENT_MAX), Color::Green, size),
            latest: None,
        }
    }

    /// Pull the newest tick, if one arrived since the last refresh.
    ///
    /// Returns whether the histories grew. Metrics missing from the tick
    /// leave their chart untouched.
    pub fn refresh(&mut self) -> bool {
        if !self.reader.has_new() {
            return false;
        }
        let Some(tick) = self.reader.snapshot() else {
            return false;
        };

        self.fps.push(Some(tick.frames.fps));
        self.io_read.push(tick.io.as_ref().map(|io| io.read_kb_per_sec()));
        self.io_write.push(tick.io.as_ref().map(|io| io.write_kb_per_sec()));
        self.cpu_package.push(tick.cpu.as_ref().map(|cpu| cpu.package_percent));
        self.cpu_total.push(tick.cpu.as_ref().map(|cpu| cpu.total_percent));
        self.gpu.push(tick.gpu_busy);
        self.latest = Some(tick);
        true
    }

    pub fn fps_history(&self) -> &RingBuffer<f64> {
        self.fps.values()
    }

    /// Charts in display order, row by row.
    pub fn charts(&self) -> [&Chart; 6] {
        [
            &self.fps,
            &self.gpu,
            &self.io_read,
            &self.io_write,
            &self.cpu_package,
            &self.cpu_total,
        ]
    }

    /// The header line for the current state.
    pub fn status_line(&self) -> String {
        let Some(tick) = &self.latest else {
            return "Waiting for the first sample...".to_string();
        };

        let mut line = format!(
            "#{:<5} jank {} ({:.1}%)",
            tick.sequence, tick.frames.jank_count, tick.frames.jank_ratio
        );
        match &tick.memory {
            Some(memory) => {
                line.push_str(&format!(
                    " | PSS {}",
                    MemoryUsage::format_kb(memory.total_pss_kb)
                ));
                if let Some(rate) = tick.memory_rate_kb_per_sec {
                    line.push_str(&format!(" ({:+.1} kB/s)", rate));
                }
            }
            None => line.push_str(" | PSS N/A"),
        }
        if let Some(percent) = tick.process_cpu {
            line.push_str(&format!(" | top {:.1}%", percent));
        }
        if let Some(touches) = tick.touches {
            line.push_str(&format!(" | touches {}", touches));
        }
        if let Some(window) = &tick.focused_window {
            line.push_str(&format!(" | {}", window));
        }
        line
    }

    /// Redraw on every refresh cadence until `cancel` fires.
    ///
    /// Returns the number of frames drawn.
    pub async fn run<B: Backend>(
        mut self,
        cancel: CancelToken,
        terminal: &mut Terminal<B>,
    ) -> u64 {
        let mut tick = tokio::time::interval(self.refresh);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut draws = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {}
            }

            self.refresh();
            if let Err(e) = terminal.draw(|frame| frame.render_widget(&self, frame.area())) {
                debug!("Dashboard draw failed: {}", e);
                break;
            }
            draws += 1;
        }

        draws
    }
}

impl Widget for &Dashboard {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [header, footer, charts] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(area);

        let fps = self.fps.values().latest().copied();
        Paragraph::new(Line::from(vec![
            Span::styled(
                fps.map_or_else(|| "FPS --".to_string(), |v| format!("FPS {:.1}", v)),
                fps_style(fps),
            ),
            Span::raw("  "),
            Span::raw(self.status_line()),
        ]))
        .render(header, buf);

        Paragraph::new("q to quit")
            .style(Style::default().fg(Color::DarkGray))
            .render(footer, buf);

        let rows = Layout::vertical([Constraint::Ratio(1, 3); 3]).split(charts);
        for (row, pair) in rows.iter().zip(self.charts().chunks(2)) {
            let cells = Layout::horizontal([Constraint::Ratio(1, 2); 2]).split(*row);
            for (cell, &chart) in cells.iter().zip(pair) {
                chart.render(*cell, buf);
            }
        }
    }
}

/// Colour for an FPS value by magnitude.
fn fps_style(fps: Option<f64>) -> Style {
    match fps {
        Some(v) if v >= FPS_GREEN_THRESHOLD => Style::default().fg(Color::Green),
        Some(v) if v >= FPS_YELLOW_THRESHOLD => Style::default().fg(Color::Yellow),
        Some(_) => Style::default().fg(Color::Red),
        None => Style::default().fg(Color::DarkGray),
    }
}
