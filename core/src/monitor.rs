/// Live text-mode monitor for a mesh host
use crate::config::SYSTEM_INFO_FILE;
use crate::system_info::SystemInfo;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::Backend,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sysinfo::System;

const WARN_PERCENT: f32 = 70.0;
const CRITICAL_PERCENT: f32 = 90.0;

/// One refresh worth of data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorSample {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub mesh: Option<SystemInfo>,
}

/// CPU and memory counters from the OS
pub struct SystemSampler {
    sys: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        // CPU usage is a delta; prime the first reading
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self { sys }
    }

    /// Returns (cpu %, memory %)
    pub fn sample(&mut self) -> (f32, f32) {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        let memory_percent = if total == 0 {
            0.0
        } else {
            (self.sys.used_memory() as f64 / total as f64 * 100.0) as f32
        };
        (self.sys.global_cpu_usage(), memory_percent)
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Monitor state: where to read mesh stats and how to sample the host
pub struct MeshMonitor {
    system_info_path: PathBuf,
    sampler: SystemSampler,
}

impl MeshMonitor {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            system_info_path: config_dir.join(SYSTEM_INFO_FILE),
            sampler: SystemSampler::new(),
        }
    }

    /// Fresh sample; mesh stats are re-read from disk every time
    pub fn sample(&mut self) -> MonitorSample {
        let (cpu_percent, memory_percent) = self.sampler.sample();
        MonitorSample {
            cpu_percent,
            memory_percent,
            mesh: SystemInfo::load_optional(&self.system_info_path),
        }
    }
}

pub fn usage_color(percent: f32) -> Color {
    if percent >= CRITICAL_PERCENT {
        Color::Red
    } else if percent >= WARN_PERCENT {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn usage_line(label: &str, percent: f32) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{}: ", label)),
        Span::styled(
            format!("{:.1}%", percent),
            Style::default().fg(usage_color(percent)),
        ),
    ])
}

/// Lines shown inside the monitor panel
pub fn render_lines(sample: &MonitorSample) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled("Mesh Network Monitor", bold)),
        Line::from(""),
        usage_line("CPU Usage", sample.cpu_percent),
        usage_line("Memory Usage", sample.memory_percent),
    ];

    if let Some(mesh) = &sample.mesh {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Mesh Status:", bold)));
        lines.push(Line::from(format!("Active Nodes: {}", mesh.active_nodes())));
        lines.push(Line::from(format!("Hostname: {}", mesh.display_hostname())));
    }

    lines
}

pub fn draw(f: &mut Frame, sample: &MonitorSample) {
    let para = Paragraph::new(render_lines(sample)).block(
        Block::default()
            .title(" mesh-monitor (q to quit) ")
            .borders(Borders::ALL),
    );
    f.render_widget(para, f.size());
}

/// Puts the terminal back into cooked mode when dropped, including on panic
/// or an early `?` return out of the draw loop.
pub struct TerminalGuard {
    restore: Option<Box<dyn FnOnce()>>,
}

impl TerminalGuard {
    /// Raw mode plus alternate screen on stdout
    pub fn enter() -> std::io::Result<Self> {
        enable_raw_mode()?;
        // from here on any failure still leaves raw mode
        let guard = Self::with_restore(restore_terminal);
        execute!(std::io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }

    pub fn with_restore(restore: impl FnOnce() + 'static) -> Self {
        Self {
            restore: Some(Box::new(restore)),
        }
    }

    /// Runs the cleanup now; later calls and the drop are no-ops
    pub fn restore(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(std::io::stdout(), LeaveAlternateScreen, Show);
}

/// Redraw every `interval` until q, Esc or Ctrl+C
pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    monitor: &mut MeshMonitor,
    interval: Duration,
) -> std::io::Result<()> {
    let mut sample = monitor.sample();
    let mut last_sample = Instant::now();

    loop {
        terminal.draw(|f| draw(f, &sample))?;

        let timeout = interval.saturating_sub(last_sample.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(())
                    }
                    _ => {}
                }
            }
        }

        if last_sample.elapsed() >= interval {
            sample = monitor.sample();
            last_sample = Instant::now();
        }
    }
}
