/// mesh-monitor - live CPU, memory and mesh status
use clap::Parser;
use meshkit_core::config::{MeshPaths, DEFAULT_MESH_DIR};
use meshkit_core::monitor::{run_app, MeshMonitor, TerminalGuard};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mesh-monitor", version, about = "Monitor mesh network")]
struct Args {
    /// Path to config directory (defaults to <mesh dir>/config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh interval in milliseconds (at least 100)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(100..))]
    interval_ms: u64,
}

fn main() -> anyhow::Result<()> {
    // keep the screen clean; only warnings reach stderr
    meshkit_core::logging::init("warn");
    let args = Args::parse();

    let config_dir = args
        .config
        .unwrap_or_else(|| MeshPaths::from_env_or(DEFAULT_MESH_DIR).config_dir());
    let interval = Duration::from_millis(args.interval_ms);
    let mut monitor = MeshMonitor::new(&config_dir);

    let mut guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
    let res = run_app(&mut terminal, &mut monitor, interval);
    drop(terminal);
    guard.restore();

    if let Err(e) = res {
        eprintln!("TUI error: {e}");
    }
    Ok(())
}
