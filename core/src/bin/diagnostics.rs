/// mesh-diagnostics - interfaces, reachability and speed test report
use clap::Parser;
use colored::*;
use meshkit_core::config::{DiagnosticsConfig, MeshPaths, DEFAULT_MESH_DIR};
use meshkit_core::diagnostics::{MeshDiagnostics, SysinfoInterfaces};
use meshkit_core::process::SystemRunner;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "mesh-diagnostics", version, about = "Run mesh network diagnostics")]
struct Args {
    /// Mesh network directory
    #[arg(long)]
    mesh_dir: Option<PathBuf>,

    /// JSON file with hosts, ping/speed-test commands and output path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report path (overrides the config file)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    meshkit_core::logging::init("info");
    let args = Args::parse();

    let paths = match args.mesh_dir {
        Some(dir) => MeshPaths::new(dir),
        None => MeshPaths::from_env_or(DEFAULT_MESH_DIR),
    };

    let config = match &args.config {
        Some(path) => match DiagnosticsConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load diagnostics config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => DiagnosticsConfig::default_for(&paths),
    };
    let output = args.output.unwrap_or_else(|| config.output_path(&paths));

    println!("{}", "Running mesh network diagnostics...".bright_cyan());
    let mut diagnostics = MeshDiagnostics::new(config, SystemRunner, SysinfoInterfaces);
    let results = diagnostics.run_diagnostics(|step| println!("{}", step));

    if let Err(e) = results.save(&output) {
        error!("Failed to save diagnostics: {}", e);
        return ExitCode::FAILURE;
    }

    println!();
    println!(
        "Diagnostics complete. Results saved to {}",
        output.display().to_string().cyan()
    );
    println!();
    println!("{}", "Summary:".bright_white().bold());
    println!("{:-<40}", "");
    for line in results.summary() {
        println!("{}", line);
    }

    ExitCode::SUCCESS
}
