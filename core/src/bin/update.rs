/// mesh-update - refresh dependencies and swap in the staged node config
use clap::Parser;
use colored::*;
use meshkit_core::config::{MeshPaths, DEFAULT_MESH_DIR};
use meshkit_core::process::SystemRunner;
use meshkit_core::updater::MeshUpdater;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "mesh-update", version, about = "Update mesh network")]
struct Args {
    /// Mesh network directory
    #[arg(long)]
    mesh_dir: Option<PathBuf>,

    /// Package manager binary (defaults to <mesh dir>/venv/bin/pip)
    #[arg(long)]
    pip: Option<PathBuf>,
}

fn main() -> ExitCode {
    meshkit_core::logging::init("info");
    let args = Args::parse();

    let paths = match args.mesh_dir {
        Some(dir) => MeshPaths::new(dir),
        None => MeshPaths::from_env_or(DEFAULT_MESH_DIR),
    };
    let mut updater = MeshUpdater::new(paths, SystemRunner);
    if let Some(pip) = args.pip {
        updater = updater.with_package_manager(pip);
    }

    println!("{}", "Updating mesh network...".bright_cyan());
    let report = updater.run();

    if report.success() {
        println!("{} Update completed successfully", "✓".green());
        ExitCode::SUCCESS
    } else {
        println!("{} Update failed", "✗".red().bold());
        ExitCode::FAILURE
    }
}
