/// mesh-backup - create, list and restore mesh backups
use clap::{Parser, ValueEnum};
use colored::*;
use meshkit_core::backup::MeshBackup;
use meshkit_core::config::{MeshPaths, DEFAULT_MESH_DIR};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Backup,
    Restore,
    List,
}

#[derive(Parser, Debug)]
#[command(name = "mesh-backup", version, about = "Mesh network backup utility")]
struct Args {
    /// Action to perform
    #[arg(long, value_enum)]
    action: Action,

    /// Mesh network directory
    #[arg(long)]
    mesh_dir: Option<PathBuf>,

    /// Backup directory (defaults to <mesh dir>/backups)
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Backup name for restore
    #[arg(long)]
    backup_name: Option<String>,
}

fn main() -> ExitCode {
    meshkit_core::logging::init("info");
    let args = Args::parse();

    if args.action == Action::Restore && args.backup_name.is_none() {
        eprintln!("{} --backup-name required for restore", "Error:".red().bold());
        return ExitCode::FAILURE;
    }

    let paths = match args.mesh_dir {
        Some(dir) => MeshPaths::new(dir),
        None => MeshPaths::from_env_or(DEFAULT_MESH_DIR),
    };
    let backup_dir = args.backup_dir.unwrap_or_else(|| paths.backups_dir());

    let backup = match MeshBackup::new(paths.root(), backup_dir) {
        Ok(b) => b,
        Err(e) => {
            error!("Cannot prepare backup directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let ok = match args.action {
        Action::Backup => match backup.create_backup() {
            Ok(info) => {
                println!("{} {}", "✓ Backup created:".green(), info.name().cyan());
                true
            }
            Err(e) => {
                error!("Backup failed: {}", e);
                false
            }
        },
        Action::Restore => {
            let name = args.backup_name.unwrap_or_default();
            match backup.restore_backup(&name) {
                Ok(()) => {
                    println!("{} {}", "✓ Restored from:".green(), name.cyan());
                    true
                }
                Err(e) => {
                    error!("Restore failed: {}", e);
                    false
                }
            }
        }
        Action::List => match backup.list_backups() {
            Ok(names) => {
                if names.is_empty() {
                    println!("No backups found");
                } else {
                    println!("Backups ({}):", names.len());
                    println!("{:-<60}", "");
                    for name in names {
                        println!("  {}", name);
                    }
                }
                true
            }
            Err(e) => {
                error!("Listing backups failed: {}", e);
                false
            }
        },
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
