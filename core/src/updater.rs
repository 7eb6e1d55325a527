/// Dependency refresh and node-config migration
use crate::config::MeshPaths;
use crate::error::{MeshError, Result};
use crate::process::CommandRunner;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Outcome of a full update run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    pub dependencies_updated: bool,
    pub config_updated: bool,
}

impl UpdateReport {
    pub fn success(&self) -> bool {
        self.dependencies_updated && self.config_updated
    }
}

pub struct MeshUpdater<R: CommandRunner> {
    paths: MeshPaths,
    package_manager: PathBuf,
    runner: R,
}

impl<R: CommandRunner> MeshUpdater<R> {
    /// Updater using `<mesh>/venv/bin/pip`
    pub fn new(paths: MeshPaths, runner: R) -> Self {
        let package_manager = paths.venv_pip();
        Self {
            paths,
            package_manager,
            runner,
        }
    }

    pub fn with_package_manager(mut self, package_manager: impl Into<PathBuf>) -> Self {
        self.package_manager = package_manager.into();
        self
    }

    /// `<pip> install --upgrade -r <mesh>/requirements.txt`
    pub fn update_dependencies(&self) -> Result<()> {
        let program = self.package_manager.display().to_string();
        let args = vec![
            "install".to_string(),
            "--upgrade".to_string(),
            "-r".to_string(),
            self.paths.requirements().display().to_string(),
        ];

        let output = self.runner.run(&program, &args)?;
        if !output.success() {
            let detail = output.stderr.trim();
            return Err(MeshError::Command(format!(
                "{} exited with status {}{}{}",
                program,
                output
                    .status
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                if detail.is_empty() { "" } else { ": " },
                detail
            )));
        }

        info!("Dependencies updated successfully");
        Ok(())
    }

    /// Swap in `default_config.yaml.new`, keeping the old file as `.bak`.
    ///
    /// If the copy fails the `.bak` is moved back so the node keeps a config.
    pub fn update_config(&self) -> Result<()> {
        let config = self.paths.node_config();
        let backup = self.paths.node_config_backup();
        let staged = self.paths.staged_node_config();

        let had_config = config.exists();
        if had_config {
            fs::rename(&config, &backup).map_err(|e| MeshError::io_at(&config, e))?;
        }

        if let Err(e) = fs::copy(&staged, &config) {
            if had_config {
                if let Err(rollback) = fs::rename(&backup, &config) {
                    error!(
                        "Rollback of {} failed: {}",
                        config.display(),
                        rollback
                    );
                } else {
                    warn!("Restored previous configuration after failed update");
                }
            } else {
                // drop any partial copy
                let _ = fs::remove_file(&config);
            }
            return Err(MeshError::io_at(&staged, e));
        }

        info!("Configuration updated successfully");
        Ok(())
    }

    /// Run both steps; the second runs even when the first fails.
    pub fn run(&self) -> UpdateReport {
        let dependencies_updated = match self.update_dependencies() {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to update dependencies: {}", e);
                false
            }
        };
        let config_updated = match self.update_config() {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to update configuration: {}", e);
                false
            }
        };
        UpdateReport {
            dependencies_updated,
            config_updated,
        }
    }
}
