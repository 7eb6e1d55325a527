/// External command execution
use crate::error::{MeshError, Result};
use std::process::Command;
use tracing::debug;

/// Captured result of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external tools (ping, pip, speed tests).
///
/// `Err` means the program could not be started at all; a program that ran
/// and failed is reported through [`CommandOutput::status`].
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Run a full argv (`argv[0]` is the program)
    fn run_argv(&self, argv: &[String]) -> Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| MeshError::Command("empty command line".to_string()))?;
        self.run(program, args)
    }
}

/// Runs commands on the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!("Running {} {:?}", program, args);
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| MeshError::Command(format!("failed to start {}: {}", program, e)))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
