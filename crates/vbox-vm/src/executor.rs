//! Command execution seam between the lifecycle logic and VBoxManage.

use crate::config::VBoxConfig;
use crate::error::{Result, VmError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error (VBoxManage prints progress here even on success)
    pub stderr: String,
}

impl CommandOutput {
    /// Output with the given stdout and empty stderr.
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Trait for running VBoxManage subcommands.
///
/// This abstraction allows the real tool to be swapped for an in-memory
/// double without changing the lifecycle logic.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run VBoxManage with the given arguments and wait for completion.
    ///
    /// # Errors
    /// Returns `Command` with the captured stderr on a nonzero exit, or
    /// `ToolNotFound` if the binary is missing.
    async fn run(&self, args: &[String]) -> Result<CommandOutput>;
}

/// Runner that spawns the real VBoxManage binary.
#[derive(Debug, Clone)]
pub struct VBoxManage {
    program: PathBuf,
}

impl VBoxManage {
    /// Create a runner for the binary at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Create a runner from configuration.
    pub fn from_config(config: &VBoxConfig) -> Self {
        Self::new(config.vboxmanage_path.clone())
    }

    /// Path of the binary being run.
    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

impl Default for VBoxManage {
    fn default() -> Self {
        Self::from_config(&VBoxConfig::default())
    }
}

#[async_trait]
impl CommandRunner for VBoxManage {
    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!(program = %self.program.display(), ?args, "running VBoxManage");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => VmError::ToolNotFound(self.program.clone()),
                _ => VmError::Io(e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::trace!(stdout = %stdout, stderr = %stderr, "VBoxManage output");

        if !output.status.success() {
            tracing::debug!(
                exit_code = ?output.status.code(),
                stderr_len = stderr.len(),
                "VBoxManage failed"
            );
            return Err(VmError::Command {
                command: args.join(" "),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}
