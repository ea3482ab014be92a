//! External process execution
//!
//! Thin async wrapper around [`tokio::process::Command`] that turns
//! missing programs and non-zero exits into [`ProcessError`].

use std::ffi::OsStr;
use std::path::Path;

use tokio::process::Command;

use crate::error::ProcessError;

/// Maximum number of stderr bytes kept in an error
const STDERR_TAIL: usize = 2048;

/// Check if `program` is on PATH
pub fn is_available(program: &str) -> bool {
    which::which(program).is_ok()
}

/// A command to run on the build host
#[derive(Debug)]
pub struct HostCommand {
    program: String,
    command: Command,
}

impl HostCommand {
    /// Start building an invocation of `program`
    pub fn new(program: &str) -> Self {
        let mut command = Command::new(program);
        command.kill_on_drop(false);
        Self {
            program: program.to_string(),
            command,
        }
    }

    /// Append arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.command.arg(arg);
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.command.current_dir(dir);
        self
    }

    /// Set an environment variable
    #[must_use]
    pub fn env(mut self, key: &str, value: impl AsRef<OsStr>) -> Self {
        self.command.env(key, value);
        self
    }

    /// Program name
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run to completion, failing on a non-zero exit
    ///
    /// Stdout is returned; stderr is kept only for the error.
    pub async fn run(mut self) -> Result<String, ProcessError> {
        if !is_available(&self.program) {
            return Err(ProcessError::NotFound {
                program: self.program,
            });
        }

        tracing::debug!(command = ?self.command.as_std(), "running host command");

        let output = self
            .command
            .output()
            .await
            .map_err(|e| ProcessError::SpawnFailed {
                program: self.program.clone(),
                error: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let start = stderr.len().saturating_sub(STDERR_TAIL);
        let tail = stderr
            .get(start..)
            .unwrap_or(&stderr)
            .trim()
            .to_string();

        Err(ProcessError::Failed {
            program: self.program,
            status: output.status.code().unwrap_or(-1),
            stderr: tail,
        })
    }
}
