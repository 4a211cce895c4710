// SPDX-License-Identifier: GPL-3.0-only
use std::fmt;
use std::process::ExitStatus;
use tracing::{error, info};

use crate::bootstrap::{BootstrapError, CommandSpec, Layout};
use crate::config::Config;

/// Result of running the initialization-check program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Failed { code: i32 },
    /// The check was killed by a signal and produced no exit code
    Terminated,
}

impl CheckOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Self::Passed,
            Some(code) => Self::Failed { code },
            None => Self::Terminated,
        }
    }

    /// Exit code the entrypoint terminates with for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed { code } => *code,
            Self::Terminated => 1,
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed { code } => write!(f, "exited with status {}", code),
            Self::Terminated => write!(f, "terminated by signal"),
        }
    }
}

/// Container entrypoint: prepare the layout, gate on the check program,
/// then become the server process.
pub struct Entrypoint {
    layout: Layout,
    check: CommandSpec,
    server: CommandSpec,
}

impl Entrypoint {
    pub fn new(layout: Layout, check: CommandSpec, server: CommandSpec) -> Self {
        Self {
            layout,
            check,
            server,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, BootstrapError> {
        Ok(Self::new(
            Layout::from_config(config),
            CommandSpec::from_config(&config.check_command, "check")?,
            CommandSpec::from_config(&config.server_command, "serve")?,
        ))
    }

    pub async fn prepare(&self) -> Result<(), BootstrapError> {
        self.layout.remove_stale_files().await?;
        self.layout.ensure_directories().await?;
        Ok(())
    }

    pub async fn run_check(&self) -> Result<CheckOutcome, BootstrapError> {
        info!(command = %self.check, "Running initialization checks");

        let status = self
            .check
            .tokio_command()
            .status()
            .await
            .map_err(|e| BootstrapError::Spawn {
                program: self.check.to_string(),
                source: e,
            })?;

        Ok(CheckOutcome::from_status(status))
    }

    /// Prepare and check, without starting the server
    pub async fn gate(&self) -> Result<CheckOutcome, BootstrapError> {
        self.prepare().await?;
        self.run_check().await
    }

    /// Drive the whole sequence.
    ///
    /// On a passing check this never returns: the process image is replaced
    /// by the server. `Ok(code)` means the check failed and the caller must
    /// exit with `code`; `Err` covers filesystem, spawn and exec failures.
    pub async fn run(&self) -> Result<i32, BootstrapError> {
        match self.gate().await? {
            CheckOutcome::Passed => {
                info!(command = %self.server, "Initialization checks passed, starting server");
                Err(self.handoff())
            }
            failed => {
                eprintln!(
                    "Initialization checks failed ({}). Please fix the issues before starting the application.",
                    failed
                );
                error!(outcome = %failed, "Initialization checks failed, server not started");
                Ok(failed.exit_code())
            }
        }
    }

    /// Replace the current process with the server. Returns only on failure.
    #[cfg(unix)]
    pub fn handoff(&self) -> BootstrapError {
        use std::os::unix::process::CommandExt;

        let source = self.server.std_command().exec();
        BootstrapError::Exec {
            program: self.server.to_string(),
            source,
        }
    }

    /// Without `exec`, run the server in the foreground and exit with its code.
    #[cfg(not(unix))]
    pub fn handoff(&self) -> BootstrapError {
        match self.server.std_command().status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(1)),
            Err(source) => BootstrapError::Exec {
                program: self.server.to_string(),
                source,
            },
        }
    }
}
