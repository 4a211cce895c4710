// SPDX-License-Identifier: GPL-3.0-only
use std::fmt;
use std::path::PathBuf;

use crate::bootstrap::BootstrapError;

/// A program plus arguments, resolved from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Use the configured argv, or re-invoke this binary with `subcommand`
    /// when nothing is configured.
    pub fn from_config(configured: &[String], subcommand: &str) -> Result<Self, BootstrapError> {
        match configured.split_first() {
            Some((program, args)) => Ok(Self::new(program, args.to_vec())),
            None => {
                let exe = std::env::current_exe().map_err(BootstrapError::CurrentExe)?;
                Ok(Self::new(exe, vec![subcommand.to_string()]))
            }
        }
    }

    pub fn std_command(&self) -> std::process::Command {
        let mut command = std::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }

    pub fn tokio_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
