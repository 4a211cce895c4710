// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

/// Container restart policy, named as in compose files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    No,
    Always,
    OnFailure,
    #[default]
    UnlessStopped,
}

/// Why a supervised child is no longer running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Exited(i32),
    /// Killed by a signal the supervisor did not send
    Signaled,
    /// Stopped by the supervisor after failing health probes
    Unhealthy,
    /// Stopped on operator request
    Stopped,
}

impl ExitReason {
    pub fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::Exited(code),
            None => Self::Signaled,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled | Self::Unhealthy => 1,
            Self::Stopped => 0,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with status {}", code),
            Self::Signaled => write!(f, "killed by signal"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

impl RestartPolicy {
    pub fn should_restart(&self, reason: ExitReason) -> bool {
        match self {
            Self::No => false,
            Self::Always | Self::UnlessStopped => reason != ExitReason::Stopped,
            Self::OnFailure => match reason {
                ExitReason::Exited(code) => code != 0,
                ExitReason::Signaled | ExitReason::Unhealthy => true,
                ExitReason::Stopped => false,
            },
        }
    }
}

/// Delay before restarting a child: doubles from 100ms up to one minute,
/// back to 100ms once a child has stayed up for ten seconds.
#[derive(Debug, Clone)]
pub struct RestartBackoff {
    next: Duration,
}

impl RestartBackoff {
    pub const INITIAL: Duration = Duration::from_millis(100);
    pub const MAX: Duration = Duration::from_secs(60);
    pub const RESET_AFTER: Duration = Duration::from_secs(10);

    pub fn new() -> Self {
        Self {
            next: Self::INITIAL,
        }
    }

    pub fn next_delay(&mut self, uptime: Duration) -> Duration {
        if uptime >= Self::RESET_AFTER {
            self.next = Self::INITIAL;
        }
        let delay = self.next;
        self.next = (self.next * 2).min(Self::MAX);
        delay
    }
}

impl Default for RestartBackoff {
    fn default() -> Self {
        Self::new()
    }
}
