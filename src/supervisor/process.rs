// SPDX-License-Identifier: GPL-3.0-only
use std::future::Future;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::bootstrap::{BootstrapError, CommandSpec};
use crate::config::Config;
use crate::supervisor::{
    ExitReason, HealthState, HealthTracker, HealthcheckSpec, HttpProbe, ProbeError,
    RestartBackoff, RestartPolicy,
};

#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to resolve supervised command: {0}")]
    Command(#[from] BootstrapError),

    #[error("Failed to build health probe: {0}")]
    Probe(#[from] ProbeError),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}

/// How supervision ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorOutcome {
    pub last_reason: ExitReason,
    pub restarts: u32,
}

impl SupervisorOutcome {
    pub fn exit_code(&self) -> i32 {
        self.last_reason.exit_code()
    }
}

/// Runs one child at a time, probes it, and revives it per restart policy
pub struct Supervisor {
    command: CommandSpec,
    spec: HealthcheckSpec,
    policy: RestartPolicy,
    probe: HttpProbe,
    stop_grace: Duration,
}

impl Supervisor {
    pub fn new(
        command: CommandSpec,
        spec: HealthcheckSpec,
        policy: RestartPolicy,
        probe: HttpProbe,
        stop_grace: Duration,
    ) -> Self {
        Self {
            command,
            spec,
            policy,
            probe,
            stop_grace,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, SupervisorError> {
        let spec = HealthcheckSpec::from_config(&config.supervisor);
        Ok(Self::new(
            CommandSpec::from_config(&config.supervisor.command, "entrypoint")?,
            spec,
            config.supervisor.restart,
            HttpProbe::new(config.health_url(), spec.timeout)?,
            config.supervisor.stop_grace(),
        ))
    }

    /// Supervise until the policy declines a restart or `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> Result<SupervisorOutcome, SupervisorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut backoff = RestartBackoff::new();
        let mut restarts = 0u32;

        loop {
            let mut child = self
                .command
                .tokio_command()
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| SupervisorError::Spawn {
                    program: self.command.to_string(),
                    source: e,
                })?;
            let started = Instant::now();
            info!(command = %self.command, pid = ?child.id(), "Started supervised process");

            let reason = self.watch(&mut child, started, &mut shutdown).await?;
            let uptime = started.elapsed();

            if !self.policy.should_restart(reason) {
                info!(reason = %reason, policy = ?self.policy, "Supervision finished");
                return Ok(SupervisorOutcome {
                    last_reason: reason,
                    restarts,
                });
            }

            let delay = backoff.next_delay(uptime);
            restarts += 1;
            warn!(reason = %reason, restarts, delay = ?delay, "Restarting supervised process");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    info!("Stop requested while waiting to restart");
                    return Ok(SupervisorOutcome {
                        last_reason: ExitReason::Stopped,
                        restarts,
                    });
                }
            }
        }
    }

    async fn watch<F>(
        &self,
        child: &mut Child,
        started: Instant,
        shutdown: &mut std::pin::Pin<&mut F>,
    ) -> Result<ExitReason, SupervisorError>
    where
        F: Future<Output = ()>,
    {
        let mut tracker = HealthTracker::new(self.spec);
        let mut ticker = tokio::time::interval_at(started + self.spec.interval, self.spec.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // At most one probe in flight; it runs on its own task so child exit
        // and shutdown are observed while it waits for an answer
        let mut in_flight: Option<JoinHandle<Result<(), ProbeError>>> = None;

        loop {
            tokio::select! {
                status = child.wait() => {
                    abort_probe(&mut in_flight);
                    let status = status.map_err(SupervisorError::Wait)?;
                    let reason = ExitReason::from_status(status);
                    warn!(reason = %reason, "Supervised process exited");
                    return Ok(reason);
                }
                _ = shutdown.as_mut() => {
                    abort_probe(&mut in_flight);
                    info!("Stop requested, stopping supervised process");
                    stop_child(child, self.stop_grace).await;
                    return Ok(ExitReason::Stopped);
                }
                _ = ticker.tick(), if in_flight.is_none() => {
                    let probe = self.probe.clone();
                    in_flight = Some(tokio::spawn(async move { probe.check().await }));
                }
                joined = async {
                    match in_flight.as_mut() {
                        Some(handle) => handle.await,
                        None => std::future::pending().await,
                    }
                }, if in_flight.is_some() => {
                    in_flight = None;
                    let healthy = match joined {
                        Ok(Ok(())) => true,
                        Ok(Err(e)) => {
                            warn!(url = %self.probe.url(), error = %e, "Health probe failed");
                            false
                        }
                        Err(e) => {
                            warn!(error = %e, "Health probe task failed");
                            false
                        }
                    };

                    let previous = tracker.state();
                    let state = tracker.record(healthy, started.elapsed());
                    if state != previous {
                        info!(from = ?previous, to = ?state, "Health state changed");
                    }
                    if state == HealthState::Unhealthy {
                        error!(
                            streak = tracker.failing_streak(),
                            "Supervised process is unhealthy, stopping it"
                        );
                        stop_child(child, self.stop_grace).await;
                        return Ok(ExitReason::Unhealthy);
                    }
                }
            }
        }
    }
}

fn abort_probe(in_flight: &mut Option<JoinHandle<Result<(), ProbeError>>>) {
    if let Some(handle) = in_flight.take() {
        handle.abort();
    }
}

/// SIGTERM, then SIGKILL once `grace` runs out
async fn stop_child(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(pid, error = %e, "Failed to send SIGTERM");
        } else if let Ok(Ok(status)) = tokio::time::timeout(grace, child.wait()).await {
            return Some(status);
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill supervised process");
    }
    child.wait().await.ok()
}
