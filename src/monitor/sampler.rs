// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::RwLock;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

use crate::monitor::host::disk_space_for;

/// Host usage at one point in time, all values in percent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    pub cpu_usage: f32,
    pub memory_usage: f32,
    pub disk_usage: f32,
    pub taken_at: DateTime<Utc>,
}

impl ResourceSnapshot {
    /// Names of resources whose usage is strictly above `limit`
    pub fn exceeded(&self, limit: f32) -> Vec<&'static str> {
        [
            ("cpu", self.cpu_usage),
            ("memory", self.memory_usage),
            ("disk", self.disk_usage),
        ]
        .into_iter()
        .filter(|(_, usage)| *usage > limit)
        .map(|(name, _)| name)
        .collect()
    }
}

pub type SharedSnapshot = Arc<RwLock<Option<ResourceSnapshot>>>;

/// Periodically samples CPU, memory and the disk holding `disk_path`
pub struct ResourceMonitor {
    disk_path: PathBuf,
    interval: Duration,
    latest: SharedSnapshot,
}

impl ResourceMonitor {
    pub fn new(disk_path: PathBuf, interval: Duration) -> Self {
        Self {
            disk_path,
            interval,
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Handle to the most recent snapshot
    pub fn latest(&self) -> SharedSnapshot {
        Arc::clone(&self.latest)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut sys = System::new();
            let mut interval = tokio::time::interval(self.interval);

            loop {
                interval.tick().await;

                let disk_path = self.disk_path.clone();
                let sampled = tokio::task::spawn_blocking(move || {
                    let snapshot = sample(&mut sys, &disk_path);
                    (sys, snapshot)
                })
                .await;

                let sampled = match sampled {
                    Ok((returned, snapshot)) => {
                        sys = returned;
                        Ok(snapshot)
                    }
                    Err(e) => {
                        // The previous System went down with the task
                        sys = System::new();
                        Err(e)
                    }
                };
                publish(&self.latest, sampled).await;
            }
        })
    }
}

/// Store a fresh sample, or drop the stale one when sampling failed
async fn publish(latest: &SharedSnapshot, sampled: Result<ResourceSnapshot, JoinError>) {
    match sampled {
        Ok(snapshot) => {
            debug!(
                cpu = snapshot.cpu_usage,
                memory = snapshot.memory_usage,
                disk = snapshot.disk_usage,
                "Resource sample"
            );
            *latest.write().await = Some(snapshot);
        }
        Err(e) => {
            error!(error = %e, "Resource sampling failed, discarding last sample");
            *latest.write().await = None;
        }
    }
}

fn sample(sys: &mut System, disk_path: &std::path::Path) -> ResourceSnapshot {
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let memory_usage = if sys.total_memory() > 0 {
        (sys.used_memory() as f64 / sys.total_memory() as f64 * 100.0) as f32
    } else {
        0.0
    };

    let disk_usage = disk_space_for(disk_path)
        .map(|disk| disk.usage_percent())
        .unwrap_or(0.0);

    ResourceSnapshot {
        cpu_usage: sys.global_cpu_usage(),
        memory_usage,
        disk_usage,
        taken_at: Utc::now(),
    }
}
