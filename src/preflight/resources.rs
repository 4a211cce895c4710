// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::path::PathBuf;

use crate::monitor::{disk_space_for, total_memory_gb};
use crate::preflight::traits::{Check, CheckReport};

const NAME: &str = "System resources";

/// Minimum memory and free disk space on the download filesystem
pub struct ResourceCheck {
    download_dir: PathBuf,
    min_memory_gb: f64,
    min_disk_gb: f64,
}

impl ResourceCheck {
    pub fn new(download_dir: PathBuf, min_memory_gb: f64, min_disk_gb: f64) -> Self {
        Self {
            download_dir,
            min_memory_gb,
            min_disk_gb,
        }
    }

    pub fn evaluate(&self, memory_gb: f64, disk_free_gb: Option<f64>) -> CheckReport {
        if memory_gb < self.min_memory_gb {
            return CheckReport::fail(
                NAME,
                format!(
                    "Insufficient memory: {:.1}GB (minimum {}GB required)",
                    memory_gb, self.min_memory_gb
                ),
            );
        }

        let Some(disk_gb) = disk_free_gb else {
            if self.min_disk_gb <= 0.0 {
                return CheckReport::pass(
                    NAME,
                    format!(
                        "System resources OK (Memory: {:.1}GB, Free disk space: unknown)",
                        memory_gb
                    ),
                );
            }
            return CheckReport::fail(
                NAME,
                format!(
                    "Could not determine free disk space for {}",
                    self.download_dir.display()
                ),
            );
        };

        if disk_gb < self.min_disk_gb {
            return CheckReport::fail(
                NAME,
                format!(
                    "Insufficient disk space: {:.1}GB (minimum {}GB required)",
                    disk_gb, self.min_disk_gb
                ),
            );
        }

        CheckReport::pass(
            NAME,
            format!(
                "System resources OK (Memory: {:.1}GB, Free disk space: {:.1}GB)",
                memory_gb, disk_gb
            ),
        )
    }
}

#[async_trait]
impl Check for ResourceCheck {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> CheckReport {
        let download_dir = self.download_dir.clone();
        let measured = tokio::task::spawn_blocking(move || {
            let memory = total_memory_gb();
            let disk = disk_space_for(&download_dir).map(|d| d.available_gb());
            (memory, disk)
        })
        .await;

        match measured {
            Ok((memory_gb, disk_gb)) => self.evaluate(memory_gb, disk_gb),
            Err(e) => CheckReport::fail(NAME, format!("Resource measurement failed: {}", e)),
        }
    }
}
