// SPDX-License-Identifier: GPL-3.0-only
use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;
use crate::preflight::{Check, CheckReport, ConnectivityCheck, PermissionCheck, ResourceCheck};

#[derive(Debug, Clone)]
pub struct PreflightSummary {
    pub reports: Vec<CheckReport>,
}

impl PreflightSummary {
    pub fn passed(&self) -> bool {
        self.reports.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckReport> {
        self.reports.iter().filter(|r| !r.passed)
    }

    /// Process exit code for the `check` command
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }
}

/// Runs every check in order; a failing check never skips the rest
pub struct PreflightRunner {
    checks: Vec<Box<dyn Check>>,
}

impl PreflightRunner {
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let preflight = &config.preflight;
        let mut checks: Vec<Box<dyn Check>> = vec![Box::new(ResourceCheck::new(
            config.download_dir.clone(),
            preflight.min_memory_gb,
            preflight.min_disk_gb,
        ))];

        if preflight.connectivity_enabled {
            checks.push(Box::new(ConnectivityCheck::new(
                preflight.connectivity_urls.clone(),
                Duration::from_secs(preflight.connectivity_timeout_secs),
            )?));
        } else {
            info!("Connectivity check disabled by configuration");
        }

        checks.push(Box::new(PermissionCheck::new(config.required_dirs())));

        Ok(Self::new(checks))
    }

    pub async fn run_all(&self) -> PreflightSummary {
        let mut reports = Vec::with_capacity(self.checks.len());

        for check in &self.checks {
            info!(check = check.name(), "Running {} check...", check.name());
            let report = check.run().await;
            if report.passed {
                info!(check = report.name, "{}", report.detail);
            } else {
                error!(check = report.name, "{}", report.detail);
            }
            reports.push(report);
        }

        let summary = PreflightSummary { reports };
        if summary.passed() {
            info!("All checks passed successfully!");
        } else {
            error!(
                failed = summary.failures().count(),
                "One or more checks failed. Please fix the issues before running the application."
            );
        }
        summary
    }
}
