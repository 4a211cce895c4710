// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use serde::Serialize;

/// Result of a single pre-flight check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckReport {
    pub fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

#[async_trait]
pub trait Check: Send + Sync {
    /// Human readable check name used in logs
    fn name(&self) -> &'static str;

    /// Run the check. Failures are reported, never returned as errors.
    async fn run(&self) -> CheckReport;
}
