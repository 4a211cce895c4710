// SPDX-License-Identifier: GPL-3.0-only
use serde::Serialize;
use std::time::Duration;

use crate::config::SupervisorConfig;

/// Timing of the liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthcheckSpec {
    pub interval: Duration,
    pub timeout: Duration,
    pub retries: u32,
    pub start_period: Duration,
}

impl HealthcheckSpec {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
            retries: config.retries,
            start_period: config.start_period(),
        }
    }
}

impl Default for HealthcheckSpec {
    fn default() -> Self {
        Self::from_config(&SupervisorConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Starting,
    Healthy,
    Unhealthy,
}

/// Folds probe results into a health state.
///
/// While still `Starting` inside the start period, failed probes are not
/// counted. Any success resets the streak; `retries` consecutive counted
/// failures mark the child unhealthy.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    spec: HealthcheckSpec,
    state: HealthState,
    failing_streak: u32,
}

impl HealthTracker {
    pub fn new(spec: HealthcheckSpec) -> Self {
        Self {
            spec,
            state: HealthState::Starting,
            failing_streak: 0,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn failing_streak(&self) -> u32 {
        self.failing_streak
    }

    /// Record one probe result taken `since_start` after the child started
    pub fn record(&mut self, success: bool, since_start: Duration) -> HealthState {
        if success {
            self.failing_streak = 0;
            self.state = HealthState::Healthy;
            return self.state;
        }

        if self.state == HealthState::Starting && since_start < self.spec.start_period {
            return self.state;
        }

        self.failing_streak += 1;
        if self.failing_streak >= self.spec.retries {
            self.state = HealthState::Unhealthy;
        }
        self.state
    }
}
