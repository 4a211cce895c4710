// SPDX-License-Identifier: GPL-3.0-only
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::config::APP_NAME;
use crate::monitor::{ResourceSnapshot, SharedSnapshot};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failure that still carries a payload for the caller to inspect
    pub fn failure(data: T, message: String) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: i64,
    pub resources: Option<ResourceSnapshot>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exceeded: Vec<&'static str>,
}

/// Shared state behind the HTTP routes
pub struct ApiState {
    started_at: DateTime<Utc>,
    snapshot: SharedSnapshot,
    resource_limit_percent: f32,
}

impl ApiState {
    pub fn new(snapshot: SharedSnapshot, resource_limit_percent: f32) -> Self {
        Self {
            started_at: Utc::now(),
            snapshot,
            resource_limit_percent,
        }
    }
}

/// Liveness probe target.
///
/// Healthy unless the latest resource sample has CPU, memory or disk usage
/// above the configured limit; before the first sample it reports healthy.
pub async fn health(
    State(state): State<Arc<ApiState>>,
) -> (StatusCode, Json<ApiResponse<HealthReport>>) {
    let resources = state.snapshot.read().await.clone();
    let exceeded = resources
        .as_ref()
        .map(|s| s.exceeded(state.resource_limit_percent))
        .unwrap_or_default();

    let now = Utc::now();
    let status = if exceeded.is_empty() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    let report = HealthReport {
        status,
        service: APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now,
        uptime_secs: (now - state.started_at).num_seconds(),
        resources,
        exceeded,
    };

    match status {
        HealthStatus::Healthy => (StatusCode::OK, Json(ApiResponse::success(report))),
        HealthStatus::Unhealthy => {
            let message = format!(
                "{} usage above {}%",
                report.exceeded.join(", "),
                state.resource_limit_percent
            );
            warn!(exceeded = ?report.exceeded, "Reporting unhealthy");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::failure(report, message)),
            )
        }
    }
}
