// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::preflight::traits::{Check, CheckReport};

const NAME: &str = "Internet connection";

/// Every configured URL must answer with a success status
pub struct ConnectivityCheck {
    client: Client,
    urls: Vec<String>,
}

impl ConnectivityCheck {
    pub fn new(urls: Vec<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("steam-downloader/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, urls })
    }

    async fn reach(&self, url: &str) -> anyhow::Result<()> {
        let response = self.client.get(url).send().await?;
        response.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Check for ConnectivityCheck {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&self) -> CheckReport {
        for url in &self.urls {
            if let Err(e) = self.reach(url).await {
                warn!(url = %url, error = %e, "Connectivity probe failed");
                return CheckReport::fail(NAME, format!("Failed to connect to {}: {}", url, e));
            }
        }

        CheckReport::pass(NAME, "Internet connectivity OK")
    }
}
