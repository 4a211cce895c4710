// SPDX-License-Identifier: GPL-3.0-only
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("Health probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("Health endpoint returned status {0}")]
    Status(u16),

    #[error("Health probe request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Single HTTP GET against the health route; success means a 2xx answer
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: String, timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .user_agent(concat!("steam-downloader-probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProbeError::Transport)?;

        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn check(&self) -> Result<(), ProbeError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Transport(e)
            }
        })?;

        let status = response.status();
        debug!(url = %self.url, status = status.as_u16(), "Health probe answered");

        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}
