use std::time::Duration;

use anyhow::Context;
use log::{debug, info};
use reqwest::{Client, Url};
use thiserror::Error;

use super::{MirrorStatus, Snapshot};

const USER_AGENT: &str = concat!("mirrorlb/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch mirror status from {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed mirror status from {url}: {source}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
}

/// Counters describing one filtering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total: usize,
    pub http: usize,
    pub complete: usize,
    pub retained: usize,
}

/// Fetches the upstream status feed and turns it into a [`Snapshot`].
pub struct SnapshotBuilder {
    client: Client,
    source: Url,
    min_completion: f64,
}

impl SnapshotBuilder {
    pub fn new(source: Url, min_completion: f64, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            source,
            min_completion,
        })
    }

    pub fn source(&self) -> &Url {
        &self.source
    }

    pub async fn build(&self) -> Result<Snapshot, FetchError> {
        let status = self.fetch().await?;
        info!(
            "filtering mirrors with HTTP and completion>={}",
            self.min_completion
        );
        let (snapshot, stats) = Snapshot::from_status(status, self.min_completion);
        info!(
            "mirror stats: total {}, HTTP {}, complete {}, HTTP and complete {}",
            stats.total, stats.http, stats.complete, stats.retained
        );
        Ok(snapshot)
    }

    async fn fetch(&self) -> Result<MirrorStatus, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: self.source.clone(),
            source,
        };

        info!("downloading mirror list from {}", self.source);
        let response = self
            .client
            .get(self.source.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(transport)?;
        let body = response.bytes().await.map_err(transport)?;
        debug!("received {} bytes of mirror status", body.len());

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: self.source.clone(),
            source,
        })
    }
}
