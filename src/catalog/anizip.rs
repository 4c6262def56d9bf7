//! ani.zip episode-mapping client.

use std::collections::BTreeMap;
use std::time::Duration;

use episodex_common::{EpisodeInfo, EpisodeMap, Error, MediaId, Result};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CatalogConfig;

use super::{build_http_client, send_with_retry, RetryPolicy};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MappingsResponse {
    #[serde(default)]
    episodes: BTreeMap<String, EpisodeInfo>,
    episode_count: Option<u32>,
}

/// Client for `GET {base}/mappings?anilist_id=<id>`.
pub struct AnizipClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl AnizipClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(max_retries),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(&config.anizip_url, config.request_timeout(), config.max_retries)
    }

    /// Cancelling `token` cuts any 429 back-off short.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.retry.cancel = token;
        self
    }

    pub async fn fetch_episode_mapping(&self, id: MediaId) -> Result<EpisodeMap> {
        let url = format!("{}/mappings", self.base_url);
        debug!(url = %url, media_id = %id, "ani.zip mapping lookup");

        let resp = send_with_retry("episodes", id, &self.retry, || {
            self.client.get(&url).query(&[("anilist_id", id.get())])
        })
        .await?;

        let body: MappingsResponse = resp
            .json()
            .await
            .map_err(|e| Error::remote("episodes", id, format!("malformed response: {e}")))?;

        Ok(EpisodeMap {
            media_id: id,
            episodes: body.episodes,
            episode_count: body.episode_count,
        })
    }
}
