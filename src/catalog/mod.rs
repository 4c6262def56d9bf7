//! Remote catalog access.
//!
//! - [`provider`] -- The [`CatalogClient`] and [`CandidateSource`] traits the
//!   scanner depends on.
//! - [`anilist`] -- AniList GraphQL client (media, relations, lists, search).
//! - [`anizip`] -- ani.zip client for per-episode mappings.
//!
//! [`RemoteCatalog`] composes the two clients behind both traits.

pub mod anilist;
pub mod anizip;
pub mod provider;

use std::time::Duration;

use async_trait::async_trait;
use episodex_common::{CanonicalMedia, EpisodeMap, Error, MediaId, RelationEdge, Result};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::CatalogConfig;

pub use anilist::AnilistClient;
pub use anizip::AnizipClient;
pub use provider::{CandidateSource, CatalogClient};

/// The production catalog: AniList for media data, ani.zip for episodes.
pub struct RemoteCatalog {
    anilist: AnilistClient,
    anizip: AnizipClient,
}

impl RemoteCatalog {
    pub fn new(anilist: AnilistClient, anizip: AnizipClient) -> Self {
        Self { anilist, anizip }
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Ok(Self::new(
            AnilistClient::from_config(config)?,
            AnizipClient::from_config(config)?,
        ))
    }

    /// Abort 429 back-offs of both clients once `token` is cancelled.
    pub fn with_cancellation(self, token: CancellationToken) -> Self {
        Self {
            anilist: self.anilist.with_cancellation(token.clone()),
            anizip: self.anizip.with_cancellation(token),
        }
    }
}

#[async_trait]
impl CatalogClient for RemoteCatalog {
    async fn fetch_media_by_id(&self, id: MediaId) -> Result<CanonicalMedia> {
        self.anilist.fetch_media_by_id(id).await
    }

    async fn fetch_relations(&self, id: MediaId) -> Result<Vec<RelationEdge>> {
        self.anilist.fetch_relations(id).await
    }

    async fn fetch_episode_mapping(&self, id: MediaId) -> Result<EpisodeMap> {
        self.anizip.fetch_episode_mapping(id).await
    }
}

#[async_trait]
impl CandidateSource for RemoteCatalog {
    async fn fetch_owner_list(&self, username: &str) -> Result<Vec<CanonicalMedia>> {
        self.anilist.fetch_owner_list(username).await
    }

    async fn search_media(&self, title: &str) -> Result<Vec<CanonicalMedia>> {
        self.anilist.search_media(title).await
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))
}

/// Longest `Retry-After` honoured; larger values are clamped to it.
pub(crate) const MAX_RETRY_WAIT: Duration = Duration::from_secs(60);

/// 429 handling shared by the catalog clients.
#[derive(Debug, Clone, Default)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub cancel: CancellationToken,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            cancel: CancellationToken::new(),
        }
    }
}

/// Back-off for a 429 with the given `Retry-After` value (seconds).
fn retry_wait(retry_after: Option<&str>) -> Duration {
    retry_after
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(Duration::from_secs(1), Duration::from_secs)
        .min(MAX_RETRY_WAIT)
}

/// Send a request, retrying on HTTP 429 with `Retry-After` back-off.
///
/// `build` is called once per attempt. Any other non-success status, a 429
/// after `max_retries` retries, and a back-off cut short by cancellation
/// become [`Error::RemoteFetch`].
pub(crate) async fn send_with_retry<F>(
    operation: &str,
    media_id: MediaId,
    policy: &RetryPolicy,
    build: F,
) -> Result<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut retries = 0u32;
    loop {
        let resp = build()
            .send()
            .await
            .map_err(|e| Error::remote(operation, media_id, e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS && retries < policy.max_retries {
            retries += 1;
            let wait = retry_wait(
                resp.headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok()),
            );
            warn!(
                operation,
                media_id = %media_id,
                retry = retries,
                wait_secs = wait.as_secs(),
                "Catalog returned 429, backing off"
            );
            tokio::select! {
                _ = tokio::time::sleep(wait) => continue,
                _ = policy.cancel.cancelled() => {
                    return Err(Error::remote(operation, media_id, "back-off cancelled"));
                }
            }
        }

        if !status.is_success() {
            return Err(Error::remote(operation, media_id, format!("HTTP {status}")));
        }
        return Ok(resp);
    }
}
