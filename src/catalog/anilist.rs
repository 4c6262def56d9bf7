//! AniList GraphQL client.
//!
//! Implements media, relation, owner-list and search lookups against the
//! AniList v2 GraphQL API. Requests are plain JSON POSTs; HTTP 429 is retried
//! with `Retry-After` back-off, and GraphQL-level `errors` are reported as
//! [`Error::RemoteFetch`] like transport failures.

use std::time::Duration;

use episodex_common::{
    CanonicalMedia, Error, FuzzyDate, MediaFormat, MediaId, MediaStatus, MediaTitle, RelationEdge,
    RelationKind, Result,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CatalogConfig;

use super::{build_http_client, send_with_retry, RetryPolicy};

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

const MEDIA_FIELDS: &str = "
    id
    title { romaji english native }
    synonyms
    format
    status
    episodes
    nextAiringEpisode { episode }
    startDate { year month day }
";

const RELATION_FIELDS: &str = "
    relations {
        edges {
            relationType(version: 2)
            node { id format type }
        }
    }
";

fn media_query() -> String {
    format!(
        "query ($id: Int) {{ Media(id: $id, type: ANIME) {{ {MEDIA_FIELDS} {RELATION_FIELDS} }} }}"
    )
}

fn relations_query() -> String {
    format!("query ($id: Int) {{ Media(id: $id, type: ANIME) {{ id {RELATION_FIELDS} }} }}")
}

fn owner_list_query() -> String {
    format!(
        "query ($userName: String) {{ MediaListCollection(userName: $userName, type: ANIME) {{ \
         lists {{ entries {{ media {{ {MEDIA_FIELDS} {RELATION_FIELDS} }} }} }} }} }}"
    )
}

fn search_query() -> String {
    format!(
        "query ($search: String) {{ Page(page: 1, perPage: 5) {{ \
         media(search: $search, type: ANIME) {{ {MEDIA_FIELDS} }} }} }}"
    )
}

// ---------------------------------------------------------------------------
// AniList response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<AnilistMedia>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    #[serde(rename = "MediaListCollection")]
    collection: Option<ListCollection>,
}

#[derive(Debug, Deserialize)]
struct ListCollection {
    #[serde(default)]
    lists: Vec<MediaList>,
}

#[derive(Debug, Deserialize)]
struct MediaList {
    #[serde(default)]
    entries: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    media: Option<AnilistMedia>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "Page")]
    page: Option<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    media: Vec<AnilistMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnilistMedia {
    id: u32,
    title: Option<MediaTitle>,
    synonyms: Option<Vec<String>>,
    format: Option<MediaFormat>,
    status: Option<MediaStatus>,
    episodes: Option<u32>,
    next_airing_episode: Option<NextAiring>,
    start_date: Option<FuzzyDate>,
    relations: Option<RelationConnection>,
}

#[derive(Debug, Deserialize)]
struct NextAiring {
    episode: u32,
}

#[derive(Debug, Deserialize)]
struct RelationConnection {
    #[serde(default)]
    edges: Vec<AnilistEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnilistEdge {
    relation_type: Option<RelationKind>,
    node: Option<EdgeNode>,
}

#[derive(Debug, Deserialize)]
struct EdgeNode {
    id: u32,
    format: Option<MediaFormat>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl RelationConnection {
    /// Anime edges with a known relation type.
    fn into_edges(self) -> Vec<RelationEdge> {
        self.edges
            .into_iter()
            .filter_map(|edge| {
                let node = edge.node?;
                if node.kind.as_deref().is_some_and(|k| k != "ANIME") {
                    return None;
                }
                Some(RelationEdge {
                    kind: edge.relation_type?,
                    target: MediaId::new(node.id),
                    target_format: node.format,
                })
            })
            .collect()
    }
}

impl From<AnilistMedia> for CanonicalMedia {
    fn from(media: AnilistMedia) -> Self {
        Self {
            id: MediaId::new(media.id),
            title: media.title.unwrap_or_default(),
            synonyms: media.synonyms.unwrap_or_default(),
            format: media.format,
            status: media.status,
            episodes: media.episodes,
            next_airing_episode: media.next_airing_episode.map(|n| n.episode),
            start_date: media.start_date.unwrap_or_default(),
            relations: media.relations.map(RelationConnection::into_edges),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// AniList GraphQL client.
///
/// Does no rate limiting of its own; the scanner's limiter gates every call.
pub struct AnilistClient {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl AnilistClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: endpoint.into(),
            retry: RetryPolicy::new(max_retries),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(&config.anilist_url, config.request_timeout(), config.max_retries)
    }

    /// Cancelling `token` cuts any 429 back-off short.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.retry.cancel = token;
        self
    }

    async fn query<T: DeserializeOwned>(
        &self,
        operation: &str,
        media_id: MediaId,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        debug!(operation, media_id = %media_id, "AniList query");
        let body = json!({ "query": query, "variables": variables });

        let resp = send_with_retry(operation, media_id, &self.retry, || {
            self.client.post(&self.endpoint).json(&body)
        })
        .await?;

        let parsed: GraphqlResponse<T> = resp
            .json()
            .await
            .map_err(|e| Error::remote(operation, media_id, format!("malformed response: {e}")))?;

        if !parsed.errors.is_empty() {
            let message = parsed
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::remote(operation, media_id, message));
        }

        parsed
            .data
            .ok_or_else(|| Error::remote(operation, media_id, "response carried no data"))
    }

    pub async fn fetch_media_by_id(&self, id: MediaId) -> Result<CanonicalMedia> {
        let data: MediaData = self
            .query("media", id, &media_query(), json!({ "id": id.get() }))
            .await?;
        data.media
            .map(CanonicalMedia::from)
            .ok_or_else(|| Error::remote("media", id, "media not found"))
    }

    pub async fn fetch_relations(&self, id: MediaId) -> Result<Vec<RelationEdge>> {
        let data: MediaData = self
            .query("relations", id, &relations_query(), json!({ "id": id.get() }))
            .await?;
        let media = data
            .media
            .ok_or_else(|| Error::remote("relations", id, "media not found"))?;
        Ok(media
            .relations
            .map(RelationConnection::into_edges)
            .unwrap_or_default())
    }

    pub async fn fetch_owner_list(&self, username: &str) -> Result<Vec<CanonicalMedia>> {
        let data: ListData = self
            .query(
                "owner_list",
                MediaId::UNMATCHED,
                &owner_list_query(),
                json!({ "userName": username }),
            )
            .await?;

        Ok(data
            .collection
            .map(|c| c.lists)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|list| list.entries)
            .filter_map(|entry| entry.media)
            .map(CanonicalMedia::from)
            .collect())
    }

    pub async fn search_media(&self, title: &str) -> Result<Vec<CanonicalMedia>> {
        let data: PageData = self
            .query("search", MediaId::UNMATCHED, &search_query(), json!({ "search": title }))
            .await?;

        Ok(data
            .page
            .map(|p| p.media)
            .unwrap_or_default()
            .into_iter()
            .map(CanonicalMedia::from)
            .collect())
    }
}
