//! Traits for the remote catalog seam.
//!
//! The scanner never talks HTTP directly. It sees the catalog through two
//! traits: [`CatalogClient`] for per-media lookups made while building
//! relation trees and analyses, and [`CandidateSource`] for the bulk queries
//! that seed the candidate set. Both are object safe and shared as
//! `Arc<dyn ...>` across hydration groups.
//!
//! Callers acquire a rate-limiter permit before every call; implementations
//! do not limit themselves.

use async_trait::async_trait;
use episodex_common::{CanonicalMedia, EpisodeMap, MediaId, RelationEdge, Result};

/// Per-media lookups against the canonical catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one media record. The record may or may not carry its relations.
    async fn fetch_media_by_id(&self, id: MediaId) -> Result<CanonicalMedia>;

    /// Fetch the relation edges of one media record.
    async fn fetch_relations(&self, id: MediaId) -> Result<Vec<RelationEdge>>;

    /// Fetch the per-episode mapping of one media record.
    async fn fetch_episode_mapping(&self, id: MediaId) -> Result<EpisodeMap>;
}

/// Bulk queries used to build the candidate set of a scan.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Every media on the named user's list.
    async fn fetch_owner_list(&self, username: &str) -> Result<Vec<CanonicalMedia>>;

    /// Catalog search by free-text title, best results first.
    async fn search_media(&self, title: &str) -> Result<Vec<CanonicalMedia>>;
}
