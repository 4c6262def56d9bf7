//! Candidate set retrieval.
//!
//! Seeds the candidate set from the owner's list, widens it with the
//! prequel/sequel trees of those entries, and in enhanced mode adds catalog
//! search results for titles of files that are still unmatched. Every remote
//! call goes through the catalog limiter and every fetched record lands in
//! the media cache. Individual failures are logged and skipped.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use episodex_common::{CanonicalMedia, MediaId};
use tracing::{debug, info, warn};

use crate::catalog::{CandidateSource, CatalogClient};

use super::cache::ScanCaches;
use super::limiter::ScanLimiter;
use super::local_file::LocalFile;
use super::tree::{RelationTree, TreeBuilder, TreeMode};

/// Result of a candidate fetch.
#[derive(Debug, Default)]
pub struct FetchedCandidates {
    /// Candidates in ascending id order, without duplicates.
    pub media: Vec<CanonicalMedia>,
    /// Ids found only through title search, i.e. not on the owner's list.
    pub unknown_media_ids: Vec<MediaId>,
}

pub struct CandidateFetcher {
    source: Arc<dyn CandidateSource>,
    catalog: Arc<dyn CatalogClient>,
    caches: Arc<ScanCaches>,
    limiter: Arc<ScanLimiter>,
    username: Option<String>,
    enhanced: bool,
}

impl CandidateFetcher {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        catalog: Arc<dyn CatalogClient>,
        caches: Arc<ScanCaches>,
        limiter: Arc<ScanLimiter>,
    ) -> Self {
        Self {
            source,
            catalog,
            caches,
            limiter,
            username: None,
            enhanced: false,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_enhanced(mut self, enhanced: bool) -> Self {
        self.enhanced = enhanced;
        self
    }

    pub async fn fetch(&self, files: &[LocalFile]) -> FetchedCandidates {
        let mut candidates: BTreeMap<MediaId, CanonicalMedia> = BTreeMap::new();

        if let Some(username) = &self.username {
            self.add_owner_list(username, &mut candidates).await;
            self.expand_trees(&mut candidates).await;
        }

        let unknown_media_ids = if self.enhanced {
            self.search_unmatched_titles(files, &mut candidates).await
        } else {
            Vec::new()
        };

        info!(
            candidates = candidates.len(),
            unknown = unknown_media_ids.len(),
            "Candidate set ready"
        );

        FetchedCandidates {
            media: candidates.into_values().collect(),
            unknown_media_ids,
        }
    }

    async fn add_owner_list(
        &self,
        username: &str,
        candidates: &mut BTreeMap<MediaId, CanonicalMedia>,
    ) {
        let result = match self.limiter.acquire("owner_list", MediaId::UNMATCHED).await {
            Ok(()) => self.source.fetch_owner_list(username).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(list) => {
                debug!(username, entries = list.len(), "Fetched owner list");
                for media in list.into_iter().filter(is_video) {
                    self.add(media, candidates);
                }
            }
            Err(e) => warn!(username, error = %e, "Failed to fetch owner list"),
        }
    }

    /// Add every prequel and sequel of the current candidates.
    async fn expand_trees(&self, candidates: &mut BTreeMap<MediaId, CanonicalMedia>) {
        let builder = TreeBuilder::new(self.catalog.as_ref(), &self.caches, &self.limiter);
        let roots: Vec<MediaId> = candidates.keys().copied().collect();
        let mut expanded: HashSet<MediaId> = HashSet::new();

        for root in roots {
            if expanded.contains(&root) {
                continue;
            }

            let mut tree = RelationTree::new(root);
            if let Err(e) = builder.fetch_tree(root, TreeMode::All, &mut tree).await {
                warn!(media_id = %root, error = %e, "Skipping relation tree expansion");
                continue;
            }

            for node in tree.nodes() {
                expanded.insert(node.id);
                if !candidates.contains_key(&node.id) && is_video(node) {
                    debug!(
                        media_id = %node.id,
                        title = node.display_title(),
                        "Adding related media"
                    );
                    candidates.insert(node.id, CanonicalMedia::clone(node));
                }
            }
        }
    }

    /// Search each distinct unmatched title; returns ids new to the set.
    async fn search_unmatched_titles(
        &self,
        files: &[LocalFile],
        candidates: &mut BTreeMap<MediaId, CanonicalMedia>,
    ) -> Vec<MediaId> {
        let titles: BTreeSet<&str> = files
            .iter()
            .filter(|f| !f.is_matched())
            .map(|f| f.parsed_data.title.trim())
            .filter(|t| !t.is_empty())
            .collect();

        let mut unknown = Vec::new();
        for title in titles {
            let result = match self.limiter.acquire("search", MediaId::UNMATCHED).await {
                Ok(()) => self.source.search_media(title).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(found) => {
                    for media in found.into_iter().filter(is_video) {
                        if !candidates.contains_key(&media.id) {
                            unknown.push(media.id);
                            self.add(media, candidates);
                        }
                    }
                }
                Err(e) => warn!(title, error = %e, "Title search failed"),
            }
        }

        unknown.sort();
        unknown.dedup();
        unknown
    }

    fn add(&self, media: CanonicalMedia, candidates: &mut BTreeMap<MediaId, CanonicalMedia>) {
        self.caches.media.insert(media.id, media.clone());
        candidates.entry(media.id).or_insert(media);
    }
}

fn is_video(media: &CanonicalMedia) -> bool {
    media.format.map_or(true, |f| f.is_animated())
}
