//! In-memory catalog shared by the scanner's unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use episodex_common::{
    CanonicalMedia, EpisodeInfo, EpisodeMap, Error, FuzzyDate, MediaFormat, MediaId, MediaStatus,
    RelationEdge, RelationKind, Result,
};

use crate::catalog::{CandidateSource, CatalogClient};
use crate::scanner::limiter::ScanLimiter;

#[derive(Default)]
pub struct StubCatalog {
    media: HashMap<MediaId, CanonicalMedia>,
    relations: HashMap<MediaId, Vec<RelationEdge>>,
    maps: HashMap<MediaId, EpisodeMap>,
    owner_list: Vec<CanonicalMedia>,
    search: HashMap<String, Vec<CanonicalMedia>>,
    failing: HashSet<MediaId>,
    pub media_calls: AtomicUsize,
    pub relation_calls: AtomicUsize,
    pub map_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl StubCatalog {
    pub fn with_media(mut self, media: CanonicalMedia) -> Self {
        self.media.insert(media.id, media);
        self
    }

    pub fn with_relations(mut self, id: u32, edges: Vec<RelationEdge>) -> Self {
        self.relations.insert(MediaId::new(id), edges);
        self
    }

    /// Episode map with `count` numbered episodes.
    pub fn with_episode_map(mut self, id: u32, count: u32) -> Self {
        let episodes = (1..=count)
            .map(|n| {
                (
                    n.to_string(),
                    EpisodeInfo {
                        episode: n.to_string(),
                        ..EpisodeInfo::default()
                    },
                )
            })
            .collect();
        self.maps.insert(
            MediaId::new(id),
            EpisodeMap {
                media_id: MediaId::new(id),
                episodes,
                episode_count: Some(count),
            },
        );
        self
    }

    pub fn with_owner_list(mut self, media: Vec<CanonicalMedia>) -> Self {
        self.owner_list = media;
        self
    }

    pub fn with_search(mut self, title: &str, results: Vec<CanonicalMedia>) -> Self {
        self.search.insert(title.to_string(), results);
        self
    }

    /// Every lookup for `id` fails.
    pub fn failing(mut self, id: u32) -> Self {
        self.failing.insert(MediaId::new(id));
        self
    }

    fn check(&self, operation: &str, id: MediaId) -> Result<()> {
        if self.failing.contains(&id) {
            return Err(Error::remote(operation, id, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for StubCatalog {
    async fn fetch_media_by_id(&self, id: MediaId) -> Result<CanonicalMedia> {
        self.media_calls.fetch_add(1, Ordering::SeqCst);
        self.check("media", id)?;
        self.media
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::remote("media", id, "not found"))
    }

    async fn fetch_relations(&self, id: MediaId) -> Result<Vec<RelationEdge>> {
        self.relation_calls.fetch_add(1, Ordering::SeqCst);
        self.check("relations", id)?;
        Ok(self.relations.get(&id).cloned().unwrap_or_default())
    }

    async fn fetch_episode_mapping(&self, id: MediaId) -> Result<EpisodeMap> {
        self.map_calls.fetch_add(1, Ordering::SeqCst);
        self.check("episodes", id)?;
        self.maps
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::remote("episodes", id, "no mapping"))
    }
}

#[async_trait]
impl CandidateSource for StubCatalog {
    async fn fetch_owner_list(&self, _username: &str) -> Result<Vec<CanonicalMedia>> {
        Ok(self.owner_list.clone())
    }

    async fn search_media(&self, title: &str) -> Result<Vec<CanonicalMedia>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.search.get(title).cloned().unwrap_or_default())
    }
}

/// A finished TV series.
pub fn tv(id: u32, title: &str, episodes: u32, year: u16) -> CanonicalMedia {
    CanonicalMedia {
        format: Some(MediaFormat::Tv),
        status: Some(MediaStatus::Finished),
        episodes: Some(episodes),
        start_date: FuzzyDate::ymd(year, 4, 1),
        ..CanonicalMedia::new(MediaId::new(id), title)
    }
}

pub fn movie(id: u32, title: &str, year: u16) -> CanonicalMedia {
    CanonicalMedia {
        format: Some(MediaFormat::Movie),
        episodes: Some(1),
        ..tv(id, title, 1, year)
    }
}

pub fn edge(kind: RelationKind, target: u32) -> RelationEdge {
    RelationEdge {
        kind,
        target: MediaId::new(target),
        target_format: Some(MediaFormat::Tv),
    }
}

pub fn generous_limiter() -> ScanLimiter {
    ScanLimiter::new(1000, Duration::from_secs(1)).unwrap()
}
