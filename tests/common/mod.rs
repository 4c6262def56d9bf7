//! Shared test harness for integration tests.
//!
//! Provides [`StubCatalog`], an in-memory catalog implementing both scanner
//! traits with per-operation call counters and failure injection, plus small
//! builders for media records and local files.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use episodex::catalog::{CandidateSource, CatalogClient};
use episodex::config::Config;
use episodex::scanner::{LocalFile, ParsedData, Scanner};
use episodex_common::{
    CanonicalMedia, EpisodeInfo, EpisodeMap, Error, FuzzyDate, MediaFormat, MediaId, MediaStatus,
    RelationEdge, RelationKind, Result,
};

/// In-memory catalog with call counters.
#[derive(Default)]
pub struct StubCatalog {
    media: HashMap<MediaId, CanonicalMedia>,
    relations: HashMap<MediaId, Vec<RelationEdge>>,
    maps: HashMap<MediaId, EpisodeMap>,
    owner_list: Vec<CanonicalMedia>,
    search: HashMap<String, Vec<CanonicalMedia>>,
    failing: HashSet<MediaId>,
    panicking_episodes: HashSet<MediaId>,
    pub media_calls: AtomicUsize,
    pub relation_calls: AtomicUsize,
    pub map_calls: AtomicUsize,
    pub owner_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `media` fetchable by id.
    pub fn media(mut self, media: CanonicalMedia) -> Self {
        self.media.insert(media.id, media);
        self
    }

    /// Put `media` on the owner's list (and make it fetchable).
    pub fn owned(mut self, media: CanonicalMedia) -> Self {
        self.owner_list.push(media.clone());
        self.media(media)
    }

    /// Link `prequel` and `sequel` in both directions.
    pub fn sequel(mut self, prequel: u32, sequel: u32) -> Self {
        self.relations
            .entry(MediaId::new(prequel))
            .or_default()
            .push(relation(RelationKind::Sequel, sequel));
        self.relations
            .entry(MediaId::new(sequel))
            .or_default()
            .push(relation(RelationKind::Prequel, prequel));
        self
    }

    pub fn episodes(mut self, id: u32, count: u32) -> Self {
        let episodes = (1..=count)
            .map(|n| {
                (
                    n.to_string(),
                    EpisodeInfo {
                        episode: n.to_string(),
                        absolute_episode_number: None,
                        airdate: None,
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

    pub fn search_result(mut self, title: &str, media: CanonicalMedia) -> Self {
        self.search.entry(title.to_string()).or_default().push(media);
        self
    }

    /// Every per-media lookup for `id` fails.
    pub fn failing(mut self, id: u32) -> Self {
        self.failing.insert(MediaId::new(id));
        self
    }

    /// Episode-mapping lookups for `id` panic.
    pub fn panicking_episodes(mut self, id: u32) -> Self {
        self.panicking_episodes.insert(MediaId::new(id));
        self
    }

    pub fn total_calls(&self) -> usize {
        self.media_calls.load(Ordering::SeqCst)
            + self.relation_calls.load(Ordering::SeqCst)
            + self.map_calls.load(Ordering::SeqCst)
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
        if self.panicking_episodes.contains(&id) {
            panic!("stub catalog panic for media {id}");
        }
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
        self.owner_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.owner_list.clone())
    }

    async fn search_media(&self, title: &str) -> Result<Vec<CanonicalMedia>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.search.get(title).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn relation(kind: RelationKind, target: u32) -> RelationEdge {
    RelationEdge {
        kind,
        target: MediaId::new(target),
        target_format: Some(MediaFormat::Tv),
    }
}

/// A finished TV series with an English title.
pub fn tv(id: u32, title: &str, episodes: u32, year: u16) -> CanonicalMedia {
    let mut media = CanonicalMedia::new(MediaId::new(id), title);
    media.title.english = Some(title.to_string());
    media.format = Some(MediaFormat::Tv);
    media.status = Some(MediaStatus::Finished);
    media.episodes = Some(episodes);
    media.start_date = FuzzyDate::ymd(year, 4, 1);
    media
}

/// A series still airing: `aired` of `total` episodes are out.
pub fn airing(id: u32, title: &str, total: u32, aired: u32, year: u16) -> CanonicalMedia {
    let mut media = tv(id, title, total, year);
    media.status = Some(MediaStatus::Releasing);
    media.next_airing_episode = Some(aired + 1);
    media
}

pub fn movie(id: u32, title: &str, year: u16) -> CanonicalMedia {
    let mut media = tv(id, title, 1, year);
    media.format = Some(MediaFormat::Movie);
    media
}

/// An unmatched local file under `/anime/<title>/`.
pub fn local_file(name: &str, title: &str, episode: Option<&str>) -> LocalFile {
    LocalFile::new(
        format!("/anime/{title}/{name}"),
        ParsedData {
            title: title.to_string(),
            episode: episode.map(String::from),
            season: None,
            release_group: None,
        },
    )
}

/// Config with a username so the owner list is fetched, and generous limits.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.scan.username = Some("owner".to_string());
    config.limiter.catalog.permits = 1000;
    config.limiter.catalog.window_secs = 1;
    config.limiter.analysis.permits = 1000;
    config.limiter.analysis.window_secs = 1;
    config
}

pub fn scanner(catalog: &Arc<StubCatalog>) -> Scanner {
    scanner_with(catalog, &test_config())
}

pub fn scanner_with(catalog: &Arc<StubCatalog>, config: &Config) -> Scanner {
    Scanner::new(config, catalog.clone(), catalog.clone())
}
