//! Absolute-to-relative episode mapping over a relation tree.
//!
//! The analysable nodes of a tree (multi-episode, released, animated media)
//! are put in chronological order and each gets a contiguous range of
//! absolute episode numbers: the first node covers `1..=n1`, the next
//! `n1+1..=n1+n2`, and so on. An absolute number is mapped back by finding the
//! range that contains it.
//!
//! Episode counts come from the episode-mapping service, fetched once per
//! media per scan through the analysis limiter, with the catalog's planned
//! count as a fallback when the mapping has no numbered episodes.

use std::sync::Arc;

use episodex_common::{CanonicalMedia, Error, MediaId, MediaStatus, Result};
use futures::future::try_join_all;
use tracing::debug;

use crate::catalog::CatalogClient;

use super::cache::EpisodeMapCache;
use super::limiter::ScanLimiter;
use super::tree::RelationTree;

/// One analysed node and the absolute episode range it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisBranch {
    pub media_id: MediaId,
    /// Chronological position among the analysed nodes, starting at 0.
    pub index: usize,
    pub min_absolute: u32,
    pub max_absolute: u32,
    pub episode_count: u32,
}

impl AnalysisBranch {
    fn contains(&self, absolute: u32) -> bool {
        (self.min_absolute..=self.max_absolute).contains(&absolute)
    }
}

/// Where an absolute episode lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeEpisode {
    pub media_id: MediaId,
    pub episode: u32,
}

/// Immutable episode mapping for the tree rooted at [`TreeAnalysis::media_id`].
#[derive(Debug, Clone)]
pub struct TreeAnalysis {
    media_id: MediaId,
    branches: Vec<AnalysisBranch>,
}

impl TreeAnalysis {
    /// Analyse `tree`, fetching any episode mapping not yet in `episodes`.
    pub async fn new(
        tree: &RelationTree,
        catalog: &dyn CatalogClient,
        episodes: &EpisodeMapCache,
        limiter: &ScanLimiter,
    ) -> Result<Self> {
        let root = tree.root();
        if tree.root_media().is_none() {
            return Err(Error::analysis_unavailable(root, "root media missing from tree"));
        }

        let mut nodes: Vec<&Arc<CanonicalMedia>> =
            tree.nodes().filter(|m| is_analysable(m)).collect();
        if !nodes.iter().any(|m| m.id == root) {
            return Err(Error::analysis_unavailable(root, "root media has no absolute numbering"));
        }
        if let Some(undated) = nodes.iter().find(|m| m.start_date.year.is_none()) {
            return Err(Error::analysis_unavailable(
                root,
                format!("media {} has no start date", undated.id),
            ));
        }
        nodes.sort_by_key(|m| (m.start_date, m.id));

        let counts = try_join_all(
            nodes
                .iter()
                .map(|media| episode_count(media, root, catalog, episodes, limiter)),
        )
        .await?;

        let mut branches = Vec::with_capacity(nodes.len());
        let mut offset = 0u32;
        for (index, (media, count)) in nodes.iter().zip(counts).enumerate() {
            branches.push(AnalysisBranch {
                media_id: media.id,
                index,
                min_absolute: offset + 1,
                max_absolute: offset + count,
                episode_count: count,
            });
            offset += count;
        }

        debug!(
            media_id = %root,
            branches = branches.len(),
            total_episodes = offset,
            "Tree analysis built"
        );

        Ok(Self {
            media_id: root,
            branches,
        })
    }

    pub fn media_id(&self) -> MediaId {
        self.media_id
    }

    /// Branches in chronological order.
    pub fn branches(&self) -> &[AnalysisBranch] {
        &self.branches
    }

    /// Branch of the root media.
    pub fn root_branch(&self) -> Option<&AnalysisBranch> {
        self.branches.iter().find(|b| b.media_id == self.media_id)
    }

    /// Episode number relative to the root media, if the root's range covers
    /// `absolute`.
    pub fn relative_episode_number(&self, absolute: u32) -> Option<u32> {
        self.root_branch()
            .filter(|b| b.contains(absolute))
            .map(|b| absolute - b.min_absolute + 1)
    }

    /// Branch media and relative episode number for `absolute`, whichever
    /// branch covers it.
    pub fn locate(&self, absolute: u32) -> Option<RelativeEpisode> {
        self.branches
            .iter()
            .find(|b| b.contains(absolute))
            .map(|b| RelativeEpisode {
                media_id: b.media_id,
                episode: absolute - b.min_absolute + 1,
            })
    }

    /// Resolve `absolute` for a file matched to the root media.
    ///
    /// The root's own range wins. Otherwise the number may only move the file
    /// to a later branch, and only when it exceeds `root_total`, the root's
    /// planned episode count. An earlier branch is never chosen: a number the
    /// root could still hold (its aired count lagging the files on disk) is
    /// not evidence of a prequel.
    pub fn resolve(&self, absolute: u32, root_total: Option<u32>) -> Option<RelativeEpisode> {
        if let Some(episode) = self.relative_episode_number(absolute) {
            return Some(RelativeEpisode {
                media_id: self.media_id,
                episode,
            });
        }
        if root_total.is_some_and(|total| absolute <= total) {
            return None;
        }

        let root_index = self.root_branch()?.index;
        let branch = self.branches.iter().find(|b| b.contains(absolute))?;
        (branch.index > root_index).then(|| RelativeEpisode {
            media_id: branch.media_id,
            episode: absolute - branch.min_absolute + 1,
        })
    }
}

fn is_analysable(media: &CanonicalMedia) -> bool {
    !media.is_movie_or_single_episode()
        && media.status != Some(MediaStatus::NotYetReleased)
        && media.format.map_or(true, |f| f.is_animated())
}

async fn episode_count(
    media: &CanonicalMedia,
    root: MediaId,
    catalog: &dyn CatalogClient,
    episodes: &EpisodeMapCache,
    limiter: &ScanLimiter,
) -> Result<u32> {
    let map = match episodes.get(&media.id) {
        Some(map) => map,
        None => {
            limiter.acquire("episodes", media.id).await?;
            let map = catalog.fetch_episode_mapping(media.id).await?;
            episodes.insert(media.id, map)
        }
    };

    map.main_episode_count()
        .or(media.episodes)
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            Error::analysis_unavailable(
                root,
                format!("episode count unknown for media {}", media.id),
            )
        })
}
