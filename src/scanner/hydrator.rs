//! Episode metadata hydration for matched files.
//!
//! Files are grouped by media id. Groups run concurrently (bounded by
//! `group_concurrency`) and share only the scan caches and limiters; files
//! inside a group run one after another. Each file is classified by the
//! first rule that applies:
//!
//! 1. special file name: `S<n>` label, episode left unset without a number
//! 2. NC file name (openings, endings, trailers): episode 1, label `NC`
//! 3. movie: episode 1
//! 4. no parseable episode: episode 1
//! 5. episode within the aired count: kept as is, `0` becomes `S1`
//! 6. single-episode media: episode 1
//! 7. otherwise the number is absolute and is mapped through the media's
//!    tree analysis, falling back to the raw number when that fails; a file
//!    only ever moves to a later related media, never to a prequel
//!
//! Tree analyses are built at most once per media id per scan. The first
//! group that needs one builds it; the result, success or failure, is reused
//! by every later file.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use episodex_common::{CanonicalMedia, Error, MediaId, Result};
use futures::{stream, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::catalog::CatalogClient;

use super::analysis::TreeAnalysis;
use super::cache::ScanCaches;
use super::comparison::{contains_nc, contains_special};
use super::container::MediaContainer;
use super::limiter::ScanLimiter;
use super::local_file::{LocalFile, LocalFileMetadata};
use super::tree::{RelationTree, TreeBuilder, TreeMode};

type AnalysisResult = std::result::Result<Arc<TreeAnalysis>, Arc<Error>>;

/// How a file's episode is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Special { episode: Option<u32> },
    NonCanonical,
    Episode(u32),
    /// Episode `0` of a regular series, labelled as the first special.
    EpisodeZero,
    /// Beyond the aired count; needs tree analysis.
    Absolute(u32),
}

impl Classification {
    /// Write the metadata for every classification except [`Self::Absolute`].
    fn apply(self, metadata: &mut LocalFileMetadata) {
        match self {
            Self::Special { episode } => {
                metadata.is_special = true;
                if let Some(episode) = episode {
                    metadata.set_episode(episode, format!("S{episode}"));
                }
            }
            Self::NonCanonical => {
                metadata.is_nc = true;
                metadata.set_episode(1, "NC");
            }
            Self::Episode(episode) | Self::Absolute(episode) => {
                metadata.set_episode(episode, episode.to_string());
            }
            Self::EpisodeZero => metadata.set_episode(0, "S1"),
        }
    }
}

/// Classify `file` against the media it was matched to.
pub fn classify(file: &LocalFile, media: &CanonicalMedia) -> Classification {
    if let Some(by_name) = classify_by_name(file) {
        return by_name;
    }
    if media.is_movie() {
        return Classification::Episode(1);
    }
    let Some(episode) = file.parsed_data.episode_number() else {
        return Classification::Episode(1);
    };

    if episode <= media.current_episode_count().unwrap_or(0) {
        return if episode == 0 {
            Classification::EpisodeZero
        } else {
            Classification::Episode(episode)
        };
    }
    if media.total_episode_count() == Some(1) {
        return Classification::Episode(1);
    }
    Classification::Absolute(episode)
}

fn classify_by_name(file: &LocalFile) -> Option<Classification> {
    let name = file.name();
    if contains_special(&name) {
        return Some(Classification::Special {
            episode: file.parsed_data.episode_number(),
        });
    }
    if contains_nc(&name) {
        return Some(Classification::NonCanonical);
    }
    None
}

/// Numbering used when the media record itself is unavailable.
fn classify_without_media(file: &LocalFile) -> Classification {
    classify_by_name(file)
        .unwrap_or_else(|| Classification::Episode(file.parsed_data.episode_number().unwrap_or(1)))
}

/// What went wrong while hydrating a file or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    RemoteFetch,
    AnalysisUnavailable,
    /// The analysis was built but no branch covers the episode.
    NoMapping,
    GroupPanicked,
    Other,
}

impl From<&Error> for IssueKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::RemoteFetch { .. } => Self::RemoteFetch,
            Error::AnalysisUnavailable { .. } => Self::AnalysisUnavailable,
            Error::GroupPanicked { .. } => Self::GroupPanicked,
            _ => Self::Other,
        }
    }
}

/// A non-fatal hydration failure. The affected file still got a best-effort
/// number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationIssue {
    pub media_id: MediaId,
    /// File concerned; `None` for failures that hit a whole group.
    pub path: Option<PathBuf>,
    pub kind: IssueKind,
    pub message: String,
}

impl HydrationIssue {
    fn from_error(media_id: MediaId, path: Option<PathBuf>, err: &Error) -> Self {
        Self {
            media_id,
            path,
            kind: IssueKind::from(err),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HydrationReport {
    pub groups: usize,
    pub hydrated: usize,
    pub issues: Vec<HydrationIssue>,
}

pub struct Hydrator {
    catalog: Arc<dyn CatalogClient>,
    caches: Arc<ScanCaches>,
    catalog_limiter: Arc<ScanLimiter>,
    analysis_limiter: Arc<ScanLimiter>,
    tree_mode: TreeMode,
    concurrency: usize,
    cancel: CancellationToken,
    analyses: DashMap<MediaId, Arc<OnceCell<AnalysisResult>>>,
}

impl Hydrator {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        caches: Arc<ScanCaches>,
        catalog_limiter: Arc<ScanLimiter>,
        analysis_limiter: Arc<ScanLimiter>,
    ) -> Self {
        Self {
            catalog,
            caches,
            catalog_limiter,
            analysis_limiter,
            tree_mode: TreeMode::default(),
            concurrency: 8,
            cancel: CancellationToken::new(),
            analyses: DashMap::new(),
        }
    }

    pub fn with_tree_mode(mut self, mode: TreeMode) -> Self {
        self.tree_mode = mode;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Number of tree analyses attempted so far, successful or not.
    pub fn analyses_built(&self) -> usize {
        self.analyses
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    /// Compute metadata for every matched file in `files`.
    ///
    /// Unmatched files are not touched. Returns once every group has
    /// finished; failures inside a group are reported, never propagated.
    pub async fn hydrate_metadata(
        &self,
        files: &mut [LocalFile],
        container: &MediaContainer,
    ) -> HydrationReport {
        let mut groups: BTreeMap<MediaId, Vec<&mut LocalFile>> = BTreeMap::new();
        for file in files.iter_mut().filter(|f| f.is_matched()) {
            groups.entry(file.media_id).or_default().push(file);
        }

        let mut report = HydrationReport {
            groups: groups.len(),
            ..HydrationReport::default()
        };
        debug!(groups = report.groups, "Hydrating matched files");

        let outcomes: Vec<(usize, Vec<HydrationIssue>)> = stream::iter(groups)
            .map(|(media_id, group)| async move {
                let size = group.len();
                match AssertUnwindSafe(self.hydrate_group(media_id, group, container))
                    .catch_unwind()
                    .await
                {
                    Ok(issues) => (size, issues),
                    Err(payload) => {
                        let err = Error::GroupPanicked {
                            media_id,
                            message: panic_message(payload.as_ref()),
                        };
                        error!(media_id = %media_id, error = %err, "Hydration group aborted");
                        (0, vec![HydrationIssue::from_error(media_id, None, &err)])
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (hydrated, issues) in outcomes {
            report.hydrated += hydrated;
            report.issues.extend(issues);
        }
        report
    }

    async fn hydrate_group(
        &self,
        media_id: MediaId,
        files: Vec<&mut LocalFile>,
        container: &MediaContainer,
    ) -> Vec<HydrationIssue> {
        let mut issues = Vec::new();

        let media = match self.media(media_id, container).await {
            Ok(media) => media,
            Err(err) => {
                warn!(
                    media_id = %media_id,
                    error = %err,
                    "Media unavailable, using raw episode numbers"
                );
                issues.push(HydrationIssue::from_error(media_id, None, &err));
                for file in files {
                    file.metadata = LocalFileMetadata::default();
                    classify_without_media(file).apply(&mut file.metadata);
                }
                return issues;
            }
        };

        for file in files {
            file.metadata = LocalFileMetadata::default();

            let absolute = match classify(file, &media) {
                Classification::Absolute(absolute) => absolute,
                resolved => {
                    resolved.apply(&mut file.metadata);
                    continue;
                }
            };

            let failure = match self.analysis(media_id).await {
                Ok(analysis) => match analysis.resolve(absolute, media.total_episode_count()) {
                    Some(relative) => {
                        if relative.media_id != media_id {
                            debug!(
                                path = %file.path.display(),
                                from = %media_id,
                                to = %relative.media_id,
                                "Absolute episode belongs to a later related media"
                            );
                            file.media_id = relative.media_id;
                        }
                        file.metadata.set_episode(relative.episode, relative.episode.to_string());
                        continue;
                    }
                    None => HydrationIssue {
                        media_id,
                        path: Some(file.path.clone()),
                        kind: IssueKind::NoMapping,
                        message: format!(
                            "absolute episode {absolute} maps neither to this media nor a later one"
                        ),
                    },
                },
                Err(err) => HydrationIssue::from_error(media_id, Some(file.path.clone()), &err),
            };

            warn!(
                path = %file.path.display(),
                media_id = %media_id,
                episode = absolute,
                reason = %failure.message,
                "Could not normalize absolute episode, keeping raw number"
            );
            Classification::Absolute(absolute).apply(&mut file.metadata);
            issues.push(failure);
        }

        issues
    }

    async fn media(
        &self,
        media_id: MediaId,
        container: &MediaContainer,
    ) -> Result<Arc<CanonicalMedia>> {
        if let Some(media) = container.get(media_id) {
            return Ok(Arc::clone(media));
        }
        if let Some(media) = self.caches.media.get(&media_id) {
            return Ok(media);
        }

        self.catalog_limiter.acquire("media", media_id).await?;
        let media = self.catalog.fetch_media_by_id(media_id).await?;
        Ok(self.caches.media.insert(media_id, media))
    }

    /// Shared, build-once analysis for `media_id`.
    async fn analysis(&self, media_id: MediaId) -> AnalysisResult {
        if self.cancel.is_cancelled() {
            return Err(Arc::new(Error::remote("analysis", media_id, "scan cancelled")));
        }

        let cell = Arc::clone(self.analyses.entry(media_id).or_default().value());
        cell.get_or_init(|| self.build_analysis(media_id)).await.clone()
    }

    async fn build_analysis(&self, media_id: MediaId) -> AnalysisResult {
        let mut tree = RelationTree::new(media_id);
        TreeBuilder::new(self.catalog.as_ref(), &self.caches, &self.catalog_limiter)
            .fetch_tree(media_id, self.tree_mode, &mut tree)
            .await
            .map_err(Arc::new)?;

        let analysis = TreeAnalysis::new(
            &tree,
            self.catalog.as_ref(),
            &self.caches.episodes,
            &self.analysis_limiter,
        )
        .await
        .map_err(Arc::new)?;

        Ok(Arc::new(analysis))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
