//! Library scanner: matches local files to catalog media and numbers their
//! episodes.
//!
//! A scan runs in fixed stages:
//!
//! 1. [`fetcher`] builds the candidate set from the owner's list and, in
//!    enhanced mode, catalog searches.
//! 2. [`container`] freezes it into an id-indexed [`MediaContainer`].
//! 3. [`matcher`] assigns media ids to unmatched files.
//! 4. [`hydrator`] computes episode metadata per media group, building
//!    relation trees ([`tree`]) and analyses ([`analysis`]) when absolute
//!    numbering needs to be resolved.
//!
//! Limiters and caches are created per scan and dropped with it.

pub mod analysis;
pub mod cache;
pub mod comparison;
pub mod container;
pub mod fetcher;
pub mod hydrator;
pub mod limiter;
pub mod local_file;
pub mod matcher;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use episodex_common::{MediaId, Result, ScanId};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

use crate::catalog::{CandidateSource, CatalogClient};
use crate::config::{Config, LimiterConfig, ScanConfig};

pub use cache::ScanCaches;
pub use container::MediaContainer;
pub use fetcher::{CandidateFetcher, FetchedCandidates};
pub use hydrator::{Classification, HydrationIssue, HydrationReport, Hydrator, IssueKind};
pub use limiter::ScanLimiter;
pub use local_file::{LocalFile, LocalFileMetadata, ParsedData};
pub use matcher::{MatchResult, MatchStats, Matcher};
pub use tree::{RelationTree, TreeBuilder, TreeMode};

/// Progress callback for scan operations.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Stage a scan has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    FetchingCandidates,
    Matching,
    Hydrating,
    Finalizing,
    Complete,
}

impl ScanStage {
    /// Progress percentage reported when the stage starts.
    pub fn percent(self) -> u8 {
        match self {
            Self::FetchingCandidates => 10,
            Self::Matching => 40,
            Self::Hydrating => 60,
            Self::Finalizing => 90,
            Self::Complete => 100,
        }
    }
}

/// Scan progress information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub scan_id: ScanId,
    pub stage: ScanStage,
    pub percent: u8,
}

/// Outcome of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub scan_id: ScanId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_files: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Media found only through title search.
    pub unknown_media_ids: Vec<MediaId>,
    pub issues: Vec<HydrationIssue>,
}

/// Runs scans against one catalog.
pub struct Scanner {
    scan: ScanConfig,
    limits: LimiterConfig,
    source: Arc<dyn CandidateSource>,
    catalog: Arc<dyn CatalogClient>,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl Scanner {
    pub fn new(
        config: &Config,
        source: Arc<dyn CandidateSource>,
        catalog: Arc<dyn CatalogClient>,
    ) -> Self {
        Self {
            scan: config.scan.clone(),
            limits: config.limiter.clone(),
            source,
            catalog,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Once `token` is cancelled, pending catalog calls fail and files fall
    /// back to raw episode numbers.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Match and hydrate `files` in place.
    ///
    /// Only an empty candidate set (with files to match) or invalid limiter
    /// settings fail the scan. Everything else is reported in the summary.
    pub async fn scan(&self, files: &mut [LocalFile]) -> Result<ScanSummary> {
        let scan_id = ScanId::new();
        let span = info_span!("scan", scan_id = %scan_id);
        self.run(scan_id, files).instrument(span).await
    }

    async fn run(&self, scan_id: ScanId, files: &mut [LocalFile]) -> Result<ScanSummary> {
        let started_at = Utc::now();
        info!(files = files.len(), "Starting scan");

        let caches = Arc::new(ScanCaches::new());
        let catalog_limiter = Arc::new(
            ScanLimiter::from_budget(&self.limits.catalog)?.with_cancellation(self.cancel.clone()),
        );
        let analysis_limiter = Arc::new(
            ScanLimiter::from_budget(&self.limits.analysis)?.with_cancellation(self.cancel.clone()),
        );

        self.report(scan_id, ScanStage::FetchingCandidates);
        let fetched = CandidateFetcher::new(
            Arc::clone(&self.source),
            Arc::clone(&self.catalog),
            Arc::clone(&caches),
            Arc::clone(&catalog_limiter),
        )
        .with_username(self.scan.username.clone())
        .with_enhanced(self.scan.enhanced)
        .fetch(files)
        .await;
        let container = MediaContainer::new(fetched.media);

        self.report(scan_id, ScanStage::Matching);
        if files.iter().any(|f| !f.is_matched()) {
            Matcher::new(&container).match_local_files(files)?;
        }

        self.report(scan_id, ScanStage::Hydrating);
        let report = Hydrator::new(
            Arc::clone(&self.catalog),
            Arc::clone(&caches),
            catalog_limiter,
            analysis_limiter,
        )
        .with_tree_mode(self.scan.tree_mode)
        .with_concurrency(self.scan.group_concurrency)
        .with_cancellation(self.cancel.clone())
        .hydrate_metadata(files, &container)
        .await;

        self.report(scan_id, ScanStage::Finalizing);
        let matched = files.iter().filter(|f| f.is_matched()).count();
        let summary = ScanSummary {
            scan_id,
            started_at,
            finished_at: Utc::now(),
            total_files: files.len(),
            matched,
            unmatched: files.len() - matched,
            unknown_media_ids: fetched.unknown_media_ids,
            issues: report.issues,
        };

        info!(
            matched = summary.matched,
            unmatched = summary.unmatched,
            issues = summary.issues.len(),
            "Scan complete"
        );
        self.report(scan_id, ScanStage::Complete);
        Ok(summary)
    }

    fn report(&self, scan_id: ScanId, stage: ScanStage) {
        if let Some(callback) = &self.progress {
            callback(ScanProgress {
                scan_id,
                stage,
                percent: stage.percent(),
            });
        }
    }
}
