use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::scanner::tree::TreeMode;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub limiter: LimiterConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// AniList GraphQL endpoint
    #[serde(default = "default_anilist_url")]
    pub anilist_url: String,

    /// Base URL of the ani.zip episode-mapping API
    #[serde(default = "default_anizip_url")]
    pub anizip_url: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Retries after an HTTP 429 before giving up (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_anilist_url() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_anizip_url() -> String {
    "https://api.ani.zip".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            anilist_url: default_anilist_url(),
            anizip_url: default_anizip_url(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl CatalogConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A permit budget: at most `permits` calls within any `window_secs` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateBudget {
    pub permits: u32,
    pub window_secs: u64,
}

impl RateBudget {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimiterConfig {
    /// Budget for AniList calls (media, relations, search, owner list)
    #[serde(default = "default_catalog_budget")]
    pub catalog: RateBudget,

    /// Budget for episode-mapping lookups made during tree analysis
    #[serde(default = "default_analysis_budget")]
    pub analysis: RateBudget,
}

fn default_catalog_budget() -> RateBudget {
    RateBudget {
        permits: 90,
        window_secs: 60,
    }
}

fn default_analysis_budget() -> RateBudget {
    RateBudget {
        permits: 20,
        window_secs: 5,
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_budget(),
            analysis: default_analysis_budget(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// AniList user whose list seeds the candidate set
    #[serde(default)]
    pub username: Option<String>,

    /// Search the catalog for titles of files that are not on the owner's list
    #[serde(default)]
    pub enhanced: bool,

    /// Number of media groups hydrated concurrently (default: 8)
    #[serde(default = "default_group_concurrency")]
    pub group_concurrency: usize,

    /// Relation edges followed when building trees for absolute numbering
    #[serde(default)]
    pub tree_mode: TreeMode,
}

fn default_group_concurrency() -> usize {
    8
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            username: None,
            enhanced: false,
            group_concurrency: default_group_concurrency(),
            tree_mode: TreeMode::default(),
        }
    }
}
