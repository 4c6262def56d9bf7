//! Local files as handed to the scanner.
//!
//! Discovery and filename parsing happen elsewhere; a [`LocalFile`] arrives
//! with its [`ParsedData`] filled in. The scanner only ever writes
//! [`LocalFile::media_id`] and [`LocalFile::metadata`].

use episodex_common::MediaId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fields extracted from the file name by the parsing collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedData {
    /// Cleaned series title.
    #[serde(default)]
    pub title: String,
    /// Raw episode string, e.g. `"05"`.
    #[serde(default)]
    pub episode: Option<String>,
    /// Raw season string, e.g. `"2"`.
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub release_group: Option<String>,
}

impl ParsedData {
    /// Episode as a number, when the episode string is a plain integer.
    pub fn episode_number(&self) -> Option<u32> {
        parse_number(self.episode.as_deref())
    }

    /// Season as a number, when the season string is a plain integer.
    pub fn season_number(&self) -> Option<u32> {
        parse_number(self.season.as_deref())
    }
}

fn parse_number(raw: Option<&str>) -> Option<u32> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<u32>().ok())
}

/// Episode metadata computed by the hydrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileMetadata {
    /// Episode number used for progress tracking.
    pub episode: Option<u32>,
    /// AniDB-style label: `"5"`, `"S1"`, `"NC"`.
    pub anidb_episode: Option<String>,
    #[serde(default)]
    pub is_special: bool,
    #[serde(default)]
    pub is_nc: bool,
}

impl LocalFileMetadata {
    pub(crate) fn set_episode(&mut self, episode: u32, label: impl Into<String>) {
        self.episode = Some(episode);
        self.anidb_episode = Some(label.into());
    }
}

/// A media file on disk, identified by its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    pub path: PathBuf,
    pub parsed_data: ParsedData,
    #[serde(default)]
    pub media_id: MediaId,
    #[serde(default)]
    pub metadata: LocalFileMetadata,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>, parsed_data: ParsedData) -> Self {
        Self {
            path: path.into(),
            parsed_data,
            media_id: MediaId::UNMATCHED,
            metadata: LocalFileMetadata::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension, or the whole path if it has none.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    pub fn is_matched(&self) -> bool {
        !self.media_id.is_unmatched()
    }
}
