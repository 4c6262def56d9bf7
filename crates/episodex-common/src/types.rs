//! Catalog type definitions: canonical media, relations, and episode maps.
//!
//! Enums use AniList's SCREAMING_SNAKE_CASE spelling on the wire so catalog
//! responses deserialize straight into them. `Display` is lowercase for logs.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::MediaId;

/// Release format of a canonical media record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    /// Regular television series.
    Tv,
    /// Short-episode television series.
    TvShort,
    /// Theatrical or standalone film.
    Movie,
    /// Special episode(s).
    Special,
    /// Original video animation.
    Ova,
    /// Original net animation.
    Ona,
    /// Music video.
    Music,
    /// Printed formats, never matched against video but present in relations.
    Manga,
    /// Light novel.
    Novel,
    /// One-shot manga.
    OneShot,
}

impl MediaFormat {
    /// Whether the format is animated (as opposed to a print format).
    pub fn is_animated(self) -> bool {
        !matches!(self, Self::Manga | Self::Novel | Self::OneShot)
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tv => write!(f, "tv"),
            Self::TvShort => write!(f, "tv_short"),
            Self::Movie => write!(f, "movie"),
            Self::Special => write!(f, "special"),
            Self::Ova => write!(f, "ova"),
            Self::Ona => write!(f, "ona"),
            Self::Music => write!(f, "music"),
            Self::Manga => write!(f, "manga"),
            Self::Novel => write!(f, "novel"),
            Self::OneShot => write!(f, "one_shot"),
        }
    }
}

/// Airing status of a canonical media record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    Finished,
    Releasing,
    NotYetReleased,
    Cancelled,
    Hiatus,
}

/// Kind of a relation edge between two media records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    Adaptation,
    Prequel,
    Sequel,
    Parent,
    SideStory,
    Character,
    Summary,
    Alternative,
    SpinOff,
    Source,
    Compilation,
    Contains,
    /// Anything else, including relation kinds added to the catalog later.
    #[serde(other)]
    Other,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Adaptation => "adaptation",
            Self::Prequel => "prequel",
            Self::Sequel => "sequel",
            Self::Parent => "parent",
            Self::SideStory => "side_story",
            Self::Character => "character",
            Self::Summary => "summary",
            Self::Alternative => "alternative",
            Self::SpinOff => "spin_off",
            Self::Source => "source",
            Self::Compilation => "compilation",
            Self::Contains => "contains",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// A possibly incomplete calendar date, as the catalog reports start dates.
///
/// Ordering is chronological; an unknown part sorts after every known value
/// at the same position, so undated media land at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuzzyDate {
    pub year: Option<u16>,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl FuzzyDate {
    /// A date with all three parts known.
    pub fn ymd(year: u16, month: u8, day: u8) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
        }
    }

    fn sort_key(&self) -> (u16, u8, u8) {
        (
            self.year.unwrap_or(u16::MAX),
            self.month.unwrap_or(u8::MAX),
            self.day.unwrap_or(u8::MAX),
        )
    }
}

impl PartialOrd for FuzzyDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FuzzyDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Localised titles of a media record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

/// A directed relation from one media record to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEdge {
    pub kind: RelationKind,
    pub target: MediaId,
    /// Format of the target, when the catalog includes it with the edge.
    pub target_format: Option<MediaFormat>,
}

/// The remote catalog's authoritative record for one installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMedia {
    pub id: MediaId,
    pub title: MediaTitle,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub format: Option<MediaFormat>,
    pub status: Option<MediaStatus>,
    /// Planned episode count, when the catalog knows it.
    pub episodes: Option<u32>,
    /// Episode number of the next episode to air, for airing media.
    pub next_airing_episode: Option<u32>,
    #[serde(default)]
    pub start_date: FuzzyDate,
    /// Relation edges; `None` when they were not part of the fetched record.
    #[serde(default)]
    pub relations: Option<Vec<RelationEdge>>,
}

impl CanonicalMedia {
    /// A bare record with only an id and a romaji title.
    pub fn new(id: MediaId, romaji: impl Into<String>) -> Self {
        Self {
            id,
            title: MediaTitle {
                romaji: Some(romaji.into()),
                ..MediaTitle::default()
            },
            synonyms: Vec::new(),
            format: None,
            status: None,
            episodes: None,
            next_airing_episode: None,
            start_date: FuzzyDate::default(),
            relations: None,
        }
    }

    /// Number of episodes that have aired so far.
    ///
    /// For airing media this is one less than the next airing episode,
    /// otherwise the planned count.
    pub fn current_episode_count(&self) -> Option<u32> {
        match self.next_airing_episode {
            Some(next) if next > 0 => Some(next - 1),
            _ => self.episodes,
        }
    }

    /// Total planned episode count, falling back to the aired count.
    pub fn total_episode_count(&self) -> Option<u32> {
        match self.episodes {
            Some(n) => Some(n),
            None => self.next_airing_episode.filter(|n| *n > 0).map(|n| n - 1),
        }
    }

    pub fn is_movie(&self) -> bool {
        self.format == Some(MediaFormat::Movie)
    }

    /// Movies and single-episode media never carry absolute numbering.
    pub fn is_movie_or_single_episode(&self) -> bool {
        self.is_movie() || self.total_episode_count() == Some(1)
    }

    /// Every non-empty title and synonym, in a stable order.
    pub fn all_titles(&self) -> Vec<&str> {
        [&self.title.english, &self.title.romaji, &self.title.native]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .chain(self.synonyms.iter().map(String::as_str))
            .filter(|t| !t.trim().is_empty())
            .collect()
    }

    /// Best display title for logs.
    pub fn display_title(&self) -> &str {
        self.title
            .english
            .as_deref()
            .or(self.title.romaji.as_deref())
            .or(self.title.native.as_deref())
            .unwrap_or("<untitled>")
    }
}

/// Per-episode data from the episode-mapping service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeInfo {
    #[serde(default)]
    pub episode: String,
    #[serde(default)]
    pub absolute_episode_number: Option<u32>,
    #[serde(default)]
    pub airdate: Option<String>,
}

/// Episode mapping for one media record.
///
/// Keys are episode labels: plain numbers for main episodes, `S`-prefixed
/// labels for specials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMap {
    pub media_id: MediaId,
    pub episodes: BTreeMap<String, EpisodeInfo>,
    pub episode_count: Option<u32>,
}

impl EpisodeMap {
    /// Number of main (numerically labelled) episodes.
    ///
    /// Falls back to the reported episode count when the map has no numeric
    /// entries.
    pub fn main_episode_count(&self) -> Option<u32> {
        let numeric = self
            .episodes
            .keys()
            .filter(|k| k.parse::<u32>().map(|n| n > 0).unwrap_or(false))
            .count() as u32;
        if numeric > 0 {
            Some(numeric)
        } else {
            self.episode_count.filter(|n| *n > 0)
        }
    }
}
