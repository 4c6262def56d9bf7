//! Typed ID wrappers.
//!
//! Catalog ids are plain integers on the wire; wrapping them keeps a media id
//! from being confused with an episode number.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a canonical media record in the remote catalog.
///
/// `0` is reserved and means "not matched to any media".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(u32);

impl MediaId {
    /// The id carried by local files that have not been matched.
    pub const UNMATCHED: MediaId = MediaId(0);

    /// Wrap a raw catalog id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw catalog id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the reserved "unmatched" id.
    #[must_use]
    pub const fn is_unmatched(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for MediaId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<MediaId> for u32 {
    fn from(id: MediaId) -> Self {
        id.0
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Generate a new random scan ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ScanId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
