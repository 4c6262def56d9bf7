//! Read-only, id-indexed view over the candidate set.

use episodex_common::{CanonicalMedia, MediaId};
use std::collections::HashMap;
use std::sync::Arc;

/// Candidate media of one scan, ordered by id and indexed for O(1) lookup.
///
/// Built once before matching and never mutated afterwards.
#[derive(Debug, Default)]
pub struct MediaContainer {
    media: Vec<Arc<CanonicalMedia>>,
    index: HashMap<MediaId, usize>,
}

impl MediaContainer {
    /// Build a container; duplicate ids keep their first occurrence.
    pub fn new(media: impl IntoIterator<Item = CanonicalMedia>) -> Self {
        let mut media: Vec<Arc<CanonicalMedia>> = media.into_iter().map(Arc::new).collect();
        // Stable sort keeps the first occurrence of each id in front for dedup.
        media.sort_by_key(|m| m.id);
        media.dedup_by_key(|m| m.id);

        let index = media
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id, i))
            .collect();

        Self { media, index }
    }

    pub fn get(&self, id: MediaId) -> Option<&Arc<CanonicalMedia>> {
        self.index.get(&id).map(|&i| &self.media[i])
    }

    pub fn contains(&self, id: MediaId) -> bool {
        self.index.contains_key(&id)
    }

    /// All candidates in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CanonicalMedia>> {
        self.media.iter()
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }
}
