//! Relation trees: the chronological neighbourhood of one media record.
//!
//! [`TreeBuilder::fetch_tree`] walks relation edges breadth-first from a root
//! id. Every node comes from the scan's media cache when present and from the
//! catalog otherwise, behind a limiter permit. Ids are marked visited before
//! they are queued, so inconsistent catalog data (two media listing each
//! other, longer loops) cannot keep the walk going.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use episodex_common::{CanonicalMedia, MediaId, RelationEdge, RelationKind, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::catalog::CatalogClient;

use super::cache::ScanCaches;
use super::limiter::ScanLimiter;

/// Which relation edges a tree walk follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeMode {
    /// Prequels and sequels, in both directions.
    #[default]
    All,
    /// Only prequel edges, walking back in time.
    Prequels,
    /// Only sequel edges, walking forward in time.
    Sequels,
}

impl TreeMode {
    pub fn follows(self, kind: RelationKind) -> bool {
        match self {
            Self::All => matches!(kind, RelationKind::Prequel | RelationKind::Sequel),
            Self::Prequels => kind == RelationKind::Prequel,
            Self::Sequels => kind == RelationKind::Sequel,
        }
    }
}

/// A followed relation between two nodes of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeEdge {
    pub from: MediaId,
    pub to: MediaId,
    pub kind: RelationKind,
}

/// Node-and-edge graph rooted at one media id.
#[derive(Debug, Clone)]
pub struct RelationTree {
    root: MediaId,
    nodes: BTreeMap<MediaId, Arc<CanonicalMedia>>,
    edges: Vec<TreeEdge>,
}

impl RelationTree {
    pub fn new(root: MediaId) -> Self {
        Self {
            root,
            nodes: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn root(&self) -> MediaId {
        self.root
    }

    pub fn root_media(&self) -> Option<&Arc<CanonicalMedia>> {
        self.nodes.get(&self.root)
    }

    pub fn get(&self, id: MediaId) -> Option<&Arc<CanonicalMedia>> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: MediaId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<CanonicalMedia>> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[TreeEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, media: Arc<CanonicalMedia>) {
        self.nodes.entry(media.id).or_insert(media);
    }
}

/// Builds relation trees through the shared caches and catalog limiter.
pub struct TreeBuilder<'a> {
    catalog: &'a dyn CatalogClient,
    caches: &'a ScanCaches,
    limiter: &'a ScanLimiter,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        catalog: &'a dyn CatalogClient,
        caches: &'a ScanCaches,
        limiter: &'a ScanLimiter,
    ) -> Self {
        Self {
            catalog,
            caches,
            limiter,
        }
    }

    /// Populate `tree` with everything reachable from `root` under `mode`.
    ///
    /// Fails on the first node or relation fetch that fails. The tree is left
    /// partially filled in that case and must be discarded.
    pub async fn fetch_tree(
        &self,
        root: MediaId,
        mode: TreeMode,
        tree: &mut RelationTree,
    ) -> Result<()> {
        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);

        while let Some(id) = queue.pop_front() {
            let media = self.media(id).await?;
            let relations = self.relations(&media).await?;
            tree.insert(media);

            for edge in relations.iter() {
                if !mode.follows(edge.kind) {
                    continue;
                }
                // Relations may point at the manga or novel a season adapts.
                if edge.target_format.is_some_and(|f| !f.is_animated()) {
                    continue;
                }

                tree.edges.push(TreeEdge {
                    from: id,
                    to: edge.target,
                    kind: edge.kind,
                });
                if visited.insert(edge.target) {
                    trace!(
                        from = %id,
                        to = %edge.target,
                        kind = %edge.kind,
                        "Queueing related media"
                    );
                    queue.push_back(edge.target);
                }
            }
        }

        debug!(
            root = %root,
            nodes = tree.len(),
            edges = tree.edges.len(),
            "Relation tree built"
        );
        Ok(())
    }

    async fn media(&self, id: MediaId) -> Result<Arc<CanonicalMedia>> {
        if let Some(media) = self.caches.media.get(&id) {
            return Ok(media);
        }

        self.limiter.acquire("media", id).await?;
        let media = self.catalog.fetch_media_by_id(id).await?;
        Ok(self.caches.media.insert(id, media))
    }

    async fn relations(&self, media: &CanonicalMedia) -> Result<Arc<Vec<RelationEdge>>> {
        if let Some(edges) = self.caches.relations.get(&media.id) {
            return Ok(edges);
        }
        if let Some(edges) = &media.relations {
            return Ok(self.caches.relations.insert(media.id, edges.clone()));
        }

        self.limiter.acquire("relations", media.id).await?;
        let edges = self.catalog.fetch_relations(media.id).await?;
        Ok(self.caches.relations.insert(media.id, edges))
    }
}
