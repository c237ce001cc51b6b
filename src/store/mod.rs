//! Tree store.
//!
//! Owns the in-memory collection and applies every mutation under one write
//! lock, saving through the persistence adapter before the lock is released so
//! local cache writes happen in mutation order. Rejected operations change
//! nothing and save nothing.

mod collate;
mod seed;
mod tree;

pub use tree::Tree;

use seed::seed_nodes;

use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::filter;
use crate::models::{
    parse_document, to_document_string, CreateNodeRequest, Node, RevisionInfo, Snapshot,
    UpdateNodeRequest,
};
use crate::persistence::{LoadSource, Persistence};

struct StoreState {
    tree: Tree,
    revision: i64,
}

impl StoreState {
    fn bump(&mut self) -> Snapshot {
        self.revision += 1;
        Snapshot {
            revision: self.revision,
            nodes: self.tree.to_vec(),
        }
    }
}

pub struct TreeStore {
    state: RwLock<StoreState>,
    persistence: Persistence,
}

impl TreeStore {
    /// Load the collection, installing the sample dataset when nothing usable was found.
    pub async fn open(persistence: Persistence) -> Self {
        let outcome = persistence.load().await;
        let tree = Tree::from_nodes(outcome.nodes);
        let dangling = tree.dangling_count();
        if dangling > 0 {
            tracing::warn!("{} nodes reference a missing parent", dangling);
        }

        let store = Self {
            state: RwLock::new(StoreState { tree, revision: 0 }),
            persistence,
        };

        let mut state = store.state.write().await;
        if state.tree.is_empty() {
            tracing::info!("Installing sample tree (load source: {:?})", outcome.source);
            state.tree = Tree::from_nodes(seed_nodes());
            let snapshot = state.bump();
            store.persistence.save(snapshot).await;
        } else if outcome.source != LoadSource::Origin {
            store
                .persistence
                .status()
                .show("Loaded from local cache")
                .await;
        }
        drop(state);

        store
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub async fn revision(&self) -> i64 {
        self.state.read().await.revision
    }

    pub async fn revision_info(&self) -> RevisionInfo {
        let state = self.state.read().await;
        RevisionInfo {
            revision_id: state.revision,
            node_count: state.tree.len(),
        }
    }

    // ==================== QUERIES ====================

    pub async fn all(&self) -> Vec<Node> {
        self.state.read().await.tree.to_vec()
    }

    pub async fn find(&self, id: &str) -> Option<Node> {
        self.state.read().await.tree.find(id).cloned()
    }

    /// Children of `parent_id` (`None` = roots), sorted by name.
    pub async fn children_of(&self, parent_id: Option<&str>) -> Vec<Node> {
        self.state
            .read()
            .await
            .tree
            .children_of(parent_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn root_of(&self, id: &str) -> Option<Node> {
        self.state.read().await.tree.root_of(id).cloned()
    }

    /// Whether the node or anything below it carries `tag`. `None` for unknown ids.
    pub async fn subtree_has_tag(&self, id: &str, tag: &str) -> Option<bool> {
        let state = self.state.read().await;
        let node = state.tree.find(id)?;
        Some(filter::matches_tag_in_subtree(&state.tree, node, tag))
    }

    pub async fn all_tags(&self) -> Vec<String> {
        filter::all_tags(&self.state.read().await.tree)
    }

    pub async fn export_document(&self) -> Result<String, AppError> {
        to_document_string(&self.all().await)
    }

    // ==================== MUTATIONS ====================

    async fn mutate<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Tree) -> Result<T, AppError>,
    {
        let mut state = self.state.write().await;
        let value = op(&mut state.tree)?;
        let snapshot = state.bump();
        self.persistence.save(snapshot).await;
        Ok(value)
    }

    pub async fn create(&self, request: &CreateNodeRequest) -> Result<Node, AppError> {
        let node = self.mutate(|tree| tree.create(request)).await?;
        tracing::debug!("Created node {} under {:?}", node.id, node.parent_id);
        Ok(node)
    }

    pub async fn update(&self, id: &str, request: &UpdateNodeRequest) -> Result<Node, AppError> {
        self.mutate(|tree| tree.update(id, request)).await
    }

    /// Delete a node and its subtree; returns the removed ids.
    pub async fn delete(&self, id: &str) -> Result<Vec<String>, AppError> {
        let removed = self.mutate(|tree| tree.delete(id)).await?;
        tracing::debug!("Deleted {} nodes under {}", removed.len(), id);
        Ok(removed)
    }

    pub async fn move_node(&self, id: &str, new_parent_id: Option<&str>) -> Result<Node, AppError> {
        self.mutate(|tree| tree.move_node(id, new_parent_id)).await
    }

    pub async fn toggle_collapsed(&self, id: &str) -> Result<Node, AppError> {
        self.mutate(|tree| tree.toggle_collapsed(id)).await
    }

    /// Apply a tag filter and return the ids carrying the tag directly.
    /// A blank tag clears the filter without touching stored state.
    pub async fn apply_tag_filter(&self, tag: &str) -> Result<Vec<String>, AppError> {
        if tag.is_empty() {
            return Ok(Vec::new());
        }
        self.mutate(|tree| Ok(filter::apply_tag_filter(tree, tag)))
            .await
    }

    /// Replace the whole collection.
    pub async fn replace_all(&self, nodes: Vec<Node>) -> Result<usize, AppError> {
        self.mutate(|tree| {
            *tree = Tree::from_nodes(nodes);
            Ok(tree.len())
        })
        .await
    }

    /// Import a document; a malformed one leaves the collection untouched.
    pub async fn import_document(&self, raw: &str) -> Result<usize, AppError> {
        let nodes = parse_document(raw)?;
        let count = self.replace_all(nodes).await?;
        self.persistence
            .status()
            .show("JSON imported successfully")
            .await;
        Ok(count)
    }

    // ==================== SYNC ====================

    /// Write the current collection out again without changing it.
    pub async fn flush(&self) {
        let state = self.state.read().await;
        let snapshot = Snapshot {
            revision: state.revision,
            nodes: state.tree.to_vec(),
        };
        self.persistence.save(snapshot).await;
    }

    /// Push the current collection to the remote store now.
    pub async fn push_remote(&self) -> Result<String, AppError> {
        let nodes = self.all().await;
        self.persistence.push_now(&nodes).await
    }

    /// Replace the collection with the remote document.
    pub async fn pull_remote(&self) -> Result<usize, AppError> {
        let nodes = self.persistence.pull().await?;
        let count = self.replace_all(nodes).await?;
        self.persistence
            .status()
            .show("Imported from remote successfully")
            .await;
        Ok(count)
    }
}
