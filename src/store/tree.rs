//! Flat node arena with parent back-references.
//!
//! Nodes live in a map keyed by id; an ordered id list keeps the document order
//! stable across saves. Child lists are derived on demand. Every operation
//! tolerates inconsistent loaded data (dangling parents, parent cycles).

use std::collections::{HashMap, HashSet};

use super::collate::compare_names;
use crate::errors::AppError;
use crate::models::{
    new_node_id, CreateNodeRequest, Node, UpdateNodeRequest, DEFAULT_NODE_NAME,
};

#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: HashMap<String, Node>,
    order: Vec<String>,
}

impl Tree {
    /// Build a tree from a loaded document. Later duplicates of an id are dropped.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut tree = Tree::default();
        for node in nodes {
            if tree.nodes.contains_key(&node.id) {
                tracing::warn!("Dropping duplicate node id {}", node.id);
                continue;
            }
            tree.order.push(node.id.clone());
            tree.nodes.insert(node.id.clone(), node);
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.iter().cloned().collect()
    }

    /// Number of nodes whose parent reference points at a missing node.
    pub fn dangling_count(&self) -> usize {
        self.iter()
            .filter(|n| {
                n.parent_id
                    .as_ref()
                    .is_some_and(|p| !self.nodes.contains_key(p))
            })
            .count()
    }

    /// Children of `parent_id` (`None` = roots) sorted by name.
    pub fn children_of(&self, parent_id: Option<&str>) -> Vec<&Node> {
        let mut children: Vec<&Node> = self
            .iter()
            .filter(|n| n.parent_id.as_deref() == parent_id)
            .collect();
        children.sort_by(|a, b| compare_names(&a.name, &b.name));
        children
    }

    /// Walk parent links up to the top-level ancestor of `id`.
    pub fn root_of(&self, id: &str) -> Option<&Node> {
        let mut current = self.nodes.get(id)?;
        let mut seen = HashSet::new();
        while !current.is_root() {
            let Some(parent) = current.parent_id.as_deref().and_then(|p| self.nodes.get(p)) else {
                break;
            };
            if !seen.insert(current.id.as_str()) {
                break;
            }
            current = parent;
        }
        Some(current)
    }

    /// Whether `candidate` is `ancestor` itself or lies below it.
    pub fn is_self_or_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut cursor = Some(candidate);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            cursor = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());
        }
        false
    }

    /// Ids of `id` and all of its descendants, depth first.
    pub fn descendant_closure(&self, id: &str) -> Vec<String> {
        // One pass over the arena; children keep document order
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for node in self.iter() {
            if let Some(parent_id) = node.parent_id.as_deref() {
                children.entry(parent_id).or_default().push(node.id.as_str());
            }
        }

        let mut closure = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(kids) = children.get(current) {
                stack.extend(kids.iter().rev());
            }
            closure.push(current.to_string());
        }
        closure
    }

    pub fn create(&mut self, request: &CreateNodeRequest) -> Result<Node, AppError> {
        if let Some(parent_id) = request.parent_id.as_deref() {
            if !self.nodes.contains_key(parent_id) {
                return Err(AppError::node_not_found(parent_id));
            }
        }

        let node = Node {
            id: new_node_id(),
            parent_id: request.parent_id.clone(),
            name: request
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_NODE_NAME.to_string()),
            description: request.description.clone().unwrap_or_default(),
            tags: request
                .tags
                .clone()
                .map(|t| t.into_tags())
                .unwrap_or_default(),
            collapsed: false,
        };

        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    /// Shallow merge of the supplied fields.
    pub fn update(&mut self, id: &str, request: &UpdateNodeRequest) -> Result<Node, AppError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| AppError::node_not_found(id))?;

        if let Some(name) = &request.name {
            node.name = name.clone();
        }
        if let Some(description) = &request.description {
            node.description = description.clone();
        }
        if let Some(tags) = &request.tags {
            node.tags = tags.clone().into_tags();
        }
        if let Some(collapsed) = request.collapsed {
            node.collapsed = collapsed;
        }
        Ok(node.clone())
    }

    /// Remove `id` and its whole subtree. Returns the removed ids.
    pub fn delete(&mut self, id: &str) -> Result<Vec<String>, AppError> {
        if !self.nodes.contains_key(id) {
            return Err(AppError::node_not_found(id));
        }
        let closure = self.descendant_closure(id);
        let doomed: HashSet<&str> = closure.iter().map(String::as_str).collect();
        self.order.retain(|n| !doomed.contains(n.as_str()));
        self.nodes.retain(|n, _| !doomed.contains(n.as_str()));
        Ok(closure)
    }

    /// Reparent `id` under `new_parent_id` (`None` = top level).
    pub fn move_node(&mut self, id: &str, new_parent_id: Option<&str>) -> Result<Node, AppError> {
        if !self.nodes.contains_key(id) {
            return Err(AppError::node_not_found(id));
        }
        if let Some(parent_id) = new_parent_id {
            if !self.nodes.contains_key(parent_id) {
                return Err(AppError::node_not_found(parent_id));
            }
            if self.is_self_or_descendant(parent_id, id) {
                return Err(AppError::WouldCreateCycle {
                    node_id: id.to_string(),
                    parent_id: parent_id.to_string(),
                });
            }
        }

        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| AppError::node_not_found(id))?;
        node.parent_id = new_parent_id.map(str::to_string);
        Ok(node.clone())
    }

    pub fn toggle_collapsed(&mut self, id: &str) -> Result<Node, AppError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| AppError::node_not_found(id))?;
        node.collapsed = !node.collapsed;
        Ok(node.clone())
    }

    /// Rewrite every node's collapsed flag.
    pub fn set_collapsed_where<F>(&mut self, mut collapse: F)
    where
        F: FnMut(&Node) -> bool,
    {
        for node in self.nodes.values_mut() {
            node.collapsed = collapse(node);
        }
    }
}
