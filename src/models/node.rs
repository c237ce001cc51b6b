//! Node model, the single entity of the folder tree.

use serde::{Deserialize, Deserializer, Serialize};

use crate::tags::TagInput;

/// Name given to nodes created without one.
pub const DEFAULT_NODE_NAME: &str = "New folder";

/// Name given to top-level nodes created through the "add root" action.
pub const DEFAULT_ROOT_NAME: &str = "New root";

/// Label shown in place of an empty name.
pub const UNNAMED_LABEL: &str = "(unnamed)";

/// A folder-like entry. `parent_id == None` marks a root.
///
/// Missing or null fields in stored documents deserialize to their defaults,
/// which is how documents written before `collapsed` existed are migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub collapsed: bool,
}

impl Node {
    /// Name for display, falling back to a placeholder when empty.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            UNNAMED_LABEL
        } else {
            &self.name
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Generate a fresh node identifier.
pub fn new_node_id() -> String {
    format!("n_{}", uuid::Uuid::new_v4().simple())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Request body for creating a node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<TagInput>,
}

/// Request body for updating a node. Only the supplied fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<TagInput>,
    #[serde(default)]
    pub collapsed: Option<bool>,
}

/// Request body for reparenting a node. `parent_id: null` moves it to the top level.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveNodeRequest {
    #[serde(default)]
    pub parent_id: Option<String>,
}
