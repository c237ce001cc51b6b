//! The tree document: a JSON array of nodes.

use serde::Serialize;
use serde_json::Value;

use super::Node;
use crate::errors::AppError;

/// File name used for exports and as the default remote path.
pub const DOCUMENT_FILE_NAME: &str = "data-tree.json";

/// Point-in-time copy of the collection handed to persistence.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub revision: i64,
    pub nodes: Vec<Node>,
}

/// Parse a tree document. Anything other than a JSON array of nodes is rejected.
pub fn parse_document(raw: &str) -> Result<Vec<Node>, AppError> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_array() {
        return Err(AppError::Validation(
            "Tree document must be a JSON array".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// Serialize nodes as a pretty-printed document.
pub fn to_document_string(nodes: &[Node]) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(nodes)?)
}

/// Revision info for change detection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub node_count: usize,
}
