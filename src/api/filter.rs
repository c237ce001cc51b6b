//! Tag API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub tag: String,
    /// Nodes carrying the tag themselves
    pub matching_ids: Vec<String>,
}

/// GET /api/tags - Every tag in use, alphabetically.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let revision_id = state.store.revision().await;
    success(state.store.all_tags().await, revision_id)
}

/// POST /api/filter - Expand the branches leading to a tag and collapse the rest.
pub async fn apply_filter(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<FilterResult> {
    let revision_id = state.store.revision().await;
    let tag = request.tag.trim().to_string();

    match state.store.apply_tag_filter(&tag).await {
        Ok(matching_ids) => success(
            FilterResult { tag, matching_ids },
            state.store.revision().await,
        ),
        Err(e) => error(e, revision_id),
    }
}

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    pub tag: String,
}

/// GET /api/nodes/:id/has-tag?tag= - Whether the node or a descendant carries the tag.
pub async fn subtree_has_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TagQuery>,
) -> ApiResult<bool> {
    let revision_id = state.store.revision().await;

    match state.store.subtree_has_tag(&id, query.tag.trim()).await {
        Some(found) => success(found, revision_id),
        None => error(AppError::node_not_found(&id), revision_id),
    }
}
