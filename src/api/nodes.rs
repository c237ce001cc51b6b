//! Node API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CreateNodeRequest, MoveNodeRequest, Node, UpdateNodeRequest, DEFAULT_ROOT_NAME,
};
use crate::AppState;

/// Ids removed by a subtree delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedNodes {
    pub removed_ids: Vec<String>,
}

/// GET /api/nodes - List the whole collection.
pub async fn list_nodes(State(state): State<AppState>) -> ApiResult<Vec<Node>> {
    let revision_id = state.store.revision().await;
    success(state.store.all().await, revision_id)
}

/// GET /api/nodes/:id - Get a single node.
pub async fn get_node(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Node> {
    let revision_id = state.store.revision().await;

    match state.store.find(&id).await {
        Some(node) => success(node, revision_id),
        None => error(AppError::node_not_found(&id), revision_id),
    }
}

/// POST /api/nodes - Create a node. Without a parent it becomes a root.
pub async fn create_node(
    State(state): State<AppState>,
    Json(mut request): Json<CreateNodeRequest>,
) -> ApiResult<Node> {
    let revision_id = state.store.revision().await;

    if request.parent_id.is_none() && request.name.is_none() {
        request.name = Some(DEFAULT_ROOT_NAME.to_string());
    }

    match state.store.create(&request).await {
        Ok(node) => success(node, state.store.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/nodes/:id - Update the supplied fields of a node.
pub async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateNodeRequest>,
) -> ApiResult<Node> {
    let revision_id = state.store.revision().await;

    match state.store.update(&id, &request).await {
        Ok(node) => success(node, state.store.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/nodes/:id - Delete a node and everything below it.
pub async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedNodes> {
    let revision_id = state.store.revision().await;

    let label = state
        .store
        .find(&id)
        .await
        .map(|node| node.display_name().to_string());

    match state.store.delete(&id).await {
        Ok(removed_ids) => {
            tracing::info!(
                "Deleted '{}' and {} descendants",
                label.unwrap_or_default(),
                removed_ids.len().saturating_sub(1)
            );
            success(DeletedNodes { removed_ids }, state.store.revision().await)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/nodes/:id/parent - Move a node under another parent, or to the top level.
pub async fn move_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MoveNodeRequest>,
) -> ApiResult<Node> {
    let revision_id = state.store.revision().await;

    match state
        .store
        .move_node(&id, request.parent_id.as_deref())
        .await
    {
        Ok(node) => success(node, state.store.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/nodes/:id/toggle - Flip the collapsed flag.
pub async fn toggle_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Node> {
    let revision_id = state.store.revision().await;

    match state.store.toggle_collapsed(&id).await {
        Ok(node) => success(node, state.store.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/roots - Top-level nodes sorted by name.
pub async fn list_roots(State(state): State<AppState>) -> ApiResult<Vec<Node>> {
    let revision_id = state.store.revision().await;
    success(state.store.children_of(None).await, revision_id)
}

/// GET /api/nodes/:id/children - Direct children sorted by name.
pub async fn list_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Node>> {
    let revision_id = state.store.revision().await;

    if state.store.find(&id).await.is_none() {
        return error(AppError::node_not_found(&id), revision_id);
    }
    success(state.store.children_of(Some(id.as_str())).await, revision_id)
}

/// GET /api/nodes/:id/root - Top-level ancestor of a node.
pub async fn get_root_of(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Node> {
    let revision_id = state.store.revision().await;

    match state.store.root_of(&id).await {
        Some(root) => success(root, revision_id),
        None => error(AppError::node_not_found(&id), revision_id),
    }
}
