//! Remote sync and status endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::models::RevisionInfo;
use crate::status::StatusMessage;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    /// Revision marker of the file in the remote store after the push
    pub remote_revision: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResult {
    pub node_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub message: Option<StatusMessage>,
    #[serde(flatten)]
    pub revision: RevisionInfo,
    pub remote_configured: bool,
}

/// POST /api/sync/push - Push the collection to the remote store now.
pub async fn push(State(state): State<AppState>) -> ApiResult<PushResult> {
    let revision_id = state.store.revision().await;

    match state.store.push_remote().await {
        Ok(remote_revision) => success(PushResult { remote_revision }, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/sync/pull - Replace the collection with the remote document.
pub async fn pull(State(state): State<AppState>) -> ApiResult<PullResult> {
    let revision_id = state.store.revision().await;

    match state.store.pull_remote().await {
        Ok(node_count) => success(PullResult { node_count }, state.store.revision().await),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/status - Current status message and revision.
pub async fn get_status(State(state): State<AppState>) -> ApiResult<StatusInfo> {
    let revision = state.store.revision_info().await;
    let revision_id = revision.revision_id;
    let persistence = state.store.persistence();

    success(
        StatusInfo {
            message: persistence.status().current().await,
            revision,
            remote_configured: persistence.remote_configured(),
        },
        revision_id,
    )
}
