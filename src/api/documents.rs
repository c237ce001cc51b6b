//! Document export/import endpoints.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::errors::AppErrorWithRevision;
use crate::models::DOCUMENT_FILE_NAME;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub node_count: usize,
}

/// GET /api/export - Download the collection as a JSON document.
pub async fn export_document(State(state): State<AppState>) -> Response {
    let revision_id = state.store.revision().await;

    match state.store.export_document().await {
        Ok(document) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", DOCUMENT_FILE_NAME),
                ),
            ],
            document,
        )
            .into_response(),
        Err(e) => AppErrorWithRevision {
            error: e,
            revision_id,
        }
        .into_response(),
    }
}

/// POST /api/import - Replace the collection with an uploaded document.
pub async fn import_document(State(state): State<AppState>, body: String) -> ApiResult<ImportResult> {
    let revision_id = state.store.revision().await;

    match state.store.import_document(&body).await {
        Ok(node_count) => success(ImportResult { node_count }, state.store.revision().await),
        Err(e) => {
            tracing::warn!("Rejected import: {}", e);
            state.store.persistence().status().show("Invalid JSON").await;
            error(e, revision_id)
        }
    }
}
