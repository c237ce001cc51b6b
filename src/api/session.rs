//! Login/logout endpoints.

use axum::{
    extract::{Request, State},
    Json,
};
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::auth::{bearer_token, LoginRequest};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub token: String,
    pub idle_timeout_secs: u64,
}

/// POST /api/session - Log in with a username and password.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<SessionInfo> {
    let revision_id = state.store.revision().await;

    match state.sessions.login(&request).await {
        Ok(token) => success(
            SessionInfo {
                token,
                idle_timeout_secs: state.config.session_idle.as_secs(),
            },
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/session - Save and end the current session.
pub async fn logout(State(state): State<AppState>, request: Request) -> ApiResult<bool> {
    let revision_id = state.store.revision().await;

    let ended = match bearer_token(&request) {
        Some(token) => state.sessions.logout(&token).await,
        None => false,
    };
    if state.sessions.enabled() && !ended {
        return error(
            AppError::Unauthorized("Missing or unknown session token".to_string()),
            revision_id,
        );
    }

    state.store.flush().await;
    success(ended, revision_id)
}
