//! Session-based authentication module.
//!
//! Logins are checked against a credentials file fetched from the origin host
//! on every attempt. A successful login yields a bearer token that expires after
//! a period of inactivity. Credential and token checks use constant-time
//! comparison to mitigate timing attacks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{codes, AppError, ErrorDetails, ErrorResponse};

#[derive(Debug, Clone, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Contents of the credentials file: one entry or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CredentialsFile {
    Single(Credential),
    Many(Vec<Credential>),
}

impl CredentialsFile {
    fn entries(&self) -> &[Credential] {
        match self {
            CredentialsFile::Single(credential) => std::slice::from_ref(credential),
            CredentialsFile::Many(credentials) => credentials,
        }
    }

    /// Whether any entry matches. Every entry is compared so timing does not
    /// reveal which one matched.
    pub fn accepts(&self, username: &str, password: &str) -> bool {
        self.entries().iter().fold(false, |found, c| {
            let matches = constant_time_compare(&c.username, username)
                & constant_time_compare(&c.password, password);
            found | matches
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub struct SessionManager {
    credentials_url: Option<String>,
    http: Client,
    idle: Duration,
    sessions: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionManager {
    pub fn new(credentials_url: Option<String>, http: Client, idle: Duration) -> Self {
        Self {
            credentials_url,
            http,
            idle,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Authentication is enforced only when a credentials file is configured.
    pub fn enabled(&self) -> bool {
        self.credentials_url.is_some()
    }

    async fn fetch_credentials(&self, url: &str) -> Result<CredentialsFile, AppError> {
        let response = self
            .http
            .get(url)
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    fn is_idle(&self, last_seen: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - last_seen)
            .to_std()
            .map(|elapsed| elapsed > self.idle)
            .unwrap_or(false)
    }

    /// Drop every session that has been idle longer than the timeout.
    fn prune_idle(&self, sessions: &mut HashMap<String, DateTime<Utc>>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, last_seen| !self.is_idle(*last_seen, now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} idle sessions", pruned);
        }
    }

    /// Check the credentials and open a session. Returns the session token.
    pub async fn login(&self, request: &LoginRequest) -> Result<String, AppError> {
        let Some(url) = &self.credentials_url else {
            return Err(AppError::NotConfigured(
                "No credentials file configured".to_string(),
            ));
        };

        let credentials = self.fetch_credentials(url).await.map_err(|e| {
            tracing::warn!("Could not read credentials file: {}", e);
            e
        })?;

        if !credentials.accepts(request.username.trim(), &request.password) {
            tracing::info!("Rejected login for {}", request.username.trim());
            return Err(AppError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }

        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        self.prune_idle(&mut sessions, now);
        sessions.insert(token.clone(), now);
        drop(sessions);
        tracing::info!("Opened session for {}", request.username.trim());
        Ok(token)
    }

    /// Drop a session. Returns whether it existed.
    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Check a token and refresh its last-seen time. Idle sessions are dropped.
    pub async fn validate(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();

        let Some(key) = sessions
            .keys()
            .find(|known| constant_time_compare(known, token))
            .cloned()
        else {
            return false;
        };

        let last_seen = sessions.get(&key).copied().unwrap_or(now);
        if self.is_idle(last_seen, now) {
            sessions.remove(&key);
            tracing::info!("Session expired after inactivity");
            return false;
        }

        sessions.insert(key, now);
        true
    }
}

/// Bearer token from the Authorization header.
pub fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
}

/// Session authentication layer function that takes the session manager as a parameter.
pub async fn session_auth_layer(
    sessions: Arc<SessionManager>,
    request: Request,
    next: Next,
) -> Response {
    // No credentials file means authentication is off (dev mode)
    if !sessions.enabled() {
        return next.run(request).await;
    }

    match bearer_token(&request) {
        Some(token) if sessions.validate(&token).await => next.run(request).await,
        Some(_) => unauthorized_response("Session expired or invalid"),
        None => unauthorized_response("Missing session token"),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: codes::UNAUTHORIZED.to_string(),
            message: message.to_string(),
            details: None,
        },
        revision_id: 0,
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
