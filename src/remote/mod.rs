//! Remote version-controlled file store client.
//!
//! A thin wrapper over a GitHub-style contents API. Content travels base64
//! encoded; every file version is identified by a revision marker (`sha`).
//! Updates carry the marker read just before writing, so a concurrent
//! external change makes the write fail instead of being overwritten.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{header, Client, Response, Url};
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::errors::AppError;

const ACCEPT_CONTENTS: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("folder-tree-backend/", env!("CARGO_PKG_VERSION"));

/// Current content of a remote file and its revision marker.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub content: String,
    pub revision: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: PutContentsEntry,
}

#[derive(Debug, Deserialize)]
struct PutContentsEntry {
    sha: String,
}

#[derive(Clone)]
pub struct RemoteSyncClient {
    http: Client,
    api_base: String,
    token: String,
    owner: String,
    repository: String,
    path: String,
}

impl RemoteSyncClient {
    /// Build a client when the remote credentials are fully configured.
    pub fn from_config(http: Client, config: &RemoteConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        Some(Self {
            http,
            api_base: config.api_base.trim().to_string(),
            token: config.token.clone()?.trim().to_string(),
            owner: config.owner.clone()?.trim().to_string(),
            repository: config.repository.clone()?.trim().to_string(),
            path: config.path.trim().to_string(),
        })
    }

    /// Configured document path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn contents_url(&self, path: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| AppError::Internal(format!("Invalid remote API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Remote API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repository.as_str(), "contents"])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    async fn get_contents(&self, path: &str) -> Result<Response, AppError> {
        let url = self.contents_url(path)?;
        Ok(self
            .http
            .get(url)
            .header(header::AUTHORIZATION, format!("token {}", self.token))
            .header(header::ACCEPT, ACCEPT_CONTENTS)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?)
    }

    /// Fetch and decode a file.
    pub async fn get_file(&self, path: &str) -> Result<RemoteFile, AppError> {
        let response = self.get_contents(path).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let contents: ContentsResponse = response.json().await?;
        // The API wraps base64 content at 60 columns
        let packed: String = contents
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = BASE64.decode(packed)?;
        let content = String::from_utf8(bytes)
            .map_err(|e| AppError::BadRequest(format!("Remote file is not UTF-8: {}", e)))?;

        Ok(RemoteFile {
            content,
            revision: contents.sha,
        })
    }

    /// Current revision marker of `path`, or `None` when it does not exist yet.
    async fn current_revision(&self, path: &str) -> Option<String> {
        match self.get_contents(path).await {
            Ok(response) if response.status().is_success() => response
                .json::<ContentsResponse>()
                .await
                .ok()
                .map(|c| c.sha),
            Ok(response) => {
                tracing::debug!(
                    "No revision for remote {} (status {})",
                    path,
                    response.status()
                );
                None
            }
            Err(e) => {
                tracing::debug!("Revision lookup for remote {} failed: {}", path, e);
                None
            }
        }
    }

    /// Create or update `path` and return the new revision marker.
    pub async fn put_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<String, AppError> {
        let sha = self.current_revision(path).await;
        let body = PutContentsRequest {
            message,
            content: BASE64.encode(content.as_bytes()),
            sha,
        };

        let url = self.contents_url(path)?;
        let response = self
            .http
            .put(url)
            .header(header::AUTHORIZATION, format!("token {}", self.token))
            .header(header::ACCEPT, ACCEPT_CONTENTS)
            .header(header::USER_AGENT, USER_AGENT)
            .json(&body)
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

        let updated: PutContentsResponse = response.json().await?;
        tracing::info!("Pushed {} to remote, revision {}", path, updated.content.sha);
        Ok(updated.content.sha)
    }
}
