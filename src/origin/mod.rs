//! Client for the canonical tree document served by the origin host.
//!
//! GET returns the document; PUT overwrites it. Many hosts are static and
//! reject the PUT, which callers treat as a routine outcome.

use reqwest::{header, Client};

use crate::errors::AppError;
use crate::models::{parse_document, Node};

#[derive(Clone)]
pub struct OriginClient {
    http: Client,
    document_url: String,
}

impl OriginClient {
    pub fn new(http: Client, document_url: impl Into<String>) -> Self {
        Self {
            http,
            document_url: document_url.into(),
        }
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    /// Fetch and parse the canonical document, bypassing caches.
    pub async fn fetch_document(&self) -> Result<Vec<Node>, AppError> {
        let response = self
            .http
            .get(&self.document_url)
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        parse_document(&body)
    }

    /// Overwrite the canonical document.
    pub async fn put_document(&self, document: &str) -> Result<(), AppError> {
        let response = self
            .http
            .put(&self.document_url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(document.to_string())
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
        Ok(())
    }
}
