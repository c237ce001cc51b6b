//! Transient status messages.
//!
//! A message stays visible for a fixed time and is then cleared, unless a newer
//! message replaced it in the meantime.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub text: String,
    pub shown_at: String,
}

#[derive(Default)]
struct StatusState {
    generation: u64,
    message: Option<StatusMessage>,
}

pub struct StatusBoard {
    ttl: Duration,
    state: Arc<RwLock<StatusState>>,
}

impl StatusBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Arc::new(RwLock::new(StatusState::default())),
        }
    }

    /// Show `text`, replacing any current message.
    pub async fn show(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(status = %text, "Status");

        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.message = Some(StatusMessage {
                text,
                shown_at: Utc::now().to_rfc3339(),
            });
            state.generation
        };

        let state = Arc::clone(&self.state);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut state = state.write().await;
            if state.generation == generation {
                state.message = None;
            }
        });
    }

    pub async fn current(&self) -> Option<StatusMessage> {
        self.state.read().await.message.clone()
    }
}
