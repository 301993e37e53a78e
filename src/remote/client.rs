//! Chat backends
//!
//! [`ChatBackend`] is the seam between the pipeline and the network, so the
//! conversation logic can be driven by scripted backends in tests.

use crate::remote::types::{ChatRequest, ChatResponse};
use crate::{ChatlineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Perform one request/response cycle against the remote model
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Backend speaking JSON over HTTP to the configured chat endpoint.
///
/// Every call is a fresh network round trip; response caching in front of the
/// endpoint is never relied upon.
pub struct HttpChatBackend {
    client: Client,
    endpoint_url: String,
}

impl HttpChatBackend {
    pub fn new(endpoint_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("chatline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatlineError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint_url: endpoint_url.into(),
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(
            "POST {} (history: {} exchanges, voice: {})",
            self.endpoint_url,
            request.conversation_history.len(),
            request.use_voice
        );

        let response = self
            .client
            .post(&self.endpoint_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatlineError::RequestError(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ChatlineError::DecodeError(format!("Invalid chat response: {e}")))
    }
}
