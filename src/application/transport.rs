//! Seam between the engine and the remote rendering service.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

use super::cancellation::CancellationToken;

/// A fully read response from the rendering service.
#[derive(Debug, Clone)]
pub struct RenderResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RenderResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request was aborted through its cancellation token.
    #[error("render request aborted")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

impl TransportError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[async_trait]
pub trait RenderTransport: Send + Sync {
    /// Send `content` to the service and read the whole response body.
    ///
    /// Implementations should stop work and return
    /// [`TransportError::Cancelled`] once `token` is cancelled.
    async fn render(
        &self,
        content: String,
        token: CancellationToken,
    ) -> Result<RenderResponse, TransportError>;
}
