//! HTTP transport for the rendering service.

use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};
use tracing::debug;

use crate::application::cancellation::CancellationToken;
use crate::application::transport::{RenderResponse, RenderTransport, TransportError};

use super::error::InfraError;

const RENDER_ENDPOINT: &str = "/render";

/// Posts documents to `{base}/render` and reads the whole response.
#[derive(Clone, Debug)]
pub struct HttpRenderTransport {
    client: Client,
    endpoint: Url,
}

impl HttpRenderTransport {
    pub fn new(base: &Url) -> Result<Self, InfraError> {
        let endpoint = base
            .join(RENDER_ENDPOINT)
            .map_err(|err| InfraError::endpoint(base.as_str(), err))?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(InfraError::HttpClient)?;
        Ok(Self { client, endpoint })
    }

    pub fn user_agent() -> &'static str {
        concat!("texflag/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send(&self, content: String) -> Result<RenderResponse, reqwest::Error> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(content)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(RenderResponse::new(status, body))
    }
}

#[async_trait]
impl RenderTransport for HttpRenderTransport {
    async fn render(
        &self,
        content: String,
        token: CancellationToken,
    ) -> Result<RenderResponse, TransportError> {
        if token.is_stale() {
            return Err(TransportError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(request_id = %token.id(), "render request aborted in flight");
                Err(TransportError::Cancelled)
            }
            result = self.send(content) => {
                result.map_err(|err| TransportError::failed(err.to_string()))
            }
        }
    }
}
