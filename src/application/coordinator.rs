//! Single-flight coordination of render requests.
//!
//! The coordinator owns the one live [`CancellationToken`]. Submitting a new
//! request cancels the previous one, and a settlement is only applied when it
//! belongs to the live request; anything else is reported as
//! [`RenderOutcome::Cancelled`]. Results are therefore applied in the order
//! requests were issued, however the network orders their completion.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{debug, info};

use crate::domain::outcome::RenderOutcome;

use super::cancellation::{CancellationToken, RequestId};
use super::transport::{RenderResponse, RenderTransport, TransportError};

pub const METRIC_RENDER_REQUESTS: &str = "texflag_render_requests_total";
pub const METRIC_RENDER_SUPERSEDED: &str = "texflag_render_superseded_total";
pub const METRIC_RENDER_FAILURES: &str = "texflag_render_failures_total";
pub const METRIC_RENDER_MS: &str = "texflag_render_ms";

/// A request that finished, one way or another, on its transport task.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub request: RequestId,
    pub outcome: RenderOutcome,
    pub elapsed: Duration,
}

pub type SettleCallback = Arc<dyn Fn(Settlement) + Send + Sync>;

pub struct RequestCoordinator {
    transport: Arc<dyn RenderTransport>,
    on_settled: SettleCallback,
    live: Option<CancellationToken>,
    last_issued: RequestId,
}

impl RequestCoordinator {
    /// `on_settled` receives every settlement, stale ones included; feed them
    /// back through [`RequestCoordinator::settle`] on the owning event loop.
    pub fn new(
        transport: Arc<dyn RenderTransport>,
        on_settled: impl Fn(Settlement) + Send + Sync + 'static,
    ) -> Self {
        Self {
            transport,
            on_settled: Arc::new(on_settled),
            live: None,
            last_issued: RequestId::default(),
        }
    }

    pub fn live_request(&self) -> Option<RequestId> {
        self.live.as_ref().map(CancellationToken::id)
    }

    pub fn is_outstanding(&self) -> bool {
        self.live.is_some()
    }

    /// Supersede any outstanding request and issue a new one for `content`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&mut self, content: String) -> RequestId {
        if let Some(previous) = self.abort() {
            counter!(METRIC_RENDER_SUPERSEDED).increment(1);
            debug!(request_id = %previous, "superseded outstanding render request");
        }

        let id = self.last_issued.next();
        self.last_issued = id;
        let token = CancellationToken::new(id);
        self.live = Some(token.clone());

        counter!(METRIC_RENDER_REQUESTS).increment(1);
        info!(request_id = %id, bytes = content.len(), "render request submitted");

        let transport = Arc::clone(&self.transport);
        let on_settled = Arc::clone(&self.on_settled);
        tokio::spawn(async move {
            let started = Instant::now();
            let result = transport.render(content, token).await;
            on_settled(Settlement {
                request: id,
                outcome: classify(result),
                elapsed: started.elapsed(),
            });
        });

        id
    }

    /// Resolve a settlement against the live request.
    pub fn settle(&mut self, settlement: Settlement) -> RenderOutcome {
        let Settlement {
            request,
            outcome,
            elapsed,
        } = settlement;

        if self.live_request() != Some(request) {
            debug!(
                request_id = %request,
                live = ?self.live_request(),
                "discarding settlement of superseded request"
            );
            return RenderOutcome::Cancelled;
        }
        self.live = None;

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        match &outcome {
            RenderOutcome::Succeeded(bytes) => {
                histogram!(METRIC_RENDER_MS).record(elapsed_ms);
                info!(request_id = %request, bytes = bytes.len(), elapsed_ms, "render succeeded");
            }
            RenderOutcome::Failed(message) => {
                histogram!(METRIC_RENDER_MS).record(elapsed_ms);
                counter!(METRIC_RENDER_FAILURES).increment(1);
                info!(request_id = %request, bytes = message.len(), elapsed_ms, "render failed");
            }
            RenderOutcome::Cancelled => {
                debug!(request_id = %request, "live render request was aborted");
            }
        }

        outcome
    }

    /// Abort the outstanding request, if any, without replacing it.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.abort() {
            debug!(request_id = %previous, "cancelled outstanding render request");
        }
    }

    fn abort(&mut self) -> Option<RequestId> {
        let previous = self.live.take()?;
        previous.cancel();
        Some(previous.id())
    }
}

/// Map a transport result onto the outcome the preview acts on.
pub fn classify(result: Result<RenderResponse, TransportError>) -> RenderOutcome {
    match result {
        Ok(response) if response.status.is_success() => RenderOutcome::Succeeded(response.body),
        Ok(response) => {
            RenderOutcome::Failed(String::from_utf8_lossy(&response.body).into_owned())
        }
        Err(TransportError::Cancelled) => RenderOutcome::Cancelled,
        Err(TransportError::Failed(message)) => RenderOutcome::Failed(message),
    }
}
