//! Test doubles shared by the engine's unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, oneshot};

use super::cancellation::CancellationToken;
use super::transport::{RenderResponse, RenderTransport, TransportError};

type Reply = Result<RenderResponse, TransportError>;

struct ScriptedCall {
    content: String,
    token: CancellationToken,
    reply: Option<oneshot::Sender<Reply>>,
}

/// Transport whose responses are released by the test, in any order.
///
/// Calls deliberately ignore their cancellation token so a superseded request
/// can still complete, the way a response already on the wire would.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    calls: Arc<Mutex<Vec<ScriptedCall>>>,
    arrived: Arc<Notify>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contents(&self) -> Vec<String> {
        let calls = self.calls.lock().expect("calls lock");
        calls.iter().map(|call| call.content.clone()).collect()
    }

    pub(crate) fn tokens(&self) -> Vec<CancellationToken> {
        let calls = self.calls.lock().expect("calls lock");
        calls.iter().map(|call| call.token.clone()).collect()
    }

    pub(crate) async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let arrived = self.arrived.notified();
                if self.calls.lock().expect("calls lock").len() >= count {
                    return;
                }
                arrived.await;
            }
        })
        .await
        .expect("transport calls arrive");
    }

    /// Release the oldest pending call carrying `content`.
    pub(crate) fn resolve(&self, content: &str, reply: Reply) {
        let sender = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls
                .iter_mut()
                .find(|call| call.content == content && call.reply.is_some())
                .and_then(|call| call.reply.take())
                .expect("pending call with this content")
        };
        let _ = sender.send(reply);
    }
}

#[async_trait]
impl RenderTransport for ScriptedTransport {
    async fn render(
        &self,
        content: String,
        token: CancellationToken,
    ) -> Result<RenderResponse, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().expect("calls lock").push(ScriptedCall {
            content,
            token,
            reply: Some(tx),
        });
        self.arrived.notify_waiters();
        rx.await.unwrap_or(Err(TransportError::Cancelled))
    }
}
