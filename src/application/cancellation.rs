//! Explicit cancellation tokens for render requests.
//!
//! A token carries a stale flag and the abort callbacks registered by whoever
//! performs the request. Cancelling never blocks: it flips the flag, runs the
//! callbacks once, and leaves the settling side to notice.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::lock::mutex_lock;

const SOURCE: &str = "application::cancellation";

/// Identifies one render request within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type AbortCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    id: RequestId,
    stale: AtomicBool,
    callbacks: Mutex<Vec<AbortCallback>>,
}

impl CancellationToken {
    pub fn new(id: RequestId) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                id,
                stale: AtomicBool::new(false),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> RequestId {
        self.inner.id
    }

    pub fn is_stale(&self) -> bool {
        self.inner.stale.load(Ordering::Acquire)
    }

    /// Register `callback` to run on cancellation. Runs it right away when the
    /// token is already stale.
    pub fn on_abort(&self, callback: impl FnOnce() + Send + 'static) {
        {
            let mut callbacks = mutex_lock(&self.inner.callbacks, SOURCE, "on_abort");
            if !self.is_stale() {
                callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Mark the token stale and run its abort callbacks. Idempotent.
    pub fn cancel(&self) {
        let callbacks = {
            let mut callbacks = mutex_lock(&self.inner.callbacks, SOURCE, "cancel");
            if self.inner.stale.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let (tx, rx) = oneshot::channel::<()>();
        self.on_abort(move || {
            let _ = tx.send(());
        });
        if rx.await.is_err() {
            // The sender only disappears with the token itself.
            std::future::pending::<()>().await;
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("id", &self.inner.id)
            .field("stale", &self.is_stale())
            .finish()
    }
}
