//! Lifetime management for the displayed render artifact.
//!
//! Stores hand out [`ArtifactHandle`]s, which are not `Clone` and are
//! consumed by [`ArtifactStore::release`], so a handle can only be released
//! once. [`ArtifactSlot`] keeps at most one handle installed and releases the
//! previous one only after its replacement has been shown.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

use super::lock::mutex_lock;

const SOURCE: &str = "application::artifacts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

impl HandleId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque, revocable reference to a rendered image.
#[derive(Debug, PartialEq, Eq)]
pub struct ArtifactHandle {
    id: HandleId,
    location: String,
    size: usize,
}

impl ArtifactHandle {
    pub fn new(id: HandleId, location: impl Into<String>, size: usize) -> Self {
        Self {
            id,
            location: location.into(),
            size,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Where the artifact can be read from: a file path or a store-specific URI.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to store rendered artifact: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ArtifactStore: Send + Sync {
    fn acquire(&self, bytes: Bytes) -> Result<ArtifactHandle, ArtifactError>;
    fn release(&self, handle: ArtifactHandle);
}

/// Holds the single installed artifact.
pub struct ArtifactSlot {
    store: Arc<dyn ArtifactStore>,
    current: Option<ArtifactHandle>,
}

impl ArtifactSlot {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&ArtifactHandle> {
        self.current.as_ref()
    }

    /// Acquire a handle for `bytes`, pass it to `assign`, then release the
    /// handle it replaces.
    pub fn install(
        &mut self,
        bytes: Bytes,
        assign: impl FnOnce(&ArtifactHandle),
    ) -> Result<HandleId, ArtifactError> {
        let handle = self.store.acquire(bytes)?;
        let id = handle.id();
        assign(&handle);
        if let Some(previous) = self.current.replace(handle) {
            self.store.release(previous);
        }
        Ok(id)
    }

    /// Release the installed handle, if any.
    pub fn clear(&mut self) {
        if let Some(handle) = self.current.take() {
            self.store.release(handle);
        }
    }
}

impl Drop for ArtifactSlot {
    fn drop(&mut self) {
        self.clear();
    }
}

/// In-memory store that keeps every live artifact's bytes and counts
/// acquisitions and releases.
#[derive(Default)]
pub struct MemoryArtifacts {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    live: HashMap<HandleId, Bytes>,
    released: u64,
}

impl MemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "live").live.len()
    }

    pub fn acquired(&self) -> u64 {
        mutex_lock(&self.state, SOURCE, "acquired").next_id
    }

    pub fn released(&self) -> u64 {
        mutex_lock(&self.state, SOURCE, "released").released
    }

    pub fn bytes(&self, id: HandleId) -> Option<Bytes> {
        mutex_lock(&self.state, SOURCE, "bytes").live.get(&id).cloned()
    }
}

impl ArtifactStore for MemoryArtifacts {
    fn acquire(&self, bytes: Bytes) -> Result<ArtifactHandle, ArtifactError> {
        let mut state = mutex_lock(&self.state, SOURCE, "acquire");
        state.next_id += 1;
        let id = HandleId::new(state.next_id);
        let size = bytes.len();
        state.live.insert(id, bytes);
        Ok(ArtifactHandle::new(id, format!("memory://artifact/{id}"), size))
    }

    fn release(&self, handle: ArtifactHandle) {
        let mut state = mutex_lock(&self.state, SOURCE, "release");
        if state.live.remove(&handle.id()).is_none() {
            warn!(handle_id = %handle.id(), "release of unknown artifact handle");
            return;
        }
        state.released += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    impl ArtifactStore for FailingStore {
        fn acquire(&self, _bytes: Bytes) -> Result<ArtifactHandle, ArtifactError> {
            Err(std::io::Error::other("disk full").into())
        }

        fn release(&self, _handle: ArtifactHandle) {
            panic!("nothing was acquired");
        }
    }

    #[test]
    fn n_installs_release_n_minus_one() {
        let store = Arc::new(MemoryArtifacts::new());
        let mut slot = ArtifactSlot::new(store.clone());

        for n in 1..=5u64 {
            slot.install(Bytes::from(vec![n as u8]), |_| {})
                .expect("install");
            assert_eq!(store.live(), 1);
            assert_eq!(store.released(), n - 1);
        }
        assert_eq!(store.acquired(), 5);
    }

    #[test]
    fn previous_handle_is_still_live_while_new_one_is_assigned() {
        let store = Arc::new(MemoryArtifacts::new());
        let mut slot = ArtifactSlot::new(store.clone());
        slot.install(Bytes::from_static(b"first"), |_| {})
            .expect("install");

        let probe = store.clone();
        slot.install(Bytes::from_static(b"second"), |handle| {
            assert_eq!(probe.live(), 2);
            assert_eq!(
                probe.bytes(handle.id()),
                Some(Bytes::from_static(b"second"))
            );
        })
        .expect("install");

        assert_eq!(store.live(), 1);
        let current = slot.current().expect("installed handle");
        assert_eq!(store.bytes(current.id()), Some(Bytes::from_static(b"second")));
    }

    #[test]
    fn clear_releases_and_is_idempotent() {
        let store = Arc::new(MemoryArtifacts::new());
        let mut slot = ArtifactSlot::new(store.clone());
        slot.install(Bytes::from_static(b"png"), |_| {})
            .expect("install");

        slot.clear();
        slot.clear();

        assert!(slot.current().is_none());
        assert_eq!(store.live(), 0);
        assert_eq!(store.released(), 1);
    }

    #[test]
    fn dropping_the_slot_releases_its_handle() {
        let store = Arc::new(MemoryArtifacts::new());
        {
            let mut slot = ArtifactSlot::new(store.clone());
            slot.install(Bytes::from_static(b"png"), |_| {})
                .expect("install");
        }
        assert_eq!(store.live(), 0);
        assert_eq!(store.released(), 1);
    }

    #[test]
    fn failed_acquire_keeps_the_current_handle() {
        let mut slot = ArtifactSlot::new(Arc::new(FailingStore));
        let mut assigned = false;
        let result = slot.install(Bytes::from_static(b"png"), |_| assigned = true);

        assert!(matches!(result, Err(ArtifactError::Io(_))));
        assert!(!assigned);
        assert!(slot.current().is_none());
    }
}
