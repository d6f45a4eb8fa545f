//! Persistence of the last edited document.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use super::lock::mutex_lock;

const SOURCE: &str = "application::persistence";

/// Key the document is stored under.
pub const CONTENT_KEY: &str = "content";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persisted content is not valid UTF-8")]
    Encoding,
}

/// Single string slot holding the last edited document.
pub trait PersistenceAdapter: Send + Sync {
    fn get(&self) -> Result<Option<String>, PersistenceError>;
    fn set(&self, value: &str) -> Result<(), PersistenceError>;
}

/// In-memory adapter that also counts writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(content.into())),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PersistenceAdapter for MemoryStore {
    fn get(&self) -> Result<Option<String>, PersistenceError> {
        Ok(mutex_lock(&self.slot, SOURCE, "get").clone())
    }

    fn set(&self, value: &str) -> Result<(), PersistenceError> {
        *mutex_lock(&self.slot, SOURCE, "set") = Some(value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_counts() {
        let store = MemoryStore::new();
        assert_eq!(store.get().expect("get"), None);

        store.set("\\( a \\)").expect("set");
        store.set("\\( ab \\)").expect("set");

        assert_eq!(store.get().expect("get").as_deref(), Some("\\( ab \\)"));
        assert_eq!(store.writes(), 2);
    }
}
