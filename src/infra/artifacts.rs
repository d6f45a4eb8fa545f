//! Rendered images kept as temporary PNG files.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use crate::application::artifacts::{ArtifactError, ArtifactHandle, ArtifactStore, HandleId};
use crate::application::lock::mutex_lock;

const SOURCE: &str = "infra::artifacts";

/// Each acquired handle owns one file under `directory`; releasing the handle
/// deletes it. Files still held when the store is dropped are deleted too.
#[derive(Debug)]
pub struct TempFileArtifacts {
    directory: PathBuf,
    next_id: AtomicU64,
    files: Mutex<HashMap<HandleId, NamedTempFile>>,
}

impl TempFileArtifacts {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            next_id: AtomicU64::new(0),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of files currently held.
    pub fn live(&self) -> usize {
        mutex_lock(&self.files, SOURCE, "live").len()
    }
}

impl ArtifactStore for TempFileArtifacts {
    fn acquire(&self, bytes: Bytes) -> Result<ArtifactHandle, ArtifactError> {
        std::fs::create_dir_all(&self.directory)?;
        let mut file = Builder::new()
            .prefix("preview-")
            .suffix(".png")
            .tempfile_in(&self.directory)?;
        file.write_all(&bytes)?;
        file.flush()?;

        let id = HandleId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let handle = ArtifactHandle::new(id, file.path().display().to_string(), bytes.len());
        debug!(handle_id = %id, path = %handle.location(), "artifact written");

        mutex_lock(&self.files, SOURCE, "acquire").insert(id, file);
        Ok(handle)
    }

    fn release(&self, handle: ArtifactHandle) {
        let removed = mutex_lock(&self.files, SOURCE, "release").remove(&handle.id());
        match removed {
            Some(file) => {
                if let Err(err) = file.close() {
                    warn!(handle_id = %handle.id(), error = %err, "failed to delete artifact file");
                }
            }
            None => warn!(handle_id = %handle.id(), "release of unknown artifact handle"),
        }
    }
}
