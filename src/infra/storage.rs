//! On-disk persistence of the last edited document.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::application::persistence::{CONTENT_KEY, PersistenceAdapter, PersistenceError};

/// Keeps the document in `{directory}/content`, replacing it atomically on
/// every write.
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
    path: PathBuf,
}

impl FileStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let path = directory.join(CONTENT_KEY);
        Self { directory, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceAdapter for FileStore {
    fn get(&self) -> Result<Option<String>, PersistenceError> {
        match fs::read(&self.path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| PersistenceError::Encoding),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, value: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.directory)?;
        let mut staged = NamedTempFile::new_in(&self.directory)?;
        staged.write_all(value.as_bytes())?;
        staged.as_file().sync_data()?;
        staged.persist(&self.path).map_err(|err| err.error)?;
        debug!(path = %self.path.display(), bytes = value.len(), "persisted document");
        Ok(())
    }
}
