//! A source file standing in for the editing widget.
//!
//! The file is polled; whenever its text differs from what was last seen the
//! full new text is posted to the session as an edit.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::application::session::SessionHandle;

use super::error::InfraError;

#[derive(Debug)]
pub struct FileEditor {
    path: PathBuf,
    poll_interval: Duration,
    last_seen: String,
}

impl FileEditor {
    /// Open `path`, seeding it with `seed` when it is missing or empty.
    /// Returns the editor together with the document it starts from.
    pub async fn open(
        path: impl Into<PathBuf>,
        seed: &str,
        poll_interval: Duration,
    ) -> Result<(Self, String), InfraError> {
        let path = path.into();
        let current = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(InfraError::file(&path, err)),
        };

        let document = if current.is_empty() {
            info!(path = %path.display(), "seeding source file");
            tokio::fs::write(&path, seed)
                .await
                .map_err(|err| InfraError::file(&path, err))?;
            seed.to_string()
        } else {
            current
        };

        let editor = Self {
            path,
            poll_interval,
            last_seen: document.clone(),
        };
        Ok((editor, document))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file once, returning its text when it changed.
    pub async fn poll(&mut self) -> Result<Option<String>, InfraError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            // Editors that save by rename briefly leave no file behind.
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "source file missing; waiting");
                return Ok(None);
            }
            Err(err) => return Err(InfraError::file(&self.path, err)),
        };

        if text == self.last_seen {
            return Ok(None);
        }
        self.last_seen.clone_from(&text);
        Ok(Some(text))
    }

    /// Forward changes to `session` until it shuts down.
    pub async fn run(mut self, session: SessionHandle) -> Result<(), InfraError> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let text = match self.poll().await {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "failed to read source file");
                    continue;
                }
            };
            debug!(bytes = text.len(), "source file changed");
            if session.edit(text).is_err() {
                return Ok(());
            }
        }
    }
}
