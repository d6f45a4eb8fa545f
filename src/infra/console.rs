//! Terminal rendition of the preview surface.

use std::path::PathBuf;

use tracing::{debug, info, warn};
use url::Url;

use crate::application::artifacts::ArtifactHandle;
use crate::application::view::PreviewView;

/// Prints what the preview shows and optionally mirrors the displayed image
/// to a fixed path.
#[derive(Debug, Default)]
pub struct ConsoleView {
    output: Option<PathBuf>,
    last_link: Option<Option<String>>,
}

impl ConsoleView {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self {
            output,
            last_link: None,
        }
    }
}

impl PreviewView for ConsoleView {
    fn mark_stale(&mut self) {
        debug!("preview is stale");
    }

    fn show_artifact(&mut self, artifact: &ArtifactHandle) {
        info!(handle_id = %artifact.id(), bytes = artifact.size(), "preview updated");
        match &self.output {
            Some(output) => match std::fs::copy(artifact.location(), output) {
                Ok(_) => println!("rendered {} ({} bytes)", output.display(), artifact.size()),
                Err(err) => warn!(
                    path = %output.display(),
                    error = %err,
                    "failed to copy rendered image"
                ),
            },
            None => println!("rendered {} ({} bytes)", artifact.location(), artifact.size()),
        }
    }

    fn show_error(&mut self, message: &str) {
        println!("error: {message}");
    }

    fn show_link(&mut self, link: Option<&Url>) {
        let link = link.map(|url| url.as_str().to_string());
        if self.last_link.as_ref() == Some(&link) {
            return;
        }
        match &link {
            Some(url) => println!("link: {url}"),
            None => println!("link: unavailable, document too long"),
        }
        self.last_link = Some(link);
    }
}
