//! The display surface the controller drives.

use std::sync::{Arc, Mutex};

use url::Url;

use super::artifacts::ArtifactHandle;
use super::lock::mutex_lock;

const SOURCE: &str = "application::view";

pub trait PreviewView: Send {
    /// Whatever is shown no longer matches the document.
    fn mark_stale(&mut self);
    /// Show `artifact`, hiding any error.
    fn show_artifact(&mut self, artifact: &ArtifactHandle);
    /// Show `message`, hiding the artifact.
    fn show_error(&mut self, message: &str);
    /// Offer `link`, or withdraw the link when `None`.
    fn show_link(&mut self, link: Option<&Url>);
}

/// Everything a [`RecordingView`] was asked to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Stale,
    Artifact { location: String, size: usize },
    Error(String),
    Link(Option<String>),
}

/// View that records calls for later inspection; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    events: Arc<Mutex<Vec<ViewEvent>>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        mutex_lock(&self.events, SOURCE, "events").clone()
    }

    pub fn last_artifact(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            ViewEvent::Artifact { location, .. } => Some(location),
            _ => None,
        })
    }

    pub fn last_error(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|event| match event {
            ViewEvent::Error(message) => Some(message),
            _ => None,
        })
    }

    pub fn last_link(&self) -> Option<Option<String>> {
        self.events().into_iter().rev().find_map(|event| match event {
            ViewEvent::Link(link) => Some(link),
            _ => None,
        })
    }

    fn push(&self, event: ViewEvent) {
        mutex_lock(&self.events, SOURCE, "push").push(event);
    }
}

impl PreviewView for RecordingView {
    fn mark_stale(&mut self) {
        self.push(ViewEvent::Stale);
    }

    fn show_artifact(&mut self, artifact: &ArtifactHandle) {
        self.push(ViewEvent::Artifact {
            location: artifact.location().to_string(),
            size: artifact.size(),
        });
    }

    fn show_error(&mut self, message: &str) {
        self.push(ViewEvent::Error(message.to_string()));
    }

    fn show_link(&mut self, link: Option<&Url>) {
        self.push(ViewEvent::Link(link.map(|url| url.as_str().to_string())));
    }
}
