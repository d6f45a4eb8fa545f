//! The preview state machine.
//!
//! Every edit is persisted, marks the display stale and refreshes the
//! shareable link synchronously; only the render request goes through the
//! debouncer. Settlements arrive from the coordinator and move the machine
//! between `Pending`, `Success` and `Error`.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};
use url::Url;

use crate::domain::diagnostic::extract_diagnostic;
use crate::domain::document::seed_document;
use crate::domain::link::LinkBuilder;
use crate::domain::outcome::{PreviewState, RenderOutcome};

use super::artifacts::ArtifactSlot;
use super::coordinator::{RequestCoordinator, Settlement};
use super::debounce::{Debounced, Debouncer};
use super::persistence::PersistenceAdapter;
use super::view::PreviewView;

pub struct PreviewController {
    state: PreviewState,
    debouncer: Debouncer<String>,
    coordinator: RequestCoordinator,
    artifacts: ArtifactSlot,
    persistence: Arc<dyn PersistenceAdapter>,
    links: LinkBuilder,
    link: Option<Url>,
    view: Box<dyn PreviewView>,
}

impl PreviewController {
    pub fn new(
        debouncer: Debouncer<String>,
        coordinator: RequestCoordinator,
        artifacts: ArtifactSlot,
        persistence: Arc<dyn PersistenceAdapter>,
        links: LinkBuilder,
        view: Box<dyn PreviewView>,
    ) -> Self {
        Self {
            state: PreviewState::Idle,
            debouncer,
            coordinator,
            artifacts,
            persistence,
            links,
            link: None,
            view,
        }
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn link(&self) -> Option<&Url> {
        self.link.as_ref()
    }

    pub fn artifacts(&self) -> &ArtifactSlot {
        &self.artifacts
    }

    /// The document to open with: the persisted content, or the default
    /// document when nothing usable was persisted.
    pub fn initial_document(&self) -> String {
        let persisted = match self.persistence.get() {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "failed to read persisted content; using default document");
                None
            }
        };
        seed_document(persisted)
    }

    /// Render `text` right away, skipping the debounce window.
    pub fn start(&mut self, text: String) {
        self.observe(&text);
        self.debouncer.cancel();
        self.coordinator.submit(text);
    }

    /// Handle a change of the document to `text`.
    pub fn edited(&mut self, text: String) {
        self.observe(&text);
        self.debouncer.call(text);
    }

    /// A debounce window elapsed. Windows restarted or cancelled after their
    /// timer fired are ignored.
    pub fn render_due(&mut self, due: Debounced<String>) {
        if !self.debouncer.settle(due.generation) {
            debug!(generation = due.generation, "dropping render for a superseded edit");
            return;
        }
        self.coordinator.submit(due.value);
    }

    pub fn settled(&mut self, settlement: Settlement) {
        match self.coordinator.settle(settlement) {
            RenderOutcome::Cancelled => {}
            RenderOutcome::Succeeded(bytes) => self.succeed(bytes),
            RenderOutcome::Failed(raw) => self.fail(&raw),
        }
    }

    /// Stop timers, abort the outstanding request and release the artifact.
    pub fn shutdown(&mut self) {
        self.debouncer.cancel();
        self.coordinator.cancel();
        self.artifacts.clear();
        debug!(state = self.state.label(), "preview controller shut down");
    }

    fn observe(&mut self, text: &str) {
        if let Err(err) = self.persistence.set(text) {
            warn!(error = %err, "failed to persist edited content");
        }
        self.state = PreviewState::Pending;
        self.view.mark_stale();
        self.link = self.links.build(text);
        self.view.show_link(self.link.as_ref());
    }

    fn succeed(&mut self, bytes: Bytes) {
        let view = &mut self.view;
        match self
            .artifacts
            .install(bytes, |handle| view.show_artifact(handle))
        {
            Ok(_) => self.state = PreviewState::Success,
            Err(err) => self.fail(&err.to_string()),
        }
    }

    fn fail(&mut self, raw: &str) {
        self.artifacts.clear();
        let message = extract_diagnostic(raw);
        self.view.show_error(&message);
        self.state = PreviewState::Error(message);
    }
}
