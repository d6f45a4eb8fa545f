//! The event loop that owns a [`PreviewController`].

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::link::LinkBuilder;
use crate::domain::outcome::PreviewState;

use super::artifacts::{ArtifactSlot, ArtifactStore};
use super::controller::PreviewController;
use super::coordinator::{RequestCoordinator, Settlement};
use super::debounce::{Debounced, Debouncer};
use super::persistence::PersistenceAdapter;
use super::scheduler::Scheduler;
use super::transport::RenderTransport;
use super::view::PreviewView;

#[derive(Debug)]
pub enum PreviewEvent {
    /// The document now reads this text.
    Edited(String),
    /// The debounce window for this text elapsed.
    RenderDue(Debounced<String>),
    Settled(Settlement),
    Shutdown,
}

#[derive(Debug, Clone, Copy, Error)]
#[error("preview session has shut down")]
pub struct SessionClosed;

/// Posts events into a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<PreviewEvent>,
}

impl SessionHandle {
    pub fn edit(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(PreviewEvent::Edited(text.into()))
    }

    pub fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(PreviewEvent::Shutdown)
    }

    fn send(&self, event: PreviewEvent) -> Result<(), SessionClosed> {
        self.tx.send(event).map_err(|_| SessionClosed)
    }
}

/// Collaborators a session is assembled from.
pub struct PreviewServices {
    pub transport: Arc<dyn RenderTransport>,
    pub scheduler: Arc<dyn Scheduler>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub persistence: Arc<dyn PersistenceAdapter>,
    pub links: LinkBuilder,
    pub debounce: Duration,
    pub view: Box<dyn PreviewView>,
}

pub struct PreviewSession {
    controller: PreviewController,
    events: mpsc::UnboundedReceiver<PreviewEvent>,
}

impl PreviewSession {
    pub fn new(services: PreviewServices) -> (Self, SessionHandle) {
        let PreviewServices {
            transport,
            scheduler,
            artifacts,
            persistence,
            links,
            debounce,
            view,
        } = services;

        let (tx, events) = mpsc::unbounded_channel();

        let due = tx.clone();
        let debouncer = Debouncer::new(scheduler, debounce, move |window: Debounced<String>| {
            let _ = due.send(PreviewEvent::RenderDue(window));
        });

        let settled = tx.clone();
        let coordinator = RequestCoordinator::new(transport, move |settlement| {
            let _ = settled.send(PreviewEvent::Settled(settlement));
        });

        let controller = PreviewController::new(
            debouncer,
            coordinator,
            ArtifactSlot::new(artifacts),
            persistence,
            links,
            view,
        );

        (Self { controller, events }, SessionHandle { tx })
    }

    pub fn controller(&self) -> &PreviewController {
        &self.controller
    }

    pub fn state(&self) -> &PreviewState {
        self.controller.state()
    }

    pub fn initial_document(&self) -> String {
        self.controller.initial_document()
    }

    /// Render `text` immediately as the opening document.
    pub fn start(&mut self, text: String) {
        info!(bytes = text.len(), "preview session started");
        self.controller.start(text);
    }

    /// Apply one event. Breaks once the session has shut down.
    pub fn dispatch(&mut self, event: PreviewEvent) -> ControlFlow<()> {
        match event {
            PreviewEvent::Edited(text) => self.controller.edited(text),
            PreviewEvent::RenderDue(window) => self.controller.render_due(window),
            PreviewEvent::Settled(settlement) => self.controller.settled(settlement),
            PreviewEvent::Shutdown => {
                self.controller.shutdown();
                return ControlFlow::Break(());
            }
        }
        debug!(state = self.controller.state().label(), "preview event applied");
        ControlFlow::Continue(())
    }

    /// Apply every event that is already queued, returning how many ran.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            applied += 1;
            if self.dispatch(event).is_break() {
                break;
            }
        }
        applied
    }

    /// Wait for the next event. The session holds senders of its own, so
    /// this only returns `None` if the channel is closed explicitly.
    pub async fn next_event(&mut self) -> Option<PreviewEvent> {
        self.events.recv().await
    }

    /// Start from `initial` and process events until shut down.
    pub async fn run(mut self, initial: String) -> PreviewState {
        self.start(initial);
        while let Some(event) = self.events.recv().await {
            if self.dispatch(event).is_break() {
                break;
            }
        }
        info!(state = self.controller.state().label(), "preview session stopped");
        self.controller.state().clone()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use url::Url;

    use super::*;
    use crate::application::artifacts::MemoryArtifacts;
    use crate::application::debounce::DEFAULT_DEBOUNCE;
    use crate::application::persistence::MemoryStore;
    use crate::application::scheduler::{ManualScheduler, TokioScheduler};
    use crate::application::testing::ScriptedTransport;
    use crate::application::transport::RenderResponse;
    use crate::application::view::RecordingView;
    use crate::domain::document::DEFAULT_DOCUMENT;
    use crate::domain::link::MAX_LINK_LENGTH;

    fn services(
        transport: &ScriptedTransport,
        scheduler: Arc<dyn Scheduler>,
        artifacts: &Arc<MemoryArtifacts>,
        store: &Arc<MemoryStore>,
        view: &RecordingView,
    ) -> PreviewServices {
        PreviewServices {
            transport: Arc::new(transport.clone()),
            scheduler,
            artifacts: artifacts.clone(),
            persistence: store.clone(),
            links: LinkBuilder::new(
                Url::parse("http://localhost:3000/").expect("base url"),
                MAX_LINK_LENGTH,
            ),
            debounce: DEFAULT_DEBOUNCE,
            view: Box::new(view.clone()),
        }
    }

    async fn settle(session: &mut PreviewSession) {
        let event = session.next_event().await.expect("event");
        assert!(matches!(event, PreviewEvent::Settled(_)));
        assert!(session.dispatch(event).is_continue());
    }

    #[tokio::test]
    async fn initial_load_renders_default_document_immediately() {
        let transport = ScriptedTransport::new();
        let scheduler = ManualScheduler::new();
        let artifacts = Arc::new(MemoryArtifacts::new());
        let store = Arc::new(MemoryStore::with_content(""));
        let view = RecordingView::new();
        let (mut session, _handle) = PreviewSession::new(services(
            &transport,
            Arc::new(scheduler.clone()),
            &artifacts,
            &store,
            &view,
        ));

        let initial = session.initial_document();
        assert_eq!(initial, DEFAULT_DOCUMENT);
        session.start(initial);

        transport.wait_for_calls(1).await;
        assert_eq!(scheduler.now(), Duration::ZERO);
        assert_eq!(transport.contents(), vec![DEFAULT_DOCUMENT.to_string()]);
    }

    #[tokio::test]
    async fn failure_body_is_reduced_to_its_diagnostic() {
        let transport = ScriptedTransport::new();
        let scheduler = ManualScheduler::new();
        let artifacts = Arc::new(MemoryArtifacts::new());
        let store = Arc::new(MemoryStore::new());
        let view = RecordingView::new();
        let (mut session, handle) = PreviewSession::new(services(
            &transport,
            Arc::new(scheduler.clone()),
            &artifacts,
            &store,
            &view,
        ));

        session.start("ok".into());
        transport.wait_for_calls(1).await;
        transport.resolve("ok", Ok(RenderResponse::new(StatusCode::OK, "png")));
        settle(&mut session).await;
        assert_eq!(session.state(), &PreviewState::Success);

        handle.edit("$x").expect("session open");
        assert_eq!(session.pump(), 1);
        assert_eq!(session.state(), &PreviewState::Pending);
        assert_eq!(store.get().expect("get").as_deref(), Some("$x"));

        scheduler.advance(DEFAULT_DEBOUNCE);
        assert_eq!(session.pump(), 1);
        transport.wait_for_calls(2).await;
        transport.resolve(
            "$x",
            Ok(RenderResponse::new(
                StatusCode::BAD_REQUEST,
                "*!Missing $ inserted.\n!rest",
            )),
        );
        settle(&mut session).await;

        assert_eq!(
            session.state(),
            &PreviewState::Error("Missing $ inserted.".into())
        );
        assert_eq!(artifacts.live(), 0);
        assert_eq!(view.last_error().as_deref(), Some("Missing $ inserted."));
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop_and_releases_the_artifact() {
        let transport = ScriptedTransport::new();
        let scheduler = ManualScheduler::new();
        let artifacts = Arc::new(MemoryArtifacts::new());
        let store = Arc::new(MemoryStore::new());
        let view = RecordingView::new();
        let (mut session, handle) = PreviewSession::new(services(
            &transport,
            Arc::new(scheduler.clone()),
            &artifacts,
            &store,
            &view,
        ));

        session.start("doc".into());
        transport.wait_for_calls(1).await;
        transport.resolve("doc", Ok(RenderResponse::new(StatusCode::OK, "png")));
        settle(&mut session).await;
        assert_eq!(artifacts.live(), 1);

        handle.edit("doc 2").expect("session open");
        handle.shutdown().expect("session open");
        handle.edit("ignored").expect("session open");
        assert_eq!(session.pump(), 2);

        assert_eq!(artifacts.live(), 0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_processes_edits_until_shutdown() {
        let transport = ScriptedTransport::new();
        let artifacts = Arc::new(MemoryArtifacts::new());
        let store = Arc::new(MemoryStore::new());
        let view = RecordingView::new();
        let scheduler = Arc::new(TokioScheduler::new(tokio::runtime::Handle::current()));
        let (session, handle) =
            PreviewSession::new(services(&transport, scheduler, &artifacts, &store, &view));

        let running = tokio::spawn(session.run("first".into()));
        transport.wait_for_calls(1).await;
        transport.resolve("first", Ok(RenderResponse::new(StatusCode::OK, "png")));

        handle.edit("second").expect("session open");
        transport.wait_for_calls(2).await;
        transport.resolve(
            "second",
            Ok(RenderResponse::new(StatusCode::BAD_REQUEST, "no markers here")),
        );

        tokio::time::timeout(Duration::from_secs(5), async {
            while view.last_error().is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("error displayed");

        handle.shutdown().expect("session open");
        let state = running.await.expect("session task");
        assert_eq!(state, PreviewState::Error("no markers here".into()));
        assert_eq!(artifacts.released(), 1);
        assert_eq!(artifacts.live(), 0);
    }

    #[tokio::test]
    async fn timer_firing_behind_a_queued_edit_renders_only_the_edit() {
        let transport = ScriptedTransport::new();
        let scheduler = ManualScheduler::new();
        let artifacts = Arc::new(MemoryArtifacts::new());
        let store = Arc::new(MemoryStore::new());
        let view = RecordingView::new();
        let (mut session, handle) = PreviewSession::new(services(
            &transport,
            Arc::new(scheduler.clone()),
            &artifacts,
            &store,
            &view,
        ));

        session.start("v0".into());
        transport.wait_for_calls(1).await;
        transport.resolve("v0", Ok(RenderResponse::new(StatusCode::OK, "png")));
        settle(&mut session).await;

        handle.edit("old").expect("session open");
        assert_eq!(session.pump(), 1);
        scheduler.advance(Duration::from_millis(150));

        // "new" is queued before the "old" window fires behind it.
        handle.edit("new").expect("session open");
        scheduler.advance(Duration::from_millis(50));
        assert_eq!(session.pump(), 2);

        assert_eq!(transport.contents(), vec!["v0".to_string()]);
        assert_eq!(session.state(), &PreviewState::Pending);
        assert_eq!(view.last_link(), Some(Some("http://localhost:3000/render/new".into())));

        scheduler.advance(DEFAULT_DEBOUNCE);
        assert_eq!(session.pump(), 1);
        transport.wait_for_calls(2).await;
        assert_eq!(
            transport.contents(),
            vec!["v0".to_string(), "new".to_string()]
        );
    }
}
