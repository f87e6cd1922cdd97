//! Session, gestures and projection wired together
//!
//! [`Viewer`] keeps the projected scene in step with the session: any event
//! or command that may change what is visible is followed by a re-projection
//! of the current page before control returns to the caller.

use crate::annotation::Annotation;
use crate::config::EngineConfig;
use crate::document::{DocumentSession, ExportedDocument, Notification, SessionError};
use crate::gesture::{GestureConfig, GestureController, GestureOutcome, InputEvent, PageLayout};
use crate::pdf_export::DocumentWriter;
use crate::render::{PageScene, RenderProjector};

#[derive(Debug)]
pub struct Viewer {
    session: DocumentSession,
    gestures: GestureController,
    projector: RenderProjector,
    scene: PageScene,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Viewer {
    pub fn new(config: EngineConfig) -> Self {
        let gestures = GestureController::new(GestureConfig::from(&config));
        let projector = RenderProjector::new(config.comment_marker_size);
        let session = DocumentSession::new(config);
        let scene = projector.project(&session, &gestures.interaction());
        Self { session, gestures, projector, scene }
    }

    pub fn session(&self) -> &DocumentSession {
        &self.session
    }

    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    /// The last projection of the current page
    pub fn scene(&self) -> &PageScene {
        &self.scene
    }

    pub fn set_layout(&mut self, layout: PageLayout) {
        self.gestures.set_layout(layout);
    }

    /// Feed one input event through the gesture controller
    pub fn handle(&mut self, event: &InputEvent) -> GestureOutcome {
        let outcome = self.gestures.handle(&mut self.session, event);
        if outcome.needs_redraw() {
            self.refresh();
        }
        outcome
    }

    /// Run a command against the session, then re-project
    ///
    /// A gesture in flight is dropped when the command switches page or document.
    pub fn apply<T>(&mut self, command: impl FnOnce(&mut DocumentSession) -> T) -> T {
        let page = self.session.current_page();
        let loaded = self.session.has_document();

        let result = command(&mut self.session);

        if page != self.session.current_page() || loaded != self.session.has_document() {
            self.gestures.reset();
        }
        self.refresh();
        result
    }

    pub fn confirm_comment(&mut self, content: &str) -> Option<Annotation> {
        let added = self.gestures.confirm_comment(&mut self.session, content);
        if added.is_some() {
            self.refresh();
        }
        added
    }

    pub fn cancel_comment(&mut self) -> bool {
        self.gestures.cancel_comment()
    }

    /// Export with writer `W`; the scene is unaffected
    pub fn export<W: DocumentWriter>(&mut self) -> Result<ExportedDocument, SessionError> {
        self.session.export::<W>()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.session.drain_notifications()
    }

    /// Re-project the current page
    pub fn refresh(&mut self) {
        self.scene = self.projector.project(&self.session, &self.gestures.interaction());
    }
}
