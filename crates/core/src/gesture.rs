//! Pointer and touch gesture handling
//!
//! [`GestureController`] turns raw input into session mutations. Each press
//! starts at most one gesture:
//!
//! - `Drawing`: a drawing tool pressed on empty page area. Moves update a
//!   preview only; release commits through the store.
//! - `Dragging` / `Resizing`: the select tool pressed on an annotation or on a
//!   handle of the active one. Every move writes through the store.
//! - `Pinching`: two fingers down. Changes zoom only.
//!
//! All positions are converted to page space with
//! [`crate::coords::screen_to_page`] before any decision is made, so the rules
//! hold at every zoom level.

use crate::annotation::{Annotation, AnnotationDraft, AnnotationId, PagePoint, PageRect};
use crate::config::EngineConfig;
use crate::coords::{screen_to_page, ScreenPoint};
use crate::document::{DocumentSession, Tool};
use crate::manipulation::{generate_handles, hit_handle, ManipulationState};

/// Thresholds used while interpreting gestures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub draw_threshold: f32,
    pub min_size: f32,
    pub handle_radius: f32,
    pub comment_marker_size: f32,
    pub tap_max_movement: f32,
    pub tap_edge_fraction: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for GestureConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            draw_threshold: config.draw_threshold,
            min_size: config.min_annotation_size,
            handle_radius: config.handle_hit_radius,
            comment_marker_size: config.comment_marker_size,
            tap_max_movement: config.tap_max_movement,
            tap_edge_fraction: config.tap_edge_fraction,
        }
    }
}

/// Where the current page sits on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    /// Screen position of the page's top-left corner
    pub container_origin: ScreenPoint,
    /// Screen position of the visible viewport's top-left corner
    pub viewport_origin: ScreenPoint,
    /// Width of the visible viewport in screen pixels
    pub viewport_width: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            container_origin: ScreenPoint::default(),
            viewport_origin: ScreenPoint::default(),
            viewport_width: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// The pointer left the page; ends the gesture like `Up`
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub position: ScreenPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// A touch event with the touches still on the surface after it
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub touches: Vec<ScreenPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Touch(TouchEvent),
}

/// Public view of the controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Drawing,
    Dragging,
    Resizing,
    Pinching,
}

/// What handling one event did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Ignored,
    SelectionChanged,
    PreviewChanged,
    /// A draw ended below the size threshold
    DrawDiscarded,
    AnnotationAdded(AnnotationId),
    ManipulationStarted(AnnotationId),
    AnnotationChanged(AnnotationId),
    ManipulationEnded(AnnotationId),
    /// The host should prompt for comment text, then call
    /// [`GestureController::confirm_comment`] or [`GestureController::cancel_comment`]
    CommentRequested(PagePoint),
    ZoomChanged(f32),
    PageChanged(u32),
}

impl GestureOutcome {
    /// Whether visible state may have changed
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, GestureOutcome::Ignored)
    }
}

/// Box being drawn, not yet in the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawPreview {
    pub tool: Tool,
    pub start: PagePoint,
    pub current: PagePoint,
}

impl DrawPreview {
    pub fn bounds(&self) -> PageRect {
        PageRect::from_corners(self.start, self.current)
    }
}

/// Transient presentation state for the render projector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interaction {
    pub dragging: Option<AnnotationId>,
    pub resizing: Option<AnnotationId>,
    pub preview: Option<DrawPreview>,
}

/// Comment waiting for its text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingComment {
    pub page_number: u32,
    pub anchor: PagePoint,
}

#[derive(Debug, Clone, PartialEq)]
enum GestureState {
    Idle,
    Drawing {
        tool: Tool,
        page_number: u32,
        start: PagePoint,
        current: PagePoint,
    },
    Manipulating(ManipulationState),
    Pinching {
        initial_distance: f32,
        initial_scale: f32,
    },
}

/// Single-finger sequence that may turn out to be a page-turn tap
#[derive(Debug, Clone, Copy)]
struct TapTracker {
    start: ScreenPoint,
    last: ScreenPoint,
    eligible: bool,
}

/// Input state machine for one page view
#[derive(Debug, Clone)]
pub struct GestureController {
    config: GestureConfig,
    layout: PageLayout,
    state: GestureState,
    tap: Option<TapTracker>,
    pending_comment: Option<PendingComment>,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            layout: PageLayout::default(),
            state: GestureState::Idle,
            tap: None,
            pending_comment: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Update the page position after layout, scroll or zoom
    pub fn set_layout(&mut self, layout: PageLayout) {
        self.layout = layout;
    }

    pub fn phase(&self) -> GesturePhase {
        match &self.state {
            GestureState::Idle => GesturePhase::Idle,
            GestureState::Drawing { .. } => GesturePhase::Drawing,
            GestureState::Manipulating(ManipulationState::Drag { .. }) => GesturePhase::Dragging,
            GestureState::Manipulating(ManipulationState::Resize { .. }) => GesturePhase::Resizing,
            GestureState::Pinching { .. } => GesturePhase::Pinching,
        }
    }

    pub fn pending_comment(&self) -> Option<&PendingComment> {
        self.pending_comment.as_ref()
    }

    pub fn interaction(&self) -> Interaction {
        match &self.state {
            GestureState::Drawing { tool, start, current, .. } => Interaction {
                preview: Some(DrawPreview { tool: *tool, start: *start, current: *current }),
                ..Interaction::default()
            },
            GestureState::Manipulating(ManipulationState::Drag { annotation_id, .. }) => {
                Interaction { dragging: Some(*annotation_id), ..Interaction::default() }
            }
            GestureState::Manipulating(ManipulationState::Resize { annotation_id, .. }) => {
                Interaction { resizing: Some(*annotation_id), ..Interaction::default() }
            }
            GestureState::Idle | GestureState::Pinching { .. } => Interaction::default(),
        }
    }

    /// Drop any gesture in flight without committing it
    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
        self.tap = None;
    }

    /// Dispatch one input event
    pub fn handle(&mut self, session: &mut DocumentSession, event: &InputEvent) -> GestureOutcome {
        match event {
            InputEvent::Pointer(pointer) => match pointer.phase {
                PointerPhase::Down => self.pointer_down(session, pointer.position),
                PointerPhase::Move => self.pointer_move(session, pointer.position),
                PointerPhase::Up | PointerPhase::Leave => self.pointer_up(session),
            },
            InputEvent::Touch(touch) => self.touch(session, touch),
        }
    }

    fn to_page(&self, session: &DocumentSession, position: ScreenPoint) -> PagePoint {
        screen_to_page(position, self.layout.container_origin, session.scale())
    }

    /// Whether input should reach the page at all
    fn accepts_input(&self, session: &DocumentSession) -> bool {
        session.has_document() && self.pending_comment.is_none()
    }

    /// Topmost annotation on the current page under a page-space point
    fn annotation_at(&self, session: &DocumentSession, point: PagePoint) -> Option<AnnotationId> {
        session
            .annotations_on_page(session.current_page())
            .into_iter()
            .rev()
            .find(|a| a.hit_box(self.config.comment_marker_size).contains(&point))
            .map(Annotation::id)
    }

    pub fn pointer_down(&mut self, session: &mut DocumentSession, position: ScreenPoint) -> GestureOutcome {
        if !self.accepts_input(session) || self.state != GestureState::Idle {
            return GestureOutcome::Ignored;
        }
        let point = self.to_page(session, position);
        self.press(session, point)
    }

    fn press(&mut self, session: &mut DocumentSession, point: PagePoint) -> GestureOutcome {
        let page_number = session.current_page();
        let tool = session.tool();

        if tool == Some(Tool::Select) {
            let resize = session
                .active_annotation()
                .filter(|active| active.page_number() == page_number)
                .and_then(|active| {
                    let handles = generate_handles(active, self.config.handle_radius);
                    hit_handle(&handles, &point)
                        .map(|handle| ManipulationState::resize(active.id(), handle.corner, &active.bounds()))
                });
            if let Some(state) = resize {
                let id = state.annotation_id();
                tracing::debug!(%id, "resize started");
                self.state = GestureState::Manipulating(state);
                return GestureOutcome::ManipulationStarted(id);
            }

            if let Some(id) = self.annotation_at(session, point) {
                session.set_active(Some(id));
                tracing::debug!(%id, "drag started");
                self.state = GestureState::Manipulating(ManipulationState::drag(id, point));
                return GestureOutcome::ManipulationStarted(id);
            }
        }

        let over_annotation = self.annotation_at(session, point).is_some();
        let deselected = !over_annotation && session.active_annotation().is_some();
        if deselected {
            session.set_active(None);
        }

        match tool {
            Some(tool) if tool.draws() && !over_annotation => {
                self.state = GestureState::Drawing { tool, page_number, start: point, current: point };
                GestureOutcome::PreviewChanged
            }
            _ if deselected => GestureOutcome::SelectionChanged,
            _ => GestureOutcome::Ignored,
        }
    }

    pub fn pointer_move(&mut self, session: &mut DocumentSession, position: ScreenPoint) -> GestureOutcome {
        if !self.accepts_input(session) {
            return GestureOutcome::Ignored;
        }
        let point = self.to_page(session, position);
        self.drag_to(session, point)
    }

    fn drag_to(&mut self, session: &mut DocumentSession, point: PagePoint) -> GestureOutcome {
        match &mut self.state {
            GestureState::Drawing { current, .. } => {
                *current = point;
                GestureOutcome::PreviewChanged
            }
            GestureState::Manipulating(manipulation) => {
                let id = manipulation.annotation_id();
                let Some(annotation) = session.store().get(id).cloned() else {
                    tracing::debug!(%id, "manipulated annotation disappeared");
                    self.state = GestureState::Idle;
                    return GestureOutcome::Ignored;
                };
                let updated = manipulation.apply(&annotation, point, self.config.min_size);
                session.update_annotation(id, updated);
                GestureOutcome::AnnotationChanged(id)
            }
            GestureState::Idle | GestureState::Pinching { .. } => GestureOutcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self, session: &mut DocumentSession) -> GestureOutcome {
        match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::Drawing { tool, page_number, start, current } => {
                self.finish_drawing(session, tool, page_number, start, current)
            }
            GestureState::Manipulating(manipulation) => {
                let id = manipulation.annotation_id();
                tracing::debug!(%id, "manipulation ended");
                GestureOutcome::ManipulationEnded(id)
            }
            pinching @ GestureState::Pinching { .. } => {
                self.state = pinching;
                GestureOutcome::Ignored
            }
            GestureState::Idle => GestureOutcome::Ignored,
        }
    }

    fn finish_drawing(
        &mut self,
        session: &mut DocumentSession,
        tool: Tool,
        page_number: u32,
        start: PagePoint,
        current: PagePoint,
    ) -> GestureOutcome {
        let width = (current.x - start.x).abs();
        let height = (current.y - start.y).abs();
        let is_tap = width < self.config.draw_threshold && height < self.config.draw_threshold;

        if tool == Tool::Comment {
            let anchor = if is_tap {
                start
            } else {
                PagePoint::new(start.x.min(current.x), start.y.min(current.y))
            };
            self.pending_comment = Some(PendingComment { page_number, anchor });
            tracing::debug!(x = anchor.x, y = anchor.y, "comment requested");
            return GestureOutcome::CommentRequested(anchor);
        }

        if is_tap {
            tracing::debug!(width, height, "draw discarded below threshold");
            return GestureOutcome::DrawDiscarded;
        }

        let bounds = PageRect::from_corners(start, current).with_min_size(self.config.min_size);
        let draft = match tool {
            Tool::Highlight => AnnotationDraft::highlight(page_number, bounds),
            Tool::Underline => AnnotationDraft::underline(page_number, bounds),
            Tool::Select | Tool::Comment | Tool::Signature => return GestureOutcome::DrawDiscarded,
        };
        GestureOutcome::AnnotationAdded(session.add_annotation(draft).id())
    }

    /// Commit the pending comment with its text
    ///
    /// Blank text is refused and the prompt stays open.
    pub fn confirm_comment(&mut self, session: &mut DocumentSession, content: &str) -> Option<Annotation> {
        let pending = self.pending_comment?;
        if content.trim().is_empty() {
            return None;
        }
        self.pending_comment = None;
        Some(session.add_annotation(AnnotationDraft::comment(pending.page_number, pending.anchor, content)))
    }

    pub fn cancel_comment(&mut self) -> bool {
        self.pending_comment.take().is_some()
    }

    pub fn touch(&mut self, session: &mut DocumentSession, event: &TouchEvent) -> GestureOutcome {
        if !self.accepts_input(session) {
            return GestureOutcome::Ignored;
        }

        match (event.phase, event.touches.as_slice()) {
            (TouchPhase::Start, [first, second, ..]) => self.begin_pinch(session, *first, *second),
            (TouchPhase::Start, [only]) => {
                if self.state != GestureState::Idle {
                    return GestureOutcome::Ignored;
                }
                let point = self.to_page(session, *only);
                let outcome = self.press(session, point);
                let drawing_tool = session.tool().is_some_and(|tool| tool.draws());
                self.tap = Some(TapTracker {
                    start: *only,
                    last: *only,
                    eligible: !drawing_tool && !matches!(self.state, GestureState::Manipulating(_)),
                });
                outcome
            }
            (TouchPhase::Move, [first, second, ..]) => self.pinch_to(session, *first, *second),
            (TouchPhase::Move, [only]) => {
                if let Some(tap) = self.tap.as_mut() {
                    tap.last = *only;
                }
                let point = self.to_page(session, *only);
                self.drag_to(session, point)
            }
            (TouchPhase::End, remaining) => self.end_touch(session, remaining.len()),
            (TouchPhase::Cancel, _) => {
                self.tap = None;
                match std::mem::replace(&mut self.state, GestureState::Idle) {
                    GestureState::Drawing { .. } => GestureOutcome::DrawDiscarded,
                    GestureState::Manipulating(manipulation) => {
                        GestureOutcome::ManipulationEnded(manipulation.annotation_id())
                    }
                    GestureState::Idle | GestureState::Pinching { .. } => GestureOutcome::Ignored,
                }
            }
            (TouchPhase::Start | TouchPhase::Move, []) => GestureOutcome::Ignored,
        }
    }

    fn begin_pinch(
        &mut self,
        session: &DocumentSession,
        first: ScreenPoint,
        second: ScreenPoint,
    ) -> GestureOutcome {
        let cancelled_draw = matches!(self.state, GestureState::Drawing { .. });
        self.tap = None;
        self.state = GestureState::Pinching {
            initial_distance: first.distance_to(&second),
            initial_scale: session.scale(),
        };
        tracing::debug!(scale = session.scale(), "pinch started");

        if cancelled_draw {
            GestureOutcome::PreviewChanged
        } else {
            GestureOutcome::Ignored
        }
    }

    fn pinch_to(
        &mut self,
        session: &mut DocumentSession,
        first: ScreenPoint,
        second: ScreenPoint,
    ) -> GestureOutcome {
        let GestureState::Pinching { initial_distance, initial_scale } = self.state else {
            return GestureOutcome::Ignored;
        };
        if initial_distance <= 0.0 {
            return GestureOutcome::Ignored;
        }

        let ratio = first.distance_to(&second) / initial_distance;
        let previous = session.scale();
        let scale = session.set_scale(initial_scale * ratio);
        if scale == previous {
            GestureOutcome::Ignored
        } else {
            GestureOutcome::ZoomChanged(scale)
        }
    }

    fn end_touch(&mut self, session: &mut DocumentSession, remaining: usize) -> GestureOutcome {
        if matches!(self.state, GestureState::Pinching { .. }) {
            if remaining < 2 {
                self.state = GestureState::Idle;
            }
            self.tap = None;
            return GestureOutcome::Ignored;
        }

        let outcome = self.pointer_up(session);
        match self.tap.take() {
            Some(tap) if tap.eligible => self.page_turn(session, tap).unwrap_or(outcome),
            _ => outcome,
        }
    }

    /// Turn the page for a short tap near the left or right viewport edge
    ///
    /// Edges are measured from the viewport, not the page, so a centered or
    /// scrolled page keeps the same tap zones.
    fn page_turn(&self, session: &mut DocumentSession, tap: TapTracker) -> Option<GestureOutcome> {
        if tap.start.distance_to(&tap.last) >= self.config.tap_max_movement {
            return None;
        }

        let x = tap.last.x - self.layout.viewport_origin.x;
        let width = self.layout.viewport_width;
        let edge = width * self.config.tap_edge_fraction;

        let turned = if x < edge {
            session.previous_page()
        } else if x > width - edge {
            session.next_page()
        } else {
            false
        };
        turned.then(|| GestureOutcome::PageChanged(session.current_page()))
    }
}
