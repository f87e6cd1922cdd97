//! Annotation store with snapshot history
//!
//! Holds the document's annotations in insertion order (later entries draw on
//! top), the active selection, and the undo/redo history. Every mutator is
//! total: unknown ids are ignored and reported through the return value rather
//! than raised.

use crate::annotation::{Annotation, AnnotationDraft, AnnotationId, AnnotationType, Color};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Color preferences used to resolve drafts without an explicit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPalette {
    /// Color for new highlights
    pub highlight: Color,
    /// Color for new underlines
    pub underline: Color,
    /// Generic color for everything else (signatures, comments)
    pub annotation: Color,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self { highlight: Color::AMBER, underline: Color::AZURE, annotation: Color::AMBER }
    }
}

impl ColorPalette {
    /// Resolve the preferred color for a new annotation of the given type
    pub fn color_for(&self, annotation_type: AnnotationType) -> Color {
        match annotation_type {
            AnnotationType::Highlight => self.highlight,
            AnnotationType::Underline => self.underline,
            AnnotationType::Comment | AnnotationType::Signature => self.annotation,
        }
    }
}

type Snapshot = Vec<Annotation>;

/// Full-snapshot undo/redo history
#[derive(Debug, Clone, Default)]
struct History {
    /// Snapshots that can be restored by undo (most recent last)
    past: VecDeque<Snapshot>,
    /// Snapshots that can be restored by redo (most recent first)
    future: VecDeque<Snapshot>,
    /// Maximum length of `past`; `None` keeps everything
    limit: Option<usize>,
}

impl History {
    fn record(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);
        self.future.clear();

        if let Some(limit) = self.limit {
            while self.past.len() > limit {
                self.past.pop_front();
            }
        }
    }
}

/// In-memory annotation collection for one document session
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    active: Option<AnnotationId>,
    history: History,
}

impl AnnotationStore {
    /// Create a new empty store with unbounded history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that keeps at most `limit` undo steps
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self { history: History { limit, ..History::default() }, ..Self::default() }
    }

    fn commit(&mut self, next: Snapshot) {
        let previous = std::mem::replace(&mut self.annotations, next);
        self.history.record(previous);
        self.drop_stale_selection();
    }

    /// Clear the selection if it points at an annotation that no longer exists
    fn drop_stale_selection(&mut self) {
        if let Some(id) = self.active {
            if self.get(id).is_none() {
                self.active = None;
            }
        }
    }

    /// Add a draft, assigning a fresh id and resolving its color
    ///
    /// The color is the draft's explicit color if set, otherwise the palette's
    /// preference for the draft's type.
    pub fn add(&mut self, draft: AnnotationDraft, palette: &ColorPalette) -> Annotation {
        let color = draft.color.unwrap_or_else(|| palette.color_for(draft.kind.annotation_type()));
        let annotation =
            Annotation::from_parts(AnnotationId::new_v4(), draft.page_number, draft.kind, color);

        let mut next = self.annotations.clone();
        next.push(annotation.clone());
        self.commit(next);

        tracing::debug!(id = %annotation.id(), page = annotation.page_number(), "annotation added");
        annotation
    }

    /// Replace the annotation with the given id
    ///
    /// The replacement keeps the stored id and page number. Returns `false`
    /// (and records nothing) when the id is unknown.
    pub fn update(&mut self, id: AnnotationId, replacement: Annotation) -> bool {
        let Some(index) = self.index_of(id) else {
            tracing::debug!(%id, "update ignored for unknown annotation");
            return false;
        };

        let current = &self.annotations[index];
        let replacement = Annotation::from_parts(
            id,
            current.page_number(),
            replacement.kind().clone(),
            replacement.color(),
        );

        let mut next = self.annotations.clone();
        next[index] = replacement;
        self.commit(next);
        true
    }

    /// Delete an annotation. Returns the removed value, or `None` for unknown ids.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.index_of(id)?;
        let mut next = self.annotations.clone();
        let removed = next.remove(index);
        self.commit(next);

        tracing::debug!(%id, "annotation removed");
        Some(removed)
    }

    /// Bulk-replace the whole set, recording history
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) {
        self.commit(annotations);
    }

    /// Restore the previous snapshot. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.annotations, previous);
        self.history.future.push_front(current);
        self.drop_stale_selection();
        true
    }

    /// Re-apply the next snapshot. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.annotations, next);
        self.history.past.push_back(current);
        self.drop_stale_selection();
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.history.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.future.len()
    }

    fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.annotations.iter().position(|a| a.id() == id)
    }

    /// Get an annotation by ID
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    /// All annotations, bottom-most first
    pub fn all(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Annotations on a 1-based page, bottom-most first
    pub fn by_page(&self, page_number: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.page_number() == page_number).collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// The selected annotation, if it still exists
    pub fn active_annotation(&self) -> Option<&Annotation> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn active_id(&self) -> Option<AnnotationId> {
        self.active
    }

    /// Select an annotation. Unknown ids clear the selection and return `false`.
    pub fn set_active(&mut self, id: Option<AnnotationId>) -> bool {
        match id {
            Some(id) if self.get(id).is_some() => {
                self.active = Some(id);
                true
            }
            Some(_) => {
                self.active = None;
                false
            }
            None => {
                self.active = None;
                true
            }
        }
    }
}
