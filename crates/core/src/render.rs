//! On-screen projection of the current page's annotations
//!
//! Turns page-space annotations into screen-space shapes plus presentation
//! flags. Geometry comes from [`crate::coords`]; everything else here is
//! styling the host is free to interpret.

use crate::annotation::{Annotation, AnnotationId, AnnotationKind, AnnotationType, Color, PageRect};
use crate::config::EngineConfig;
use crate::coords::{page_rect_to_screen, page_to_screen, ScreenRect};
use crate::document::{DocumentSession, Tool};
use crate::gesture::{DrawPreview, Interaction};
use crate::manipulation::ResizeCorner;

/// Side of a resize handle in screen pixels
pub const HANDLE_SIZE_PX: f32 = 12.0;
/// Height of an underline stroke in screen pixels
pub const UNDERLINE_STROKE_PX: f32 = 2.0;
pub const HIGHLIGHT_OPACITY: f32 = 0.3;
pub const PREVIEW_OPACITY: f32 = 0.5;

/// Type-specific drawable
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectedShape {
    Highlight { rect: ScreenRect, color: Color, opacity: f32 },
    /// Stroke along the bottom edge of the annotation box
    Underline { stroke: ScreenRect, color: Color },
    /// Round marker with the comment text as its tooltip
    Comment { marker: ScreenRect, content: String },
    Signature { rect: ScreenRect, data_uri: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenHandle {
    pub corner: ResizeCorner,
    pub rect: ScreenRect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedAnnotation {
    pub id: AnnotationId,
    pub annotation_type: AnnotationType,
    /// Hit area on screen; the marker square for comments
    pub bounds: ScreenRect,
    pub shape: ProjectedShape,
    pub is_active: bool,
    pub is_dragging: bool,
    pub is_resizing: bool,
    /// Corner handles, present only while the annotation can be resized
    pub handles: Vec<ScreenHandle>,
}

impl ProjectedAnnotation {
    pub fn show_label(&self) -> bool {
        self.is_active || self.is_dragging || self.is_resizing
    }

    /// Label to draw above the annotation, if it should be shown
    pub fn label(&self) -> Option<&'static str> {
        self.show_label().then(|| self.annotation_type.label())
    }
}

/// Live shape for a box being drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectedPreview {
    Box { rect: ScreenRect, color: Color, opacity: f32 },
    /// Zero-height line at the lower edge of the dragged box
    Line { rect: ScreenRect, color: Color },
}

/// Everything needed to draw one page's annotation layer
#[derive(Debug, Clone, PartialEq)]
pub struct PageScene {
    pub page_number: u32,
    pub scale: f32,
    /// Layer size in screen pixels
    pub width: f32,
    pub height: f32,
    /// Bottom-most first
    pub annotations: Vec<ProjectedAnnotation>,
    pub preview: Option<ProjectedPreview>,
}

impl PageScene {
    pub fn get(&self, id: AnnotationId) -> Option<&ProjectedAnnotation> {
        self.annotations.iter().find(|a| a.id == id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderProjector {
    comment_marker_size: f32,
    handle_size_px: f32,
}

impl Default for RenderProjector {
    fn default() -> Self {
        Self::new(EngineConfig::default().comment_marker_size)
    }
}

impl RenderProjector {
    /// `comment_marker_size` is in page units, matching the comment hit area
    pub fn new(comment_marker_size: f32) -> Self {
        Self { comment_marker_size, handle_size_px: HANDLE_SIZE_PX }
    }

    /// Project the session's current page
    pub fn project(&self, session: &DocumentSession, interaction: &Interaction) -> PageScene {
        let page_number = session.current_page();
        let scale = session.scale();
        let (width, height) = session
            .viewport()
            .map_or((0.0, 0.0), |viewport| (viewport.width, viewport.height));
        let active = session.active_annotation().map(Annotation::id);
        let handles_enabled = session.tool() == Some(Tool::Select);

        let annotations = session
            .annotations_on_page(page_number)
            .into_iter()
            .map(|annotation| {
                let id = annotation.id();
                let is_active = active == Some(id);
                self.project_annotation(
                    annotation,
                    scale,
                    is_active,
                    interaction.dragging == Some(id),
                    interaction.resizing == Some(id),
                    is_active && handles_enabled,
                )
            })
            .collect();

        let palette = session.palette();
        let preview = interaction.preview.and_then(|preview| match preview.tool {
            Tool::Highlight => Some(Self::preview_box(&preview, scale, palette.highlight)),
            Tool::Underline => Some(Self::preview_line(&preview, scale, palette.underline)),
            _ => None,
        });

        PageScene { page_number, scale, width, height, annotations, preview }
    }

    pub fn project_annotation(
        &self,
        annotation: &Annotation,
        scale: f32,
        is_active: bool,
        is_dragging: bool,
        is_resizing: bool,
        with_handles: bool,
    ) -> ProjectedAnnotation {
        let bounds = page_rect_to_screen(annotation.hit_box(self.comment_marker_size), scale);

        let shape = match annotation.kind() {
            AnnotationKind::Highlight { .. } => ProjectedShape::Highlight {
                rect: bounds,
                color: annotation.color(),
                opacity: HIGHLIGHT_OPACITY,
            },
            AnnotationKind::Underline { .. } => ProjectedShape::Underline {
                stroke: ScreenRect {
                    x: bounds.x,
                    y: bounds.y + bounds.height - UNDERLINE_STROKE_PX,
                    width: bounds.width,
                    height: UNDERLINE_STROKE_PX,
                },
                color: annotation.color(),
            },
            AnnotationKind::Comment { content, .. } => {
                ProjectedShape::Comment { marker: bounds, content: content.clone() }
            }
            AnnotationKind::Signature { image, .. } => ProjectedShape::Signature {
                rect: bounds,
                data_uri: image.as_data_uri().to_string(),
            },
        };

        let handles = if with_handles && annotation.is_resizable() {
            self.handles_for(&annotation.bounds(), scale)
        } else {
            Vec::new()
        };

        ProjectedAnnotation {
            id: annotation.id(),
            annotation_type: annotation.annotation_type(),
            bounds,
            shape,
            is_active,
            is_dragging,
            is_resizing,
            handles,
        }
    }

    fn handles_for(&self, bounds: &PageRect, scale: f32) -> Vec<ScreenHandle> {
        let half = self.handle_size_px / 2.0;
        ResizeCorner::ALL
            .iter()
            .map(|corner| {
                let center = page_to_screen(corner.position(bounds), scale);
                ScreenHandle {
                    corner: *corner,
                    rect: ScreenRect {
                        x: center.x - half,
                        y: center.y - half,
                        width: self.handle_size_px,
                        height: self.handle_size_px,
                    },
                }
            })
            .collect()
    }

    fn preview_box(preview: &DrawPreview, scale: f32, color: Color) -> ProjectedPreview {
        ProjectedPreview::Box {
            rect: page_rect_to_screen(preview.bounds(), scale),
            color,
            opacity: PREVIEW_OPACITY,
        }
    }

    fn preview_line(preview: &DrawPreview, scale: f32, color: Color) -> ProjectedPreview {
        let bounds = preview.bounds();
        let mut rect = page_rect_to_screen(bounds, scale);
        rect.y = bounds.bottom() * scale;
        rect.height = 0.0;
        ProjectedPreview::Line { rect, color }
    }
}
