//! PDF Annotator Core Library
//!
//! Annotation model, undo history, coordinate mapping, gesture handling and
//! export planning for the PDF annotator. Parsing and writing actual PDF
//! bytes is left to the host through [`PdfReader`] and [`DocumentWriter`].

pub mod annotation;
pub mod config;
pub mod coords;
pub mod document;
pub mod gesture;
pub mod manipulation;
pub mod pdf_export;
pub mod render;
pub mod signature;
pub mod store;
pub mod viewer;

pub use annotation::{
    Annotation, AnnotationDraft, AnnotationId, AnnotationKind, AnnotationType, Color,
    ColorParseError, PagePoint, PageRect, Position,
};
pub use config::{ConfigError, EngineConfig};
pub use coords::{
    page_point_to_export, page_rect_to_export, page_rect_to_screen, page_to_screen,
    screen_to_page, ExportPoint, ExportRect, PageBox, Rotation, ScreenPoint, ScreenRect, Viewport,
};
pub use document::{
    DocumentSession, ExportTicket, ExportedDocument, LoadedDocument, Notification,
    PageRasterizer, PdfReader, RenderStatus, SessionError, SourceFile, Tool,
};
pub use gesture::{
    GestureConfig, GestureController, GestureOutcome, GesturePhase, InputEvent, PageLayout,
    PointerEvent, PointerPhase, TouchEvent, TouchPhase,
};
pub use manipulation::{generate_handles, ManipulationHandle, ManipulationState, ResizeCorner};
pub use pdf_export::{
    export_with, plan_export, DocumentWriter, ExportDirective, ExportError, ExportOutcome,
    ExportPlan, ExportWarning, PlannedDirective,
};
pub use render::{PageScene, ProjectedAnnotation, ProjectedPreview, ProjectedShape, RenderProjector};
pub use signature::{DecodedSignature, ImageError, SignatureImage};
pub use store::{AnnotationStore, ColorPalette};
pub use viewer::Viewer;
