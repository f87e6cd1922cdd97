//! Document session state and management
//!
//! A [`DocumentSession`] is the explicit session object every other component
//! works against: the loaded file, page navigation, zoom, tool and colour
//! preferences, the annotation store and the export guard. PDF decoding,
//! rasterization and writing stay behind collaborator traits.

use crate::annotation::{Annotation, AnnotationDraft, AnnotationId, Color};
use crate::config::EngineConfig;
use crate::coords::{PageBox, Viewport};
use crate::pdf_export::{export_with, DocumentWriter, ExportError, ExportOutcome, ExportWarning};
use crate::signature::SignatureImage;
use crate::store::{AnnotationStore, ColorPalette};
use std::sync::Arc;

/// The only MIME type the session accepts
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Prefix of exported file names
pub const EXPORT_NAME_PREFIX: &str = "annotated-";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Tool selected in the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Select,
    Highlight,
    Underline,
    Comment,
    Signature,
}

impl Tool {
    /// Whether pressing on the page with this tool starts drawing a box
    pub fn draws(&self) -> bool {
        matches!(self, Tool::Highlight | Tool::Underline | Tool::Comment)
    }
}

/// A file handed over by the upload surface
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime_type: PDF_MIME_TYPE.to_string(), bytes }
    }
}

/// A successfully opened document
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    name: String,
    bytes: Arc<[u8]>,
    pages: Vec<PageBox>,
}

impl LoadedDocument {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The untouched source bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Page box for a 1-based page number
    pub fn page(&self, page_number: u32) -> Option<&PageBox> {
        page_number.checked_sub(1).and_then(|i| self.pages.get(i as usize))
    }

    pub fn pages(&self) -> &[PageBox] {
        &self.pages
    }

    /// File name used for the annotated copy
    pub fn output_name(&self) -> String {
        format!("{EXPORT_NAME_PREFIX}{}", self.name)
    }
}

/// Named events for the host's notification surface
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    LoadFailed { reason: String },
    ExportStarted,
    ExportComplete { file_name: String },
    ExportFailed { reason: String },
    SignatureEmbedFailed { annotation_id: AnnotationId, reason: String },
    SignatureAdded,
    EmptySignature,
}

/// Reads page structure from PDF bytes
pub trait PdfReader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Unrotated size and rotation of every page, in page order
    fn page_boxes(&self, bytes: &[u8]) -> Result<Vec<PageBox>, Self::Error>;
}

/// Draws a page of the loaded document at a viewport size
pub trait PageRasterizer {
    type Error: std::error::Error;

    fn render(
        &mut self,
        document: &LoadedDocument,
        page_number: u32,
        viewport: &Viewport,
    ) -> Result<(), Self::Error>;
}

/// Result of a page render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Rendered,
    /// Nothing to draw or the rasterizer failed; the page is shown blank
    Blank,
}

/// Errors from session-level actions (load and export)
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unsupported file type {mime_type:?}, expected application/pdf")]
    UnsupportedFileType { mime_type: String },
    #[error("failed to decode document: {0}")]
    Decode(#[source] BoxError),
    #[error("document has no pages")]
    EmptyDocument,
    #[error("no document is loaded")]
    NoDocument,
    #[error("an export is already in progress")]
    ExportInProgress,
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Snapshot taken when an export starts
///
/// Holds its own copy of the source bytes and annotations, so the session can
/// keep handling input while the export runs.
#[derive(Debug, Clone)]
pub struct ExportTicket {
    source: Arc<[u8]>,
    annotations: Vec<Annotation>,
    output_name: String,
}

impl ExportTicket {
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Produce the annotated document with writer `W`
    pub fn run<W: DocumentWriter>(&self) -> Result<ExportOutcome, ExportError> {
        export_with::<W>(&self.source, &self.annotations)
    }
}

/// A finished export, ready to hand to the download surface
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub warnings: Vec<ExportWarning>,
}

/// Session-scoped viewer state
#[derive(Debug)]
pub struct DocumentSession {
    config: EngineConfig,
    document: Option<LoadedDocument>,
    current_page: u32,
    scale: f32,
    tool: Option<Tool>,
    palette: ColorPalette,
    store: AnnotationStore,
    notifications: Vec<Notification>,
    export_in_progress: bool,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl DocumentSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            document: None,
            current_page: 1,
            scale: config.initial_scale,
            tool: None,
            palette: config.palette,
            store: AnnotationStore::with_history_limit(config.history_limit),
            notifications: Vec::new(),
            export_in_progress: false,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a file, replacing any loaded document
    ///
    /// Annotations are kept; only [`DocumentSession::new_file`] clears them.
    /// On failure the session returns to the no-file state and a
    /// [`Notification::LoadFailed`] is queued.
    pub fn load<R: PdfReader>(&mut self, file: SourceFile, reader: &R) -> Result<(), SessionError> {
        let result = Self::open(file, reader);
        match result {
            Ok(document) => {
                tracing::info!(
                    name = document.name(),
                    pages = document.page_count(),
                    "document loaded"
                );
                self.document = Some(document);
                self.current_page = 1;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "document load rejected");
                self.document = None;
                self.current_page = 1;
                self.notify(Notification::LoadFailed { reason: err.to_string() });
                Err(err)
            }
        }
    }

    fn open<R: PdfReader>(file: SourceFile, reader: &R) -> Result<LoadedDocument, SessionError> {
        if !file.mime_type.trim().eq_ignore_ascii_case(PDF_MIME_TYPE) {
            return Err(SessionError::UnsupportedFileType { mime_type: file.mime_type });
        }

        let pages = reader
            .page_boxes(&file.bytes)
            .map_err(|e| SessionError::Decode(Box::new(e)))?;
        if pages.is_empty() {
            return Err(SessionError::EmptyDocument);
        }

        Ok(LoadedDocument { name: file.name, bytes: Arc::from(file.bytes), pages })
    }

    /// Forget the loaded file and start over with no annotations
    pub fn new_file(&mut self) {
        self.document = None;
        self.current_page = 1;
        self.store.replace_all(Vec::new());
        self.store.set_active(None);
        tracing::debug!("session reset for a new file");
    }

    pub fn document(&self) -> Option<&LoadedDocument> {
        self.document.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// Page count of the loaded document, 0 when none is loaded
    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, LoadedDocument::page_count)
    }

    /// 1-based current page
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn current_page_box(&self) -> Option<&PageBox> {
        self.document.as_ref().and_then(|doc| doc.page(self.current_page))
    }

    /// Size of the current page's layer at the current zoom
    pub fn viewport(&self) -> Option<Viewport> {
        self.current_page_box().map(|page| page.viewport(self.scale))
    }

    /// Jump to a page; out-of-range requests are ignored
    pub fn go_to_page(&mut self, page_number: u32) -> bool {
        if page_number == 0 || page_number > self.page_count() || page_number == self.current_page {
            return false;
        }
        self.current_page = page_number;
        tracing::debug!(page = page_number, "page changed");
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Set the zoom factor, clamped to the configured bounds
    pub fn set_scale(&mut self, scale: f32) -> f32 {
        if scale.is_finite() {
            self.scale = self.config.clamp_scale(scale);
        }
        self.scale
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set_scale(self.scale + self.config.zoom_step)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_scale(self.scale - self.config.zoom_step)
    }

    pub fn tool(&self) -> Option<Tool> {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Option<Tool>) {
        self.tool = tool;
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn set_highlight_color(&mut self, color: Color) {
        self.palette.highlight = color;
    }

    pub fn set_underline_color(&mut self, color: Color) {
        self.palette.underline = color;
    }

    pub fn set_annotation_color(&mut self, color: Color) {
        self.palette.annotation = color;
    }

    /// Apply a colour picked in the toolbar
    ///
    /// Always becomes the generic colour; also becomes the highlight or
    /// underline colour while that tool is selected.
    pub fn choose_color(&mut self, color: Color) {
        self.palette.annotation = color;
        match self.tool {
            Some(Tool::Highlight) => self.palette.highlight = color,
            Some(Tool::Underline) => self.palette.underline = color,
            _ => {}
        }
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.store.all()
    }

    pub fn annotations_on_page(&self, page_number: u32) -> Vec<&Annotation> {
        self.store.by_page(page_number)
    }

    pub fn active_annotation(&self) -> Option<&Annotation> {
        self.store.active_annotation()
    }

    /// Add an annotation, resolving its colour from the current palette
    pub fn add_annotation(&mut self, draft: AnnotationDraft) -> Annotation {
        self.store.add(draft, &self.palette)
    }

    pub fn update_annotation(&mut self, id: AnnotationId, replacement: Annotation) -> bool {
        self.store.update(id, replacement)
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        self.store.remove(id)
    }

    /// Remove the selected annotation, if any
    pub fn remove_active(&mut self) -> Option<Annotation> {
        let id = self.store.active_id()?;
        self.store.remove(id)
    }

    pub fn set_active(&mut self, id: Option<AnnotationId>) -> bool {
        self.store.set_active(id)
    }

    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.store.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    /// Place a drawn signature on the current page at the default box
    ///
    /// Empty drawings are refused with [`Notification::EmptySignature`].
    pub fn apply_signature(&mut self, data_uri: &str) -> Option<Annotation> {
        let image = SignatureImage::from_data_uri(data_uri);
        if image.is_empty() {
            self.notify(Notification::EmptySignature);
            return None;
        }

        let draft = AnnotationDraft::signature(self.current_page, self.config.signature_box, image)
            .with_color(self.palette.annotation);
        let annotation = self.store.add(draft, &self.palette);
        self.store.set_active(None);
        self.notify(Notification::SignatureAdded);
        Some(annotation)
    }

    /// Draw the current page through the rasterizer
    ///
    /// Failures are logged and reported as [`RenderStatus::Blank`]; they never
    /// affect navigation.
    pub fn render_page<R: PageRasterizer>(&self, rasterizer: &mut R) -> RenderStatus {
        let (Some(document), Some(viewport)) = (self.document.as_ref(), self.viewport()) else {
            return RenderStatus::Blank;
        };

        match rasterizer.render(document, self.current_page, &viewport) {
            Ok(()) => RenderStatus::Rendered,
            Err(err) => {
                tracing::warn!(page = self.current_page, error = %err, "page render failed");
                RenderStatus::Blank
            }
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.export_in_progress
    }

    /// Start an export, taking the in-progress guard
    pub fn begin_export(&mut self) -> Result<ExportTicket, SessionError> {
        if self.export_in_progress {
            tracing::debug!("export request ignored while another is running");
            return Err(SessionError::ExportInProgress);
        }
        let document = self.document.as_ref().ok_or(SessionError::NoDocument)?;

        let ticket = ExportTicket {
            source: Arc::clone(&document.bytes),
            annotations: self.store.all().to_vec(),
            output_name: document.output_name(),
        };

        self.export_in_progress = true;
        self.notify(Notification::ExportStarted);
        tracing::info!(annotations = ticket.annotations.len(), "export started");
        Ok(ticket)
    }

    /// Release the guard and report the result of [`ExportTicket::run`]
    pub fn finish_export(
        &mut self,
        ticket: ExportTicket,
        result: Result<ExportOutcome, ExportError>,
    ) -> Result<ExportedDocument, SessionError> {
        self.export_in_progress = false;

        match result {
            Ok(outcome) => {
                for warning in outcome.warnings.iter().filter(|w| w.is_signature_failure()) {
                    self.notify(Notification::SignatureEmbedFailed {
                        annotation_id: warning.annotation_id(),
                        reason: warning.to_string(),
                    });
                }
                tracing::info!(
                    file = ticket.output_name(),
                    bytes = outcome.bytes.len(),
                    warnings = outcome.warnings.len(),
                    "export complete"
                );
                self.notify(Notification::ExportComplete { file_name: ticket.output_name.clone() });
                Ok(ExportedDocument {
                    file_name: ticket.output_name,
                    bytes: outcome.bytes,
                    warnings: outcome.warnings,
                })
            }
            Err(err) => {
                tracing::error!(error = %err, "export failed");
                self.notify(Notification::ExportFailed { reason: err.to_string() });
                Err(SessionError::Export(err))
            }
        }
    }

    /// Run a whole export with writer `W`
    pub fn export<W: DocumentWriter>(&mut self) -> Result<ExportedDocument, SessionError> {
        let ticket = self.begin_export()?;
        let result = ticket.run::<W>();
        self.finish_export(ticket, result)
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Pending notifications, oldest first
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Take all pending notifications
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::annotation::{AnnotationType, PageRect};
    use crate::coords::Rotation;
    use crate::pdf_export::tests::RecordingWriter;
    use crate::signature::tests::png_fixture;

    /// Reader that reports a fixed number of letter pages for `%PDF` input
    pub(crate) struct StubReader {
        pub(crate) pages: u32,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("stub reader: {0}")]
    pub(crate) struct StubError(&'static str);

    impl PdfReader for StubReader {
        type Error = StubError;

        fn page_boxes(&self, bytes: &[u8]) -> Result<Vec<PageBox>, Self::Error> {
            if !bytes.starts_with(b"%PDF") {
                return Err(StubError("missing header"));
            }
            Ok(vec![PageBox::new(612.0, 792.0, Rotation::None); self.pages as usize])
        }
    }

    pub(crate) fn loaded_session(pages: u32) -> DocumentSession {
        let mut session = DocumentSession::default();
        session
            .load(SourceFile::pdf("report.pdf", b"%PDF-1.7".to_vec()), &StubReader { pages })
            .unwrap();
        session
    }

    struct FlakyRasterizer {
        fail_on: u32,
        rendered: Vec<(u32, f32, f32)>,
    }

    impl PageRasterizer for FlakyRasterizer {
        type Error = StubError;

        fn render(
            &mut self,
            _document: &LoadedDocument,
            page_number: u32,
            viewport: &Viewport,
        ) -> Result<(), Self::Error> {
            if page_number == self.fail_on {
                return Err(StubError("corrupt page"));
            }
            self.rendered.push((page_number, viewport.width, viewport.height));
            Ok(())
        }
    }

    #[test]
    fn rejects_non_pdf_files() {
        let mut session = loaded_session(2);
        let file = SourceFile {
            name: "photo.png".into(),
            mime_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        };

        let err = session.load(file, &StubReader { pages: 1 }).unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFileType { .. }));
        assert!(!session.has_document());
        let notifications = session.drain_notifications();
        assert!(matches!(notifications.as_slice(), [Notification::LoadFailed { .. }]));
    }

    #[test]
    fn decode_failure_returns_to_no_file() {
        let mut session = DocumentSession::default();
        let err = session
            .load(SourceFile::pdf("broken.pdf", b"garbage".to_vec()), &StubReader { pages: 1 })
            .unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
        assert_eq!(session.page_count(), 0);

        let err = session
            .load(SourceFile::pdf("empty.pdf", b"%PDF".to_vec()), &StubReader { pages: 0 })
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyDocument));
    }

    #[test]
    fn navigation_is_bounded() {
        let mut session = loaded_session(3);
        assert!(!session.previous_page());
        assert!(session.next_page());
        assert!(session.next_page());
        assert!(!session.next_page());
        assert_eq!(session.current_page(), 3);
        assert!(!session.go_to_page(7));
        assert!(session.go_to_page(1));
    }

    #[test]
    fn zoom_buttons_step_within_bounds() {
        let mut session = loaded_session(1);
        assert!((session.zoom_in() - 1.2).abs() < 1e-6);
        for _ in 0..20 {
            session.zoom_in();
        }
        assert_eq!(session.scale(), 3.0);
        for _ in 0..20 {
            session.zoom_out();
        }
        assert_eq!(session.scale(), 0.5);
        assert_eq!(session.viewport().map(|v| v.width), Some(306.0));
    }

    #[test]
    fn custom_color_follows_active_tool() {
        let mut session = DocumentSession::default();
        let red = Color::rgb(255, 0, 0);

        session.set_tool(Some(Tool::Underline));
        session.choose_color(red);
        assert_eq!(session.palette().underline, red);
        assert_eq!(session.palette().annotation, red);
        assert_eq!(session.palette().highlight, Color::AMBER);

        session.set_tool(Some(Tool::Select));
        session.choose_color(Color::BLACK);
        assert_eq!(session.palette().underline, red);
        assert_eq!(session.palette().annotation, Color::BLACK);
    }

    #[test]
    fn apply_signature_uses_default_box() {
        let mut session = loaded_session(2);
        session.go_to_page(2);
        session.set_annotation_color(Color::BLACK);

        assert!(session.apply_signature("data:image/png;base64,").is_none());
        assert_eq!(session.drain_notifications(), vec![Notification::EmptySignature]);

        let data_uri = SignatureImage::from_png_bytes(&png_fixture(4, 4));
        let signature = session.apply_signature(data_uri.as_data_uri()).unwrap();
        assert_eq!(signature.annotation_type(), AnnotationType::Signature);
        assert_eq!(signature.page_number(), 2);
        assert_eq!(signature.bounds(), PageRect::new(100.0, 100.0, 200.0, 100.0));
        assert_eq!(signature.color(), Color::BLACK);
        assert!(session.active_annotation().is_none());
        assert_eq!(session.drain_notifications(), vec![Notification::SignatureAdded]);
    }

    #[test]
    fn new_file_clears_annotations_with_history() {
        let mut session = loaded_session(1);
        session.add_annotation(AnnotationDraft::highlight(1, PageRect::new(0.0, 0.0, 30.0, 30.0)));
        session.new_file();
        assert!(!session.has_document());
        assert!(session.annotations().is_empty());
        assert!(session.undo());
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn remove_active_only_touches_selection() {
        let mut session = loaded_session(1);
        let keep = session.add_annotation(AnnotationDraft::highlight(1, PageRect::new(0.0, 0.0, 30.0, 30.0)));
        let drop = session.add_annotation(AnnotationDraft::underline(1, PageRect::new(0.0, 50.0, 30.0, 30.0)));

        assert!(session.remove_active().is_none());
        session.set_active(Some(drop.id()));
        assert_eq!(session.remove_active().map(|a| a.id()), Some(drop.id()));
        assert_eq!(session.annotations().len(), 1);
        assert_eq!(session.annotations()[0].id(), keep.id());
    }

    #[test]
    fn render_failure_shows_blank_page() {
        let mut session = loaded_session(2);
        let mut rasterizer = FlakyRasterizer { fail_on: 2, rendered: Vec::new() };

        assert_eq!(session.render_page(&mut rasterizer), RenderStatus::Rendered);
        session.next_page();
        assert_eq!(session.render_page(&mut rasterizer), RenderStatus::Blank);
        assert_eq!(rasterizer.rendered, vec![(1, 612.0, 792.0)]);
        assert_eq!(session.current_page(), 2);
    }

    #[test]
    fn export_is_serialized() {
        let mut session = loaded_session(1);
        let ticket = session.begin_export().unwrap();
        assert!(session.is_exporting());
        assert!(matches!(session.begin_export(), Err(SessionError::ExportInProgress)));

        let result = ticket.run::<RecordingWriter>();
        let exported = session.finish_export(ticket, result).unwrap();
        assert_eq!(exported.file_name, "annotated-report.pdf");
        assert!(!session.is_exporting());
        assert_eq!(
            session.drain_notifications(),
            vec![
                Notification::ExportStarted,
                Notification::ExportComplete { file_name: "annotated-report.pdf".into() },
            ]
        );
    }

    #[test]
    fn export_without_document_is_refused() {
        let mut session = DocumentSession::default();
        assert!(matches!(session.export::<RecordingWriter>(), Err(SessionError::NoDocument)));
        assert!(!session.is_exporting());
    }

    #[test]
    fn failed_export_clears_guard() {
        let mut session = loaded_session(1);
        // The recording writer refuses anything without a %PDF header
        session.document = Some(LoadedDocument {
            name: "odd.pdf".into(),
            bytes: Arc::from(b"GIF89a".to_vec()),
            pages: vec![PageBox::new(612.0, 792.0, Rotation::None)],
        });

        let err = session.export::<RecordingWriter>().unwrap_err();
        assert!(matches!(err, SessionError::Export(ExportError::Load(_))));
        assert!(!session.is_exporting());
        assert!(matches!(
            session.drain_notifications().last(),
            Some(Notification::ExportFailed { .. })
        ));
    }
}
