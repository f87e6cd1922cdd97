use pdf_annotator_core::{
    AnnotationType, Color, DocumentWriter, EngineConfig, ExportPoint, ExportRect, GestureOutcome,
    InputEvent, Notification, PageBox, PageLayout, PagePoint, PdfReader, PointerEvent,
    PointerPhase, ProjectedPreview, Rotation, ScreenPoint, ScreenRect, SourceFile, Tool, Viewer,
};

fn letter_pages() -> Vec<PageBox> {
    vec![PageBox::new(612.0, 792.0, Rotation::None); 2]
}

#[derive(Debug, thiserror::Error)]
#[error("not a pdf")]
struct NotPdf;

struct LetterReader;

impl PdfReader for LetterReader {
    type Error = NotPdf;

    fn page_boxes(&self, bytes: &[u8]) -> Result<Vec<PageBox>, Self::Error> {
        if bytes.starts_with(b"%PDF") {
            Ok(letter_pages())
        } else {
            Err(NotPdf)
        }
    }
}

/// Writes one line per drawing operation
#[derive(Default)]
struct TraceWriter {
    lines: Vec<String>,
}

impl DocumentWriter for TraceWriter {
    type Image = ();
    type Error = NotPdf;

    fn load(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.starts_with(b"%PDF") {
            Ok(Self::default())
        } else {
            Err(NotPdf)
        }
    }

    fn page_boxes(&self) -> Result<Vec<PageBox>, Self::Error> {
        Ok(letter_pages())
    }

    fn draw_rectangle(
        &mut self,
        page_index: usize,
        rect: ExportRect,
        color: Color,
        _opacity: f32,
    ) -> Result<(), Self::Error> {
        self.lines.push(format!(
            "rect {page_index} {} {} {} {} {color}",
            rect.x, rect.y, rect.width, rect.height
        ));
        Ok(())
    }

    fn draw_line(
        &mut self,
        page_index: usize,
        start: ExportPoint,
        end: ExportPoint,
        _thickness: f32,
        _color: Color,
        _opacity: f32,
    ) -> Result<(), Self::Error> {
        self.lines.push(format!("line {page_index} {} {} {} {}", start.x, start.y, end.x, end.y));
        Ok(())
    }

    fn draw_circle(
        &mut self,
        page_index: usize,
        center: ExportPoint,
        radius: f32,
        _color: Color,
    ) -> Result<(), Self::Error> {
        self.lines.push(format!("circle {page_index} {} {} {radius}", center.x, center.y));
        Ok(())
    }

    fn draw_text(
        &mut self,
        page_index: usize,
        origin: ExportPoint,
        text: &str,
        _size: f32,
        _color: Color,
    ) -> Result<(), Self::Error> {
        self.lines.push(format!("text {page_index} {} {} {text}", origin.x, origin.y));
        Ok(())
    }

    fn embed_png(&mut self, _png: &[u8]) -> Result<Self::Image, Self::Error> {
        Ok(())
    }

    fn draw_image(
        &mut self,
        page_index: usize,
        _image: &Self::Image,
        placement: ExportRect,
    ) -> Result<(), Self::Error> {
        self.lines.push(format!(
            "image {page_index} {} {} {} {}",
            placement.x, placement.y, placement.width, placement.height
        ));
        Ok(())
    }

    fn save(self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.lines.join("\n").into_bytes())
    }
}

fn pointer(viewer: &mut Viewer, phase: PointerPhase, x: f32, y: f32) -> GestureOutcome {
    viewer.handle(&InputEvent::Pointer(PointerEvent { phase, position: ScreenPoint::new(x, y) }))
}

fn opened_viewer() -> Viewer {
    let mut viewer = Viewer::new(EngineConfig::default());
    viewer
        .apply(|session| {
            session.load(SourceFile::pdf("contract.pdf", b"%PDF-1.7 fixture".to_vec()), &LetterReader)
        })
        .expect("fixture should load");
    viewer.set_layout(PageLayout {
        container_origin: ScreenPoint::new(50.0, 100.0),
        viewport_width: 612.0,
        ..PageLayout::default()
    });
    viewer
}

#[test]
fn draw_comment_undo_and_export() {
    let mut viewer = opened_viewer();
    viewer.apply(|session| session.set_tool(Some(Tool::Highlight)));

    pointer(&mut viewer, PointerPhase::Down, 60.0, 110.0);
    pointer(&mut viewer, PointerPhase::Move, 160.0, 160.0);
    assert!(matches!(viewer.scene().preview, Some(ProjectedPreview::Box { .. })));
    let added = pointer(&mut viewer, PointerPhase::Up, 160.0, 160.0);
    assert!(matches!(added, GestureOutcome::AnnotationAdded(_)));

    let scene = viewer.scene();
    assert!(scene.preview.is_none());
    assert_eq!(scene.annotations.len(), 1);
    assert_eq!(scene.annotations[0].bounds, ScreenRect { x: 10.0, y: 10.0, width: 100.0, height: 50.0 });

    viewer.apply(|session| session.set_tool(Some(Tool::Comment)));
    pointer(&mut viewer, PointerPhase::Down, 350.0, 400.0);
    let requested = pointer(&mut viewer, PointerPhase::Up, 350.0, 400.0);
    assert_eq!(requested, GestureOutcome::CommentRequested(PagePoint::new(300.0, 300.0)));

    // Input waits for the prompt
    assert_eq!(pointer(&mut viewer, PointerPhase::Down, 400.0, 400.0), GestureOutcome::Ignored);
    assert!(viewer.confirm_comment("   ").is_none());
    let comment = viewer.confirm_comment("Check totals").expect("comment should be added");
    assert_eq!(comment.annotation_type(), AnnotationType::Comment);
    assert_eq!(viewer.scene().annotations.len(), 2);

    assert!(viewer.apply(|session| session.undo()));
    assert_eq!(viewer.scene().annotations.len(), 1);
    assert!(viewer.apply(|session| session.redo()));
    assert_eq!(viewer.scene().annotations.len(), 2);

    let exported = viewer.export::<TraceWriter>().expect("export should succeed");
    assert_eq!(exported.file_name, "annotated-contract.pdf");
    assert!(exported.warnings.is_empty());

    let trace = String::from_utf8(exported.bytes).expect("trace is utf-8");
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(
        lines,
        vec![
            "rect 0 10 732 100 50 #FFEB3B",
            "circle 0 310 482 12",
            "text 0 325 482 Check totals",
        ]
    );

    let notifications = viewer.drain_notifications();
    assert_eq!(
        notifications,
        vec![
            Notification::ExportStarted,
            Notification::ExportComplete { file_name: "annotated-contract.pdf".into() },
        ]
    );
}

#[test]
fn zoom_rescales_scene_and_mapping() {
    let mut viewer = opened_viewer();
    viewer.apply(|session| session.set_tool(Some(Tool::Underline)));
    assert_eq!(viewer.apply(|session| session.set_scale(2.0)), 2.0);

    pointer(&mut viewer, PointerPhase::Down, 70.0, 120.0);
    pointer(&mut viewer, PointerPhase::Move, 270.0, 220.0);
    pointer(&mut viewer, PointerPhase::Up, 270.0, 220.0);

    let annotation = viewer.session().annotations()[0].clone();
    assert_eq!(annotation.bounds(), pdf_annotator_core::PageRect::new(10.0, 10.0, 100.0, 50.0));
    assert_eq!(viewer.scene().scale, 2.0);
    assert_eq!(viewer.scene().width, 1224.0);
    assert_eq!(
        viewer.scene().annotations[0].bounds,
        ScreenRect { x: 20.0, y: 20.0, width: 200.0, height: 100.0 }
    );
}

#[test]
fn page_change_drops_gesture_in_flight() {
    let mut viewer = opened_viewer();
    viewer.apply(|session| session.set_tool(Some(Tool::Highlight)));

    pointer(&mut viewer, PointerPhase::Down, 60.0, 110.0);
    pointer(&mut viewer, PointerPhase::Move, 160.0, 160.0);
    assert!(viewer.apply(|session| session.next_page()));

    assert_eq!(viewer.scene().page_number, 2);
    assert!(viewer.scene().preview.is_none());
    assert_eq!(pointer(&mut viewer, PointerPhase::Up, 160.0, 160.0), GestureOutcome::Ignored);
    assert!(viewer.session().annotations().is_empty());
}

#[test]
fn rejected_file_leaves_viewer_empty() {
    let mut viewer = Viewer::default();
    let result = viewer.apply(|session| {
        session.load(
            SourceFile { name: "notes.txt".into(), mime_type: "text/plain".into(), bytes: b"hello".to_vec() },
            &LetterReader,
        )
    });

    assert!(result.is_err());
    assert!(!viewer.session().has_document());
    assert!(viewer.scene().annotations.is_empty());
    assert!(matches!(viewer.drain_notifications().as_slice(), [Notification::LoadFailed { .. }]));
    assert_eq!(pointer(&mut viewer, PointerPhase::Down, 10.0, 10.0), GestureOutcome::Ignored);
}
