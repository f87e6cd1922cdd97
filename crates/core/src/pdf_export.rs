//! PDF export of annotations as burned-in page content
//!
//! Export runs in two steps. [`plan_export`] turns the annotation set into
//! export-space drawing directives, one or two per annotation, using the page
//! sizes the output document reports. [`export_with`] then replays the plan
//! against a [`DocumentWriter`] and saves the result.
//!
//! Problems confined to one annotation (an undecodable signature, a page the
//! document does not have) become [`ExportWarning`]s and the export goes on.
//! Anything else aborts the export with an [`ExportError`].

use crate::annotation::{Annotation, AnnotationId, AnnotationKind, Color, PagePoint, PageRect};
use crate::coords::{page_point_to_export, page_rect_to_export, ExportPoint, ExportRect, PageBox};
use std::collections::BTreeMap;

/// Fill opacity for highlight rectangles
pub const HIGHLIGHT_OPACITY: f32 = 0.3;
/// Stroke width of underline segments
pub const UNDERLINE_THICKNESS: f32 = 2.0;
pub const UNDERLINE_OPACITY: f32 = 0.8;
/// Radius of the circular comment marker
pub const COMMENT_MARKER_RADIUS: f32 = 12.0;
/// Marker center offset right of and below the comment anchor
pub const COMMENT_MARKER_OFFSET: f32 = 10.0;
/// Comment text starts this far right of the anchor
pub const COMMENT_TEXT_OFFSET: f32 = 25.0;
pub const COMMENT_TEXT_SIZE: f32 = 10.0;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error types for PDF export operations
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The source bytes could not be opened as a document
    #[error("failed to load source document: {0}")]
    Load(#[source] BoxError),
    /// A drawing call failed for a reason other than a bad signature image
    #[error("failed to draw on page {page_number}: {source}")]
    Draw {
        page_number: u32,
        #[source]
        source: BoxError,
    },
    /// The annotated document could not be serialized
    #[error("failed to save annotated document: {0}")]
    Save(#[source] BoxError),
}

/// Recoverable per-annotation export problem
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportWarning {
    #[error("annotation {annotation_id} is on page {page_number}, which the document does not have")]
    PageMissing {
        annotation_id: AnnotationId,
        page_number: u32,
    },
    #[error("signature {annotation_id} could not be decoded: {reason}")]
    SignatureUndecodable {
        annotation_id: AnnotationId,
        reason: String,
    },
    #[error("signature {annotation_id} could not be embedded: {reason}")]
    SignatureEmbedFailed {
        annotation_id: AnnotationId,
        reason: String,
    },
}

impl ExportWarning {
    pub fn annotation_id(&self) -> AnnotationId {
        match self {
            ExportWarning::PageMissing { annotation_id, .. }
            | ExportWarning::SignatureUndecodable { annotation_id, .. }
            | ExportWarning::SignatureEmbedFailed { annotation_id, .. } => *annotation_id,
        }
    }

    /// Whether the warning concerns a signature image
    pub fn is_signature_failure(&self) -> bool {
        !matches!(self, ExportWarning::PageMissing { .. })
    }
}

/// A single drawing instruction in export space
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDirective {
    Rectangle {
        rect: ExportRect,
        color: Color,
        opacity: f32,
    },
    Line {
        start: ExportPoint,
        end: ExportPoint,
        thickness: f32,
        color: Color,
        opacity: f32,
    },
    Circle {
        center: ExportPoint,
        radius: f32,
        color: Color,
    },
    Text {
        origin: ExportPoint,
        text: String,
        size: f32,
        color: Color,
    },
    /// PNG bytes drawn into `placement` (bottom-left anchored)
    Image { png: Vec<u8>, placement: ExportRect },
}

/// A directive tied to its source annotation and target page
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDirective {
    pub annotation_id: AnnotationId,
    /// 1-based page number
    pub page_number: u32,
    pub directive: ExportDirective,
}

impl PlannedDirective {
    pub fn page_index(&self) -> usize {
        self.page_number.saturating_sub(1) as usize
    }
}

/// Directives for a whole document plus the warnings raised while planning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportPlan {
    pub directives: Vec<PlannedDirective>,
    pub warnings: Vec<ExportWarning>,
}

impl ExportPlan {
    /// Directives targeting one page, in drawing order
    pub fn for_page(&self, page_number: u32) -> impl Iterator<Item = &PlannedDirective> {
        self.directives.iter().filter(move |d| d.page_number == page_number)
    }
}

/// Scale an image down to fit a box, preserving aspect ratio
///
/// Width is checked first, then height, so the limiting side wins. Images that
/// already fit keep their intrinsic size.
pub fn fit_signature(intrinsic: (f32, f32), max: (f32, f32)) -> (f32, f32) {
    let (mut width, mut height) = intrinsic;
    let (max_width, max_height) = max;

    if width > max_width {
        let ratio = max_width / width;
        width = max_width;
        height *= ratio;
    }
    if height > max_height {
        let ratio = max_height / height;
        height = max_height;
        width *= ratio;
    }

    (width, height)
}

/// Flip a view-space point on `page` into export space
fn point_to_export(page: &PageBox, point: PagePoint) -> ExportPoint {
    page_point_to_export(page.unrotate_point(point), page.height)
}

/// Flip a view-space box on `page` into export space
fn rect_to_export(page: &PageBox, rect: PageRect) -> ExportRect {
    page_rect_to_export(page.unrotate_rect(rect), page.height)
}

/// Compute the export directives for every annotation
///
/// `pages` holds the output document's page boxes, indexed by page number - 1.
/// Directives are grouped by page and keep store order within a page.
pub fn plan_export(annotations: &[Annotation], pages: &[PageBox]) -> ExportPlan {
    let mut by_page: BTreeMap<u32, Vec<&Annotation>> = BTreeMap::new();
    for annotation in annotations {
        by_page.entry(annotation.page_number()).or_default().push(annotation);
    }

    let mut plan = ExportPlan::default();

    for (page_number, page_annotations) in by_page {
        let Some(page) = page_number.checked_sub(1).and_then(|i| pages.get(i as usize)) else {
            for annotation in page_annotations {
                tracing::warn!(id = %annotation.id(), page_number, "annotation targets a missing page");
                plan.warnings.push(ExportWarning::PageMissing {
                    annotation_id: annotation.id(),
                    page_number,
                });
            }
            continue;
        };

        for annotation in page_annotations {
            let mut push = |directive| {
                plan.directives.push(PlannedDirective {
                    annotation_id: annotation.id(),
                    page_number,
                    directive,
                })
            };

            match annotation.kind() {
                AnnotationKind::Highlight { bounds } => push(ExportDirective::Rectangle {
                    rect: rect_to_export(page, *bounds),
                    color: annotation.color(),
                    opacity: HIGHLIGHT_OPACITY,
                }),
                AnnotationKind::Underline { bounds } => push(ExportDirective::Line {
                    start: point_to_export(page, PagePoint::new(bounds.x, bounds.bottom())),
                    end: point_to_export(page, PagePoint::new(bounds.right(), bounds.bottom())),
                    thickness: UNDERLINE_THICKNESS,
                    color: annotation.color(),
                    opacity: UNDERLINE_OPACITY,
                }),
                AnnotationKind::Comment { anchor, content } => {
                    let at = point_to_export(page, *anchor);
                    push(ExportDirective::Circle {
                        center: ExportPoint {
                            x: at.x + COMMENT_MARKER_OFFSET,
                            y: at.y - COMMENT_MARKER_OFFSET,
                        },
                        radius: COMMENT_MARKER_RADIUS,
                        color: Color::MARKER_BLUE,
                    });
                    if !content.is_empty() {
                        push(ExportDirective::Text {
                            origin: ExportPoint {
                                x: at.x + COMMENT_TEXT_OFFSET,
                                y: at.y - COMMENT_MARKER_OFFSET,
                            },
                            text: content.clone(),
                            size: COMMENT_TEXT_SIZE,
                            color: Color::BLACK,
                        });
                    }
                }
                AnnotationKind::Signature { bounds, image } => match image.decode() {
                    Ok(decoded) => {
                        let (width, height) = fit_signature(
                            (decoded.width as f32, decoded.height as f32),
                            (bounds.width, bounds.height),
                        );
                        let drawn = PageRect::new(bounds.x, bounds.y, width, height);
                        push(ExportDirective::Image {
                            png: decoded.png,
                            placement: rect_to_export(page, drawn),
                        });
                    }
                    Err(err) => {
                        tracing::warn!(id = %annotation.id(), error = %err, "skipping undecodable signature");
                        plan.warnings.push(ExportWarning::SignatureUndecodable {
                            annotation_id: annotation.id(),
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }
    }

    plan
}

/// Output document collaborator
///
/// Implementations open a copy of the source bytes, draw onto page content
/// and serialize the result. Coordinates are export space.
pub trait DocumentWriter: Sized {
    /// Handle to an embedded image
    type Image;
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(bytes: &[u8]) -> Result<Self, Self::Error>;

    /// Unrotated size and rotation of every page, in page order
    fn page_boxes(&self) -> Result<Vec<PageBox>, Self::Error>;

    fn draw_rectangle(
        &mut self,
        page_index: usize,
        rect: ExportRect,
        color: Color,
        opacity: f32,
    ) -> Result<(), Self::Error>;

    fn draw_line(
        &mut self,
        page_index: usize,
        start: ExportPoint,
        end: ExportPoint,
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), Self::Error>;

    fn draw_circle(
        &mut self,
        page_index: usize,
        center: ExportPoint,
        radius: f32,
        color: Color,
    ) -> Result<(), Self::Error>;

    fn draw_text(
        &mut self,
        page_index: usize,
        origin: ExportPoint,
        text: &str,
        size: f32,
        color: Color,
    ) -> Result<(), Self::Error>;

    fn embed_png(&mut self, png: &[u8]) -> Result<Self::Image, Self::Error>;

    fn draw_image(
        &mut self,
        page_index: usize,
        image: &Self::Image,
        placement: ExportRect,
    ) -> Result<(), Self::Error>;

    fn save(self) -> Result<Vec<u8>, Self::Error>;
}

/// Bytes of an annotated document and the warnings raised producing it
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub bytes: Vec<u8>,
    pub warnings: Vec<ExportWarning>,
}

/// Burn `annotations` into a fresh copy of `source` with writer `W`
pub fn export_with<W: DocumentWriter>(
    source: &[u8],
    annotations: &[Annotation],
) -> Result<ExportOutcome, ExportError> {
    let mut writer = W::load(source).map_err(|e| ExportError::Load(Box::new(e)))?;
    let pages = writer.page_boxes().map_err(|e| ExportError::Load(Box::new(e)))?;

    let ExportPlan { directives, mut warnings } = plan_export(annotations, &pages);
    tracing::debug!(directives = directives.len(), pages = pages.len(), "export planned");

    for planned in directives {
        let page_index = planned.page_index();
        let drawn = match planned.directive {
            ExportDirective::Rectangle { rect, color, opacity } => {
                writer.draw_rectangle(page_index, rect, color, opacity)
            }
            ExportDirective::Line { start, end, thickness, color, opacity } => {
                writer.draw_line(page_index, start, end, thickness, color, opacity)
            }
            ExportDirective::Circle { center, radius, color } => {
                writer.draw_circle(page_index, center, radius, color)
            }
            ExportDirective::Text { origin, text, size, color } => {
                writer.draw_text(page_index, origin, &text, size, color)
            }
            ExportDirective::Image { png, placement } => match writer.embed_png(&png) {
                Ok(image) => writer.draw_image(page_index, &image, placement),
                Err(err) => {
                    tracing::warn!(id = %planned.annotation_id, error = %err, "signature embed failed");
                    warnings.push(ExportWarning::SignatureEmbedFailed {
                        annotation_id: planned.annotation_id,
                        reason: err.to_string(),
                    });
                    Ok(())
                }
            },
        };

        drawn.map_err(|e| ExportError::Draw {
            page_number: planned.page_number,
            source: Box::new(e),
        })?;
    }

    let bytes = writer.save().map_err(|e| ExportError::Save(Box::new(e)))?;
    Ok(ExportOutcome { bytes, warnings })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::coords::Rotation;
    use crate::signature::tests::png_fixture;
    use crate::signature::SignatureImage;

    fn annotation(page: u32, kind: AnnotationKind, color: Color) -> Annotation {
        Annotation::from_parts(AnnotationId::new_v4(), page, kind, color)
    }

    fn letter() -> Vec<PageBox> {
        vec![PageBox::new(612.0, 792.0, Rotation::None); 2]
    }

    /// Records every call; pages are 612 x 200 unless configured otherwise
    #[derive(Debug, Default)]
    pub(crate) struct RecordingWriter {
        pub(crate) pages: Vec<PageBox>,
        pub(crate) calls: Vec<String>,
        pub(crate) reject_images: bool,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recording writer failure: {0}")]
    pub(crate) struct RecordingError(pub(crate) String);

    impl DocumentWriter for RecordingWriter {
        type Image = usize;
        type Error = RecordingError;

        fn load(bytes: &[u8]) -> Result<Self, Self::Error> {
            match bytes {
                b"%PDF-reject-images" => Ok(Self {
                    pages: vec![PageBox::new(612.0, 200.0, Rotation::None)],
                    reject_images: true,
                    ..Self::default()
                }),
                b if b.starts_with(b"%PDF") => Ok(Self {
                    pages: vec![PageBox::new(612.0, 200.0, Rotation::None)],
                    ..Self::default()
                }),
                _ => Err(RecordingError("not a pdf".into())),
            }
        }

        fn page_boxes(&self) -> Result<Vec<PageBox>, Self::Error> {
            Ok(self.pages.clone())
        }

        fn draw_rectangle(
            &mut self,
            page_index: usize,
            rect: ExportRect,
            _color: Color,
            opacity: f32,
        ) -> Result<(), Self::Error> {
            self.calls.push(format!(
                "rect p{page_index} {} {} {} {} a{opacity}",
                rect.x, rect.y, rect.width, rect.height
            ));
            Ok(())
        }

        fn draw_line(
            &mut self,
            page_index: usize,
            start: ExportPoint,
            end: ExportPoint,
            thickness: f32,
            _color: Color,
            _opacity: f32,
        ) -> Result<(), Self::Error> {
            self.calls.push(format!(
                "line p{page_index} {} {} {} {} w{thickness}",
                start.x, start.y, end.x, end.y
            ));
            Ok(())
        }

        fn draw_circle(
            &mut self,
            page_index: usize,
            center: ExportPoint,
            radius: f32,
            _color: Color,
        ) -> Result<(), Self::Error> {
            self.calls.push(format!("circle p{page_index} {} {} r{radius}", center.x, center.y));
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
            self.calls.push(format!("text p{page_index} {} {} {text}", origin.x, origin.y));
            Ok(())
        }

        fn embed_png(&mut self, png: &[u8]) -> Result<Self::Image, Self::Error> {
            if self.reject_images {
                return Err(RecordingError("embedding disabled".into()));
            }
            Ok(png.len())
        }

        fn draw_image(
            &mut self,
            page_index: usize,
            _image: &Self::Image,
            placement: ExportRect,
        ) -> Result<(), Self::Error> {
            self.calls.push(format!(
                "image p{page_index} {} {} {} {}",
                placement.x, placement.y, placement.width, placement.height
            ));
            Ok(())
        }

        fn save(self) -> Result<Vec<u8>, Self::Error> {
            Ok(self.calls.join("\n").into_bytes())
        }
    }

    #[test]
    fn fit_signature_scales_down_only() {
        assert_eq!(fit_signature((400.0, 100.0), (200.0, 100.0)), (200.0, 50.0));
        assert_eq!(fit_signature((100.0, 400.0), (200.0, 100.0)), (25.0, 100.0));
        assert_eq!(fit_signature((50.0, 20.0), (200.0, 100.0)), (50.0, 20.0));
    }

    #[test]
    fn highlight_is_flipped_into_export_space() {
        let highlight = annotation(
            1,
            AnnotationKind::Highlight { bounds: PageRect::new(10.0, 20.0, 30.0, 40.0) },
            Color::AMBER,
        );
        let pages = [PageBox::new(612.0, 200.0, Rotation::None)];
        let plan = plan_export(&[highlight], &pages);

        assert_eq!(
            plan.directives[0].directive,
            ExportDirective::Rectangle {
                rect: ExportRect { x: 10.0, y: 140.0, width: 30.0, height: 40.0 },
                color: Color::AMBER,
                opacity: HIGHLIGHT_OPACITY,
            }
        );
    }

    #[test]
    fn underline_sits_on_bottom_edge() {
        let underline = annotation(
            1,
            AnnotationKind::Underline { bounds: PageRect::new(50.0, 100.0, 200.0, 20.0) },
            Color::AZURE,
        );
        let plan = plan_export(&[underline], &letter());
        match &plan.directives[0].directive {
            ExportDirective::Line { start, end, thickness, opacity, .. } => {
                assert_eq!(*start, ExportPoint { x: 50.0, y: 672.0 });
                assert_eq!(*end, ExportPoint { x: 250.0, y: 672.0 });
                assert_eq!(*thickness, 2.0);
                assert_eq!(*opacity, 0.8);
            }
            other => panic!("unexpected directive {other:?}"),
        }
    }

    #[test]
    fn comment_emits_marker_and_text() {
        let comment = annotation(
            2,
            AnnotationKind::Comment { anchor: PagePoint::new(100.0, 50.0), content: "check".into() },
            Color::AMBER,
        );
        let empty = annotation(
            2,
            AnnotationKind::Comment { anchor: PagePoint::new(0.0, 0.0), content: String::new() },
            Color::AMBER,
        );
        let plan = plan_export(&[comment, empty], &letter());

        assert_eq!(plan.directives.len(), 3);
        assert_eq!(
            plan.directives[0].directive,
            ExportDirective::Circle {
                center: ExportPoint { x: 110.0, y: 732.0 },
                radius: 12.0,
                color: Color::MARKER_BLUE,
            }
        );
        assert!(matches!(
            &plan.directives[1].directive,
            ExportDirective::Text { origin, text, .. } if origin.x == 125.0 && origin.y == 732.0 && text == "check"
        ));
        assert!(plan.for_page(2).all(|d| d.page_index() == 1));
    }

    #[test]
    fn signature_is_fitted_and_anchored_at_top() {
        let signature = annotation(
            1,
            AnnotationKind::Signature {
                bounds: PageRect::new(100.0, 100.0, 200.0, 100.0),
                image: SignatureImage::from_png_bytes(&png_fixture(400, 100)),
            },
            Color::AMBER,
        );
        let plan = plan_export(&[signature], &letter());
        match &plan.directives[0].directive {
            ExportDirective::Image { placement, png } => {
                assert!(!png.is_empty());
                assert_eq!(*placement, ExportRect { x: 100.0, y: 642.0, width: 200.0, height: 50.0 });
            }
            other => panic!("unexpected directive {other:?}"),
        }
    }

    #[test]
    fn bad_signature_and_missing_page_become_warnings() {
        let broken = annotation(
            1,
            AnnotationKind::Signature {
                bounds: PageRect::new(0.0, 0.0, 200.0, 100.0),
                image: SignatureImage::from_data_uri("data:image/png;base64,AAAA"),
            },
            Color::AMBER,
        );
        let stray = annotation(
            9,
            AnnotationKind::Highlight { bounds: PageRect::new(0.0, 0.0, 10.0, 10.0) },
            Color::AMBER,
        );
        let fine = annotation(
            1,
            AnnotationKind::Highlight { bounds: PageRect::new(0.0, 0.0, 10.0, 10.0) },
            Color::AMBER,
        );

        let plan = plan_export(&[broken.clone(), stray.clone(), fine.clone()], &letter());
        assert_eq!(plan.directives.len(), 1);
        assert_eq!(plan.directives[0].annotation_id, fine.id());
        assert_eq!(plan.warnings.len(), 2);
        assert!(plan.warnings.iter().any(|w| w.annotation_id() == broken.id() && w.is_signature_failure()));
        assert!(plan.warnings.contains(&ExportWarning::PageMissing {
            annotation_id: stray.id(),
            page_number: 9,
        }));
    }

    #[test]
    fn rotated_page_maps_back_to_unrotated_box() {
        // Page shown a quarter turn clockwise: 800 wide, 600 tall on screen
        let pages = [PageBox::new(600.0, 800.0, Rotation::Quarter)];
        let highlight = annotation(
            1,
            AnnotationKind::Highlight { bounds: PageRect::new(0.0, 0.0, 100.0, 50.0) },
            Color::AMBER,
        );
        let plan = plan_export(&[highlight], &pages);
        match &plan.directives[0].directive {
            ExportDirective::Rectangle { rect, .. } => {
                // View top-left corner is the unrotated page's bottom-left corner
                assert_eq!(*rect, ExportRect { x: 0.0, y: 0.0, width: 50.0, height: 100.0 });
            }
            other => panic!("unexpected directive {other:?}"),
        }
    }

    #[test]
    fn export_replays_plan_through_writer() {
        let highlight = annotation(
            1,
            AnnotationKind::Highlight { bounds: PageRect::new(10.0, 20.0, 30.0, 40.0) },
            Color::AMBER,
        );
        let outcome = export_with::<RecordingWriter>(b"%PDF-1.7", &[highlight]).unwrap();
        assert_eq!(String::from_utf8(outcome.bytes).unwrap(), "rect p0 10 140 30 40 a0.3");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn embed_failure_is_a_warning() {
        let signature = annotation(
            1,
            AnnotationKind::Signature {
                bounds: PageRect::new(0.0, 0.0, 200.0, 100.0),
                image: SignatureImage::from_png_bytes(&png_fixture(10, 10)),
            },
            Color::AMBER,
        );
        let comment = annotation(
            1,
            AnnotationKind::Comment { anchor: PagePoint::new(0.0, 0.0), content: String::new() },
            Color::AMBER,
        );
        let outcome =
            export_with::<RecordingWriter>(b"%PDF-reject-images", &[signature.clone(), comment]).unwrap();

        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            &outcome.warnings[0],
            ExportWarning::SignatureEmbedFailed { annotation_id, .. } if *annotation_id == signature.id()
        ));
        assert_eq!(String::from_utf8(outcome.bytes).unwrap(), "circle p0 10 190 r12");
    }

    #[test]
    fn unreadable_source_aborts() {
        let err = export_with::<RecordingWriter>(b"GIF89a", &[]).unwrap_err();
        assert!(matches!(err, ExportError::Load(_)));
    }
}
