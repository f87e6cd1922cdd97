//! Burns annotation drawing into page content
//!
//! Drawing calls are buffered per page. On save, each touched page gets its
//! existing content wrapped in `q`/`Q` followed by one new overlay stream;
//! the overlay always starts from the default graphics state. Resources the
//! overlay needs are merged into a direct copy of the page's (possibly
//! inherited) resource dictionary.

use std::collections::BTreeMap;

use image::ImageFormat;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pdf_annotator_core::{Color, DocumentWriter, ExportPoint, ExportRect, PageBox};

use crate::content;
use crate::reader::{inherited, open_document, page_geometry, resolve, resolve_dict, PageGeometry};
use crate::EngineError;

const FONT_RESOURCE: &str = "AnnotF1";

/// An image XObject added to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    id: ObjectId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default)]
struct PageOverlay {
    operations: Vec<Operation>,
    /// Resource name to opacity
    graphics_states: BTreeMap<String, f32>,
    /// Resource name to image object
    images: BTreeMap<String, ObjectId>,
    uses_font: bool,
}

/// [`DocumentWriter`] over an in-memory lopdf document
#[derive(Debug)]
pub struct LopdfWriter {
    document: Document,
    pages: Vec<PageGeometry>,
    overlays: BTreeMap<usize, PageOverlay>,
    font: Option<ObjectId>,
    images_embedded: usize,
}

impl LopdfWriter {
    fn overlay(&mut self, page_index: usize) -> Result<&mut PageOverlay, EngineError> {
        if page_index >= self.pages.len() {
            return Err(EngineError::PageOutOfRange {
                page: page_index as u32 + 1,
                page_count: self.pages.len() as u32,
            });
        }
        Ok(self.overlays.entry(page_index).or_default())
    }

    /// Name of the graphics state for `opacity`, registering it on the page
    fn opacity_state(overlay: &mut PageOverlay, opacity: f32) -> String {
        let name = format!("AnnotGs{}", (opacity.clamp(0.0, 1.0) * 1000.0).round() as u32);
        overlay.graphics_states.insert(name.clone(), opacity.clamp(0.0, 1.0));
        name
    }

    fn font_object(&mut self) -> ObjectId {
        *self.font.get_or_insert_with(|| {
            self.document.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }

    fn apply_overlay(&mut self, page_index: usize, overlay: PageOverlay) -> Result<(), EngineError> {
        let geometry = self.pages[page_index];
        let page_id = geometry.id;

        let mut operations = vec![content::restore(), content::save()];
        if geometry.origin != (0.0, 0.0) {
            operations.push(content::translate(geometry.origin.0, geometry.origin.1));
        }
        operations.extend(overlay.operations);
        operations.push(content::restore());
        let encoded = Content { operations }.encode()?;

        let mut resources = inherited(&self.document, page_id, b"Resources")
            .and_then(|object| resolve_dict(&self.document, object))
            .cloned()
            .unwrap_or_else(Dictionary::new);

        let graphics_states = overlay.graphics_states.into_iter().map(|(name, opacity)| {
            let state = dictionary! { "Type" => "ExtGState", "CA" => opacity, "ca" => opacity };
            (name, Object::Dictionary(state))
        });
        self.merge_resources(&mut resources, b"ExtGState", graphics_states);
        self.merge_resources(
            &mut resources,
            b"XObject",
            overlay.images.into_iter().map(|(name, id)| (name, Object::Reference(id))),
        );
        if overlay.uses_font {
            let font = self.font_object();
            self.merge_resources(
                &mut resources,
                b"Font",
                std::iter::once((FONT_RESOURCE.to_string(), Object::Reference(font))),
            );
        }

        let mut contents = vec![Object::Reference(
            self.document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec())),
        )];
        contents.extend(self.existing_contents(page_id));
        contents.push(Object::Reference(self.document.add_object(Stream::new(Dictionary::new(), encoded))));

        let page = self.document.get_object_mut(page_id).and_then(|object| object.as_dict_mut())?;
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn merge_resources(
        &self,
        resources: &mut Dictionary,
        category: &[u8],
        entries: impl IntoIterator<Item = (String, Object)>,
    ) {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            return;
        }

        let mut merged = resources
            .get(category)
            .ok()
            .and_then(|object| resolve_dict(&self.document, object))
            .cloned()
            .unwrap_or_else(Dictionary::new);
        for (name, value) in entries {
            merged.set(name, value);
        }
        resources.set(category, Object::Dictionary(merged));
    }

    /// Content stream references of a page, with an indirect array flattened
    fn existing_contents(&self, page_id: ObjectId) -> Vec<Object> {
        let Ok(page) = self.document.get_dictionary(page_id) else {
            return Vec::new();
        };
        match page.get(b"Contents") {
            Ok(reference @ Object::Reference(_)) => match resolve(&self.document, reference) {
                Object::Array(items) => items.clone(),
                _ => vec![reference.clone()],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}

impl DocumentWriter for LopdfWriter {
    type Image = EmbeddedImage;
    type Error = EngineError;

    fn load(bytes: &[u8]) -> Result<Self, Self::Error> {
        let document = open_document(bytes)?;
        let pages = page_geometry(&document)?;
        Ok(Self { document, pages, overlays: BTreeMap::new(), font: None, images_embedded: 0 })
    }

    fn page_boxes(&self) -> Result<Vec<PageBox>, Self::Error> {
        Ok(self.pages.iter().map(|geometry| geometry.page).collect())
    }

    fn draw_rectangle(
        &mut self,
        page_index: usize,
        rect: ExportRect,
        color: Color,
        opacity: f32,
    ) -> Result<(), Self::Error> {
        let overlay = self.overlay(page_index)?;
        let state = Self::opacity_state(overlay, opacity);
        overlay.operations.extend([content::save(), content::graphics_state(&state), content::fill_color(color)]);
        overlay.operations.extend(content::filled_rectangle(rect));
        overlay.operations.push(content::restore());
        Ok(())
    }

    fn draw_line(
        &mut self,
        page_index: usize,
        start: ExportPoint,
        end: ExportPoint,
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), Self::Error> {
        let overlay = self.overlay(page_index)?;
        let state = Self::opacity_state(overlay, opacity);
        overlay.operations.extend([content::save(), content::graphics_state(&state), content::stroke_color(color)]);
        overlay.operations.extend(content::stroked_line(start, end, thickness));
        overlay.operations.push(content::restore());
        Ok(())
    }

    fn draw_circle(
        &mut self,
        page_index: usize,
        center: ExportPoint,
        radius: f32,
        color: Color,
    ) -> Result<(), Self::Error> {
        let overlay = self.overlay(page_index)?;
        overlay.operations.extend([content::save(), content::fill_color(color)]);
        overlay.operations.extend(content::filled_circle(center, radius));
        overlay.operations.push(content::restore());
        Ok(())
    }

    fn draw_text(
        &mut self,
        page_index: usize,
        origin: ExportPoint,
        text: &str,
        size: f32,
        color: Color,
    ) -> Result<(), Self::Error> {
        let overlay = self.overlay(page_index)?;
        overlay.uses_font = true;
        overlay.operations.extend([content::save(), content::fill_color(color)]);
        overlay.operations.extend(content::text_line(FONT_RESOURCE, origin, text, size));
        overlay.operations.push(content::restore());
        Ok(())
    }

    /// Decode a PNG into an RGB image XObject with its alpha as a soft mask
    fn embed_png(&mut self, png: &[u8]) -> Result<Self::Image, Self::Error> {
        let decoded = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
        let (width, height) = decoded.dimensions();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in decoded.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mask = self.document.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        let id = self.document.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => mask,
            },
            rgb,
        ));

        self.images_embedded += 1;
        tracing::debug!(width, height, "embedded signature image");
        Ok(EmbeddedImage { id, width, height })
    }

    fn draw_image(
        &mut self,
        page_index: usize,
        image: &Self::Image,
        placement: ExportRect,
    ) -> Result<(), Self::Error> {
        let overlay = self.overlay(page_index)?;
        let name = format!("AnnotIm{}", overlay.images.len() + 1);
        overlay.images.insert(name.clone(), image.id);
        overlay.operations.extend(content::placed_image(&name, placement));
        Ok(())
    }

    fn save(mut self) -> Result<Vec<u8>, Self::Error> {
        let overlays = std::mem::take(&mut self.overlays);
        let touched = overlays.len();
        for (page_index, overlay) in overlays {
            self.apply_overlay(page_index, overlay)?;
        }

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        tracing::info!(pages = touched, images = self.images_embedded, bytes = bytes.len(), "document written");
        Ok(bytes)
    }
}
