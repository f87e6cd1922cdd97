use image::{ImageBuffer, Rgba};
use pdf_annotator_core::{LoadedDocument, PageRasterizer, Viewport};

use crate::EngineError;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BORDER: Rgba<u8> = Rgba([220, 220, 220, 255]);

/// Paints a blank bordered sheet at the viewport size
///
/// Useful for hosts that have no real PDF renderer wired in yet; the
/// annotation layer still lines up with the sheet.
#[derive(Debug, Default)]
pub struct PlaceholderRasterizer {
    last_frame: Option<(u32, RgbaImage)>,
}

impl PlaceholderRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page number and pixels of the most recent render
    pub fn last_frame(&self) -> Option<(u32, &RgbaImage)> {
        self.last_frame.as_ref().map(|(page, image)| (*page, image))
    }
}

impl PageRasterizer for PlaceholderRasterizer {
    type Error = EngineError;

    fn render(
        &mut self,
        document: &LoadedDocument,
        page_number: u32,
        viewport: &Viewport,
    ) -> Result<(), Self::Error> {
        if document.page(page_number).is_none() {
            return Err(EngineError::PageOutOfRange { page: page_number, page_count: document.page_count() });
        }

        let width = viewport.width.round().max(1.0) as u32;
        let height = viewport.height.round().max(1.0) as u32;
        let mut image = RgbaImage::from_pixel(width, height, PAPER);

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, BORDER);
                image.put_pixel(x, height - 1, BORDER);
            }
            for y in 0..height {
                image.put_pixel(0, y, BORDER);
                image.put_pixel(width - 1, y, BORDER);
            }
        }

        self.last_frame = Some((page_number, image));
        Ok(())
    }
}
