//! lopdf-backed document collaborators
//!
//! [`LopdfReader`] reads page geometry for loading, [`LopdfWriter`] burns
//! planned annotations into a copy of the source document, and
//! [`PlaceholderRasterizer`] stands in for a real page renderer.

mod content;
mod raster;
mod reader;
mod writer;

pub use raster::{PlaceholderRasterizer, RgbaImage};
pub use reader::LopdfReader;
pub use writer::{EmbeddedImage, LopdfWriter};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("encrypted PDFs are not supported")]
    Encrypted,
    #[error("document has no pages")]
    NoPages,
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("backend error: {0}")]
    Backend(String),
}
