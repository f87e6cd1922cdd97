//! Embedded signature images
//!
//! Signatures carry their raster as a data URI (`data:image/png;base64,...`),
//! the same string a drawing surface hands back when the user applies a
//! signature. Decoding happens lazily, at export time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Error decoding a signature payload
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("signature data has no payload")]
    MissingPayload,
    #[error("signature payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("signature payload is not a readable PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// A PNG raster encoded as a data URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureImage {
    data_uri: String,
}

/// Decoded signature bytes plus intrinsic pixel size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSignature {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl SignatureImage {
    pub fn from_data_uri(data_uri: impl Into<String>) -> Self {
        Self { data_uri: data_uri.into() }
    }

    /// Wrap raw PNG bytes into a data URI
    pub fn from_png_bytes(png: &[u8]) -> Self {
        Self { data_uri: format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png)) }
    }

    pub fn as_data_uri(&self) -> &str {
        &self.data_uri
    }

    /// The base64 text after the first comma, if any
    fn payload(&self) -> Option<&str> {
        self.data_uri.split_once(',').map(|(_, payload)| payload).filter(|p| !p.trim().is_empty())
    }

    /// Whether the URI carries no payload at all
    pub fn is_empty(&self) -> bool {
        self.payload().is_none()
    }

    /// Decode the base64 payload into PNG bytes
    pub fn png_bytes(&self) -> Result<Vec<u8>, ImageError> {
        let payload = self.payload().ok_or(ImageError::MissingPayload)?;
        Ok(STANDARD.decode(payload.trim())?)
    }

    /// Decode the payload and read the PNG header for its pixel size
    pub fn decode(&self) -> Result<DecodedSignature, ImageError> {
        let png = self.png_bytes()?;
        let (width, height) =
            ImageReader::with_format(Cursor::new(png.as_slice()), ImageFormat::Png).into_dimensions()?;
        Ok(DecodedSignature { png, width, height })
    }
}
