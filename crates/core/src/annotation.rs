//! Annotation data model
//!
//! Every annotation lives in page-space: unscaled units of the page as it is
//! shown at zoom 1.0, origin at the top-left corner, y increasing downward.
//! Screen-space and export-space positions are never stored; they are derived
//! on demand by [`crate::coords`].

use crate::signature::SignatureImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an annotation
///
/// Assigned by the store when an annotation is added. Never reused within a
/// session and never changed by updates.
pub type AnnotationId = uuid::Uuid;

/// Point in page-space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

impl PagePoint {
    /// Create a new page-space point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance_to(&self, other: &PagePoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Return this point moved by the given delta
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned box in page-space, anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build the box spanned by two arbitrary corners
    pub fn from_corners(a: PagePoint, b: PagePoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// A zero-sized box at a point
    pub fn at_point(point: PagePoint) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    pub fn origin(&self) -> PagePoint {
        PagePoint::new(self.x, self.y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Inclusive containment test
    pub fn contains(&self, point: &PagePoint) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow width and height to at least `min`, keeping the top-left corner
    pub fn with_min_size(&self, min: f32) -> Self {
        Self::new(self.x, self.y, self.width.max(min), self.height.max(min))
    }
}

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to normalized RGB values (0.0 to 1.0), dropping alpha
    pub fn to_normalized_rgb(&self) -> (f32, f32, f32) {
        (self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0)
    }

    /// Parse a CSS-style color, falling back to black for anything unrecognized
    pub fn parse_lossy(value: &str) -> Self {
        value.parse().unwrap_or(Color::BLACK)
    }
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    /// Default highlight yellow
    pub const AMBER: Color = Color { r: 0xFF, g: 0xEB, b: 0x3B, a: 255 };
    /// Default underline blue
    pub const AZURE: Color = Color { r: 0x42, g: 0x85, b: 0xF4, a: 255 };
    /// Fill used for comment markers in exported documents
    pub const MARKER_BLUE: Color = Color { r: 0, g: 128, b: 255, a: 255 };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized color value: {0:?}")]
pub struct ColorParseError(pub String);

impl FromStr for Color {
    type Err = ColorParseError;

    /// Accepts `#rrggbb`, `#rgb`, `rgb(r, g, b)`, `rgba(r, g, b, a)` and a
    /// handful of named colors.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let err = || ColorParseError(value.to_string());

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(err());
            }
            let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| err());
            return match hex.len() {
                6 => Ok(Color::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
                3 => {
                    let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                    Ok(Color::rgb(short(0)?, short(1)?, short(2)?))
                }
                _ => Err(err()),
            };
        }

        if trimmed.starts_with("rgb") {
            let inner = trimmed
                .split_once('(')
                .and_then(|(_, rest)| rest.strip_suffix(')'))
                .ok_or_else(err)?;
            let parts: Vec<f32> = inner
                .split(',')
                .map(|part| part.trim().parse::<f32>().map_err(|_| err()))
                .collect::<Result<_, _>>()?;
            if parts.len() < 3 {
                return Err(err());
            }
            let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
            let alpha = parts.get(3).map(|a| to_u8(a * 255.0)).unwrap_or(255);
            return Ok(Color::new(to_u8(parts[0]), to_u8(parts[1]), to_u8(parts[2]), alpha));
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "black" => Ok(Color::BLACK),
            "white" => Ok(Color::WHITE),
            "red" => Ok(Color::rgb(255, 0, 0)),
            "green" => Ok(Color::rgb(0, 128, 0)),
            "blue" => Ok(Color::rgb(0, 0, 255)),
            "yellow" => Ok(Color::rgb(255, 255, 0)),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// The closed set of annotation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Highlight,
    Underline,
    Comment,
    Signature,
}

impl AnnotationType {
    /// Human-readable label shown next to a selected annotation
    pub fn label(&self) -> &'static str {
        match self {
            AnnotationType::Highlight => "Highlight",
            AnnotationType::Underline => "Underline",
            AnnotationType::Comment => "Comment",
            AnnotationType::Signature => "Signature",
        }
    }
}

/// Type-specific geometry and payload
///
/// Box-shaped kinds carry a [`PageRect`]; comments are point-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight { bounds: PageRect },
    Underline { bounds: PageRect },
    Comment { anchor: PagePoint, content: String },
    Signature { bounds: PageRect, image: SignatureImage },
}

impl AnnotationKind {
    pub fn annotation_type(&self) -> AnnotationType {
        match self {
            AnnotationKind::Highlight { .. } => AnnotationType::Highlight,
            AnnotationKind::Underline { .. } => AnnotationType::Underline,
            AnnotationKind::Comment { .. } => AnnotationType::Comment,
            AnnotationKind::Signature { .. } => AnnotationType::Signature,
        }
    }

    /// Bounding box; point-only kinds report zero width and height
    pub fn bounds(&self) -> PageRect {
        match self {
            AnnotationKind::Highlight { bounds }
            | AnnotationKind::Underline { bounds }
            | AnnotationKind::Signature { bounds, .. } => *bounds,
            AnnotationKind::Comment { anchor, .. } => PageRect::at_point(*anchor),
        }
    }

    fn with_bounds(&self, new_bounds: PageRect) -> Self {
        match self {
            AnnotationKind::Highlight { .. } => AnnotationKind::Highlight { bounds: new_bounds },
            AnnotationKind::Underline { .. } => AnnotationKind::Underline { bounds: new_bounds },
            AnnotationKind::Signature { image, .. } => {
                AnnotationKind::Signature { bounds: new_bounds, image: image.clone() }
            }
            AnnotationKind::Comment { content, .. } => {
                AnnotationKind::Comment { anchor: new_bounds.origin(), content: content.clone() }
            }
        }
    }
}

/// Structural view of an annotation's position
///
/// `width`/`height` are `None` for point-only annotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// An annotation before the store has assigned it an id
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDraft {
    /// 1-based page number
    pub page_number: u32,
    pub kind: AnnotationKind,
    /// Explicit color; resolved from the palette when `None`
    pub color: Option<Color>,
}

impl AnnotationDraft {
    pub fn new(page_number: u32, kind: AnnotationKind) -> Self {
        Self { page_number, kind, color: None }
    }

    pub fn highlight(page_number: u32, bounds: PageRect) -> Self {
        Self::new(page_number, AnnotationKind::Highlight { bounds })
    }

    pub fn underline(page_number: u32, bounds: PageRect) -> Self {
        Self::new(page_number, AnnotationKind::Underline { bounds })
    }

    pub fn comment(page_number: u32, anchor: PagePoint, content: impl Into<String>) -> Self {
        Self::new(page_number, AnnotationKind::Comment { anchor, content: content.into() })
    }

    pub fn signature(page_number: u32, bounds: PageRect, image: SignatureImage) -> Self {
        Self::new(page_number, AnnotationKind::Signature { bounds, image })
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// A stored annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    id: AnnotationId,
    page_number: u32,
    #[serde(flatten)]
    kind: AnnotationKind,
    color: Color,
}

impl Annotation {
    /// Assemble an annotation with a known id (used by the store)
    pub(crate) fn from_parts(id: AnnotationId, page_number: u32, kind: AnnotationKind, color: Color) -> Self {
        Self { id, page_number, kind, color }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    /// 1-based page number
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn kind(&self) -> &AnnotationKind {
        &self.kind
    }

    pub fn annotation_type(&self) -> AnnotationType {
        self.kind.annotation_type()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Bounding box in page-space (zero-sized for comments)
    pub fn bounds(&self) -> PageRect {
        self.kind.bounds()
    }

    pub fn position(&self) -> Position {
        let bounds = self.bounds();
        match self.kind {
            AnnotationKind::Comment { .. } => {
                Position { x: bounds.x, y: bounds.y, width: None, height: None }
            }
            _ => Position {
                x: bounds.x,
                y: bounds.y,
                width: Some(bounds.width),
                height: Some(bounds.height),
            },
        }
    }

    /// Whether corner handles apply to this annotation
    pub fn is_resizable(&self) -> bool {
        !matches!(self.kind, AnnotationKind::Comment { .. })
    }

    /// Area used for pointer hit testing
    ///
    /// Comments have no size of their own, so they are hit through their
    /// marker, a `marker_size` square whose top-left corner is the anchor.
    pub fn hit_box(&self, marker_size: f32) -> PageRect {
        match self.kind {
            AnnotationKind::Comment { anchor, .. } => {
                PageRect::new(anchor.x, anchor.y, marker_size, marker_size)
            }
            _ => self.bounds(),
        }
    }

    /// Copy moved by a page-space delta (id, page and payload preserved)
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let bounds = self.bounds().translated(dx, dy);
        self.with_bounds(bounds)
    }

    /// Copy with new geometry; comments only take the new origin
    pub fn with_bounds(&self, bounds: PageRect) -> Self {
        let mut updated = self.clone();
        updated.kind = self.kind.with_bounds(bounds);
        updated
    }

    pub fn with_color(&self, color: Color) -> Self {
        let mut updated = self.clone();
        updated.color = color;
        updated
    }

    /// Copy with a replaced comment text; other kinds are returned unchanged
    pub fn with_content(&self, text: impl Into<String>) -> Self {
        let mut updated = self.clone();
        if let AnnotationKind::Comment { content, .. } = &mut updated.kind {
            *content = text.into();
        }
        updated
    }
}
