//! Coordinate mapping between screen, page and export space
//!
//! - Screen space: viewport pixels, scaled by the zoom factor, relative to the
//!   window (pointer events arrive here).
//! - Page space: unscaled, origin top-left, y down. The only space the store
//!   keeps.
//! - Export space: the PDF's native space, unscaled, origin bottom-left, y up.
//!
//! Every conversion is a free function with no hidden state so pointer
//! handling, rendering and export all share one definition.

use crate::annotation::{PagePoint, PageRect};
use serde::{Deserialize, Serialize};

/// Point in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &ScreenPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Box in screen pixels, relative to the page's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Point in export space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExportPoint {
    pub x: f32,
    pub y: f32,
}

/// Box in export space, anchored at its bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExportRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ExportRect {
    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Convert a pointer position to page space
///
/// `container_origin` is the screen position of the page's top-left corner.
pub fn screen_to_page(screen: ScreenPoint, container_origin: ScreenPoint, scale: f32) -> PagePoint {
    PagePoint::new((screen.x - container_origin.x) / scale, (screen.y - container_origin.y) / scale)
}

/// Convert a page-space point to page-relative screen pixels
pub fn page_to_screen(point: PagePoint, scale: f32) -> ScreenPoint {
    ScreenPoint::new(point.x * scale, point.y * scale)
}

pub fn page_rect_to_screen(rect: PageRect, scale: f32) -> ScreenRect {
    ScreenRect {
        x: rect.x * scale,
        y: rect.y * scale,
        width: rect.width * scale,
        height: rect.height * scale,
    }
}

/// Flip a page-space box into export space on a page of the given height
pub fn page_rect_to_export(rect: PageRect, page_height: f32) -> ExportRect {
    ExportRect {
        x: rect.x,
        y: page_height - (rect.y + rect.height),
        width: rect.width,
        height: rect.height,
    }
}

/// Flip a page-space point into export space on a page of the given height
pub fn page_point_to_export(point: PagePoint, page_height: f32) -> ExportPoint {
    ExportPoint { x: point.x, y: page_height - point.y }
}

/// Clockwise page rotation, as stored in a page's `/Rotate` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    /// Normalize any multiple of 90 degrees; other values count as unrotated
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Quarter,
            180 => Rotation::Half,
            270 => Rotation::ThreeQuarter,
            _ => Rotation::None,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarter => 270,
        }
    }

    /// Whether the displayed page has width and height swapped
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Quarter | Rotation::ThreeQuarter)
    }
}

/// Size of the rendered page layer for a given zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub rotation: Rotation,
}

/// Unrotated page dimensions plus the page's display rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub rotation: Rotation,
}

impl PageBox {
    pub fn new(width: f32, height: f32, rotation: Rotation) -> Self {
        Self { width, height, rotation }
    }

    /// Displayed width and height at zoom 1.0
    pub fn view_size(&self) -> (f32, f32) {
        if self.rotation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    pub fn viewport(&self, scale: f32) -> Viewport {
        let (width, height) = self.view_size();
        Viewport { width: width * scale, height: height * scale, scale, rotation: self.rotation }
    }

    /// Map a point from the displayed (rotated) page into the unrotated page,
    /// both top-left origin and y down
    pub fn unrotate_point(&self, point: PagePoint) -> PagePoint {
        let (w, h) = (self.width, self.height);
        match self.rotation {
            Rotation::None => point,
            Rotation::Quarter => PagePoint::new(point.y, h - point.x),
            Rotation::Half => PagePoint::new(w - point.x, h - point.y),
            Rotation::ThreeQuarter => PagePoint::new(w - point.y, point.x),
        }
    }

    pub fn unrotate_rect(&self, rect: PageRect) -> PageRect {
        if self.rotation == Rotation::None {
            return rect;
        }
        let a = self.unrotate_point(rect.origin());
        let b = self.unrotate_point(PagePoint::new(rect.right(), rect.bottom()));
        PageRect::from_corners(a, b)
    }
}
