//! Content stream operation builders, all in default user space

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use pdf_annotator_core::{Color, ExportPoint, ExportRect};

/// Control point distance for a quarter circle drawn with one cubic Bezier
const KAPPA: f32 = 0.552_284_8;

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn reals<const N: usize>(values: [f32; N]) -> Vec<Object> {
    values.into_iter().map(Object::Real).collect()
}

pub(crate) fn save() -> Operation {
    Operation::new("q", vec![])
}

pub(crate) fn restore() -> Operation {
    Operation::new("Q", vec![])
}

pub(crate) fn translate(dx: f32, dy: f32) -> Operation {
    Operation::new("cm", reals([1.0, 0.0, 0.0, 1.0, dx, dy]))
}

pub(crate) fn graphics_state(resource: &str) -> Operation {
    Operation::new("gs", vec![name(resource)])
}

pub(crate) fn fill_color(color: Color) -> Operation {
    let (r, g, b) = color.to_normalized_rgb();
    Operation::new("rg", reals([r, g, b]))
}

pub(crate) fn stroke_color(color: Color) -> Operation {
    let (r, g, b) = color.to_normalized_rgb();
    Operation::new("RG", reals([r, g, b]))
}

pub(crate) fn filled_rectangle(rect: ExportRect) -> Vec<Operation> {
    vec![
        Operation::new("re", reals([rect.x, rect.y, rect.width, rect.height])),
        Operation::new("f", vec![]),
    ]
}

pub(crate) fn stroked_line(start: ExportPoint, end: ExportPoint, thickness: f32) -> Vec<Operation> {
    vec![
        Operation::new("w", reals([thickness])),
        Operation::new("m", reals([start.x, start.y])),
        Operation::new("l", reals([end.x, end.y])),
        Operation::new("S", vec![]),
    ]
}

/// Filled circle as four Bezier quarter arcs, counter-clockwise from 3 o'clock
pub(crate) fn filled_circle(center: ExportPoint, radius: f32) -> Vec<Operation> {
    let (cx, cy, r) = (center.x, center.y, radius);
    let k = radius * KAPPA;
    vec![
        Operation::new("m", reals([cx + r, cy])),
        Operation::new("c", reals([cx + r, cy + k, cx + k, cy + r, cx, cy + r])),
        Operation::new("c", reals([cx - k, cy + r, cx - r, cy + k, cx - r, cy])),
        Operation::new("c", reals([cx - r, cy - k, cx - k, cy - r, cx, cy - r])),
        Operation::new("c", reals([cx + k, cy - r, cx + r, cy - k, cx + r, cy])),
        Operation::new("f", vec![]),
    ]
}

pub(crate) fn text_line(font: &str, origin: ExportPoint, text: &str, size: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![name(font), Object::Real(size)]),
        Operation::new("Td", reals([origin.x, origin.y])),
        Operation::new("Tj", vec![Object::String(encode_text(text), StringFormat::Literal)]),
        Operation::new("ET", vec![]),
    ]
}

/// Paint an image XObject into `placement`
pub(crate) fn placed_image(resource: &str, placement: ExportRect) -> Vec<Operation> {
    vec![
        save(),
        Operation::new(
            "cm",
            reals([placement.width, 0.0, 0.0, placement.height, placement.x, placement.y]),
        ),
        Operation::new("Do", vec![name(resource)]),
        restore(),
    ]
}

/// Single-byte text for a WinAnsi Helvetica; characters outside Latin-1
/// become `?` and control characters become spaces
pub(crate) fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            c if c.is_control() => b' ',
            '\u{20}'..='\u{FF}' => c as u8,
            _ => b'?',
        })
        .collect()
}
