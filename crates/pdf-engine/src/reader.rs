use lopdf::{Dictionary, Document, Object, ObjectId};
use pdf_annotator_core::{PageBox, PdfReader, Rotation};

use crate::EngineError;

/// Letter size, used when a page carries no usable MediaBox
const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
/// Bound on `/Parent` hops when resolving inherited attributes
const MAX_TREE_DEPTH: usize = 32;

/// Page geometry as stored in the file
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PageGeometry {
    pub(crate) id: ObjectId,
    /// Lower-left corner of the MediaBox
    pub(crate) origin: (f32, f32),
    pub(crate) page: PageBox,
}

/// Reads page sizes and rotations with lopdf
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfReader;

impl LopdfReader {
    pub fn new() -> Self {
        Self
    }
}

impl PdfReader for LopdfReader {
    type Error = EngineError;

    fn page_boxes(&self, bytes: &[u8]) -> Result<Vec<PageBox>, Self::Error> {
        let document = open_document(bytes)?;
        let pages = page_geometry(&document)?;
        tracing::debug!(pages = pages.len(), "read page geometry");
        Ok(pages.into_iter().map(|geometry| geometry.page).collect())
    }
}

pub(crate) fn open_document(bytes: &[u8]) -> Result<Document, EngineError> {
    if bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt") {
        return Err(EngineError::Encrypted);
    }
    Ok(Document::load_mem(bytes)?)
}

/// Geometry of every page in page order; fails on a document without pages
pub(crate) fn page_geometry(document: &Document) -> Result<Vec<PageGeometry>, EngineError> {
    let pages: Vec<PageGeometry> = document
        .get_pages()
        .into_values()
        .map(|id| {
            let [x0, y0, x1, y1] = inherited(document, id, b"MediaBox")
                .and_then(|object| media_box(document, object))
                .unwrap_or(FALLBACK_MEDIA_BOX);
            let rotation = inherited(document, id, b"Rotate")
                .and_then(|object| resolve(document, object).as_i64().ok())
                .map_or(Rotation::None, Rotation::from_degrees);

            PageGeometry {
                id,
                origin: (x0.min(x1), y0.min(y1)),
                page: PageBox::new((x1 - x0).abs(), (y1 - y0).abs(), rotation),
            }
        })
        .collect();

    if pages.is_empty() {
        return Err(EngineError::NoPages);
    }
    Ok(pages)
}

/// Follow a reference one level; anything else is returned as is
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

pub(crate) fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(document, object).as_dict().ok()
}

/// Look up a page attribute, walking up the page tree for inheritable keys
pub(crate) fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let dict = document.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn media_box(document: &Document, object: &Object) -> Option<[f32; 4]> {
    let array = resolve(document, object).as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let mut corners = [0.0; 4];
    for (slot, value) in corners.iter_mut().zip(array) {
        *slot = number(resolve(document, value))?;
    }
    Some(corners)
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}
