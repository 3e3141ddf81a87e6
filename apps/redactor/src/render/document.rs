//! Loaded source PDF: the lopdf document plus each page's object id and box.

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;

use crate::masking::PageBox;
use crate::render::RenderError;

/// Parent chains deeper than this are treated as malformed.
const MAX_INHERIT_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not a readable PDF: {0}")]
    Parse(String),

    #[error("document has no pages")]
    NoPages,
}

pub struct SourceDocument {
    doc: Document,
    pages: Vec<(ObjectId, PageBox)>,
}

impl SourceDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, DocumentError> {
        let doc = Document::load_mem(bytes).map_err(|e| DocumentError::Parse(e.to_string()))?;

        // get_pages is keyed by 1-based page number, already in document order
        let pages: Vec<(ObjectId, PageBox)> = doc
            .get_pages()
            .into_values()
            .map(|id| (id, media_box(&doc, id)))
            .collect();

        if pages.is_empty() {
            return Err(DocumentError::NoPages);
        }
        Ok(Self { doc, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_boxes(&self) -> Vec<PageBox> {
        self.pages.iter().map(|(_, page)| *page).collect()
    }

    pub(crate) fn page(&self, index: usize) -> Option<(ObjectId, PageBox)> {
        self.pages.get(index).copied()
    }

    pub(crate) fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_bytes(mut self) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        Ok(buffer)
    }
}

/// Follows a reference to the object it names. Non-references are returned as-is.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Looks up an inheritable page attribute, walking the `Parent` chain.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict: &Dictionary = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// The page's MediaBox, normalized to positive width and height. Falls back to A4.
fn media_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let Some(Object::Array(values)) = inherited(doc, page_id, b"MediaBox") else {
        return PageBox::a4();
    };
    let coords: Vec<f32> = values
        .iter()
        .filter_map(|v| resolve(doc, v).and_then(number))
        .collect();
    let &[x0, y0, x1, y1] = coords.as_slice() else {
        return PageBox::a4();
    };
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return PageBox::a4();
    }
    let (width, height) = ((x1 - x0).abs(), (y1 - y0).abs());
    if width < 1.0 || height < 1.0 {
        return PageBox::a4();
    }
    PageBox::new(x0.min(x1), y0.min(y1), width, height)
}
