//! Content-stream operations and page plumbing.
//!
//! New drawing is appended as a separate content stream. The page's existing
//! streams are bracketed by `q … Q` so any graphics state they leave behind
//! (transforms, clipping, fill colour) cannot affect the appended operations.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::masking::Rect;
use crate::render::document::{inherited, resolve};
use crate::render::RenderError;

/// Opaque white rectangle.
pub fn mask_ops(rect: &Rect) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new("g", vec![Object::Integer(1)]),
        Operation::new(
            "re",
            vec![
                Object::Real(rect.x),
                Object::Real(rect.y),
                Object::Real(rect.width),
                Object::Real(rect.height),
            ],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ]
}

/// One black text run with its baseline origin at (`x`, `y`).
pub fn text_ops(font_name: &str, size_pt: f32, x: f32, y: f32, text: Object) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font_name.as_bytes().to_vec()), Object::Real(size_pt)],
        ),
        Operation::new("g", vec![Object::Integer(0)]),
        Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(x),
                Object::Real(y),
            ],
        ),
        Operation::new("Tj", vec![text]),
        Operation::new("ET", vec![]),
    ]
}

/// Appends `operations` after the page's existing content.
pub fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), RenderError> {
    let encoded = Content { operations }
        .encode()
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    // Streams are concatenated when read back; keep operators from fusing.
    let mut body = b"\nQ\n".to_vec();
    body.extend_from_slice(&encoded);
    body.push(b'\n');

    let existing = existing_contents(doc, page_id)?;
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let body_id = doc.add_object(Stream::new(Dictionary::new(), body));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(body_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

/// The page's content stream references, flattening an indirect array.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, RenderError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(contents)
}

/// Registers `font_id` as `name` in the page's font resources.
///
/// Inherited or shared resources are copied onto the page first so that
/// other pages are not modified.
pub fn ensure_font_resource(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    font_id: ObjectId,
) -> Result<(), RenderError> {
    let view: &Document = doc;
    let mut resources = page_resources(view, page_id);
    let mut fonts = match resources.get(b"Font").ok().and_then(|f| resolve(view, f)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    fonts.set(name, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    match inherited(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    }
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, RenderError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| RenderError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::document::tests::a4_pdf;
    use lopdf::dictionary;

    fn operators(doc: &Document, page_id: ObjectId) -> Vec<String> {
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content.operations.into_iter().map(|op| op.operator).collect()
    }

    #[test]
    fn test_mask_ops_fill_white_rectangle() {
        let ops = mask_ops(&Rect {
            x: 0.0,
            y: 463.1,
            width: 595.0,
            height: 378.9,
        });
        let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["q", "g", "re", "f", "Q"]);
        assert_eq!(ops[1].operands[0].as_i64().unwrap(), 1);
    }

    #[test]
    fn test_append_brackets_existing_content() {
        let mut doc = Document::load_mem(&a4_pdf(1)).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();

        let rect = Rect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        };
        append_page_content(&mut doc, page_id, mask_ops(&rect)).unwrap();

        let ops = operators(&doc, page_id);
        assert_eq!(ops.first().map(String::as_str), Some("q"));
        let restore = ops.iter().position(|op| op == "Q").unwrap();
        let original_text = ops.iter().position(|op| op == "Tj").unwrap();
        let fill = ops.iter().position(|op| op == "f").unwrap();
        assert!(original_text < restore && restore < fill);
    }

    #[test]
    fn test_append_to_page_without_contents() {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });

        append_page_content(&mut doc, page_id, vec![Operation::new("n", vec![])]).unwrap();

        let contents = doc.get_dictionary(page_id).unwrap().get(b"Contents").unwrap();
        assert_eq!(contents.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_font_resource_copies_inherited_resources() {
        let mut doc = Document::with_version("1.7");
        let existing_font = doc.add_object(dictionary! { "Type" => "Font" });
        let shared = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => existing_font },
        });
        let parent = doc.add_object(dictionary! { "Type" => "Pages", "Resources" => shared });
        let page_id = doc.add_object(dictionary! { "Type" => "Page", "Parent" => parent });
        let overlay_font = doc.add_object(dictionary! { "Type" => "Font" });

        ensure_font_resource(&mut doc, page_id, "FRedact", overlay_font).unwrap();

        let resources = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap();
        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.get(b"F1").unwrap().as_reference().unwrap(), existing_font);
        assert_eq!(fonts.get(b"FRedact").unwrap().as_reference().unwrap(), overlay_font);

        // the shared dictionary is untouched
        let shared_fonts = doc.get_dictionary(shared).unwrap().get(b"Font").unwrap();
        assert!(!shared_fonts.as_dict().unwrap().has(b"FRedact"));
    }
}
