// Redaction renderer: masks the identifying region, then overlays the
// extracted metadata on the first page.
// Synchronous and CPU-bound; the pipeline runs it inside spawn_blocking.

pub mod canvas;
pub mod document;
pub mod font;

use std::collections::BTreeMap;

use lopdf::content::Operation;
use thiserror::Error;
use tracing::{debug, warn};

use crate::extraction::ExtractionResult;
use crate::fonts::FontAsset;
use crate::layout::{
    layout_fields, LayoutConfig, OverlayText, RenderedField, ASCII_TEXT, FIELD_FAILURE_PLACEHOLDER,
};
use crate::masking::{MaskPlan, PageBox};

pub use document::{DocumentError, SourceDocument};
pub use font::{PdfFont, FONT_RESOURCE_NAME};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF structure error: {0}")]
    Pdf(String),

    #[error("font has no glyph for {0:?}")]
    UnsupportedGlyph(char),

    #[error("content stream encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub layout: LayoutConfig,
    /// Append order/claim summaries after the four fixed fields.
    pub with_summaries: bool,
}

/// Draws the mask plan and the metadata overlay, then serializes the document.
///
/// Masks are drawn before any overlay text on the same page. Per-field glyph
/// failures are replaced with a placeholder line and never abort the render.
pub fn render_redacted(
    mut source: SourceDocument,
    extraction: &ExtractionResult,
    font: &FontAsset,
    plan: &MaskPlan,
    options: &RenderOptions,
) -> Result<Vec<u8>, RenderError> {
    let (first_page_id, first_page) = source
        .page(0)
        .ok_or_else(|| RenderError::Pdf("document has no pages".to_string()))?;

    let mut pdf_font = PdfFont::prepare(source.doc_mut(), font);

    // Masks first, in plan order
    let mut page_ops: BTreeMap<usize, Vec<Operation>> = BTreeMap::new();
    for instruction in &plan.instructions {
        page_ops
            .entry(instruction.page_index)
            .or_default()
            .extend(canvas::mask_ops(&instruction.rect));
    }

    let overlay = overlay_ops(&mut pdf_font, extraction, first_page, options);
    page_ops.entry(0).or_default().extend(overlay);

    for (page_index, operations) in page_ops {
        let (page_id, _) = source
            .page(page_index)
            .ok_or_else(|| RenderError::Pdf(format!("mask targets missing page {page_index}")))?;
        canvas::append_page_content(source.doc_mut(), page_id, operations)?;
    }

    canvas::ensure_font_resource(
        source.doc_mut(),
        first_page_id,
        FONT_RESOURCE_NAME,
        pdf_font.font_id(),
    )?;
    pdf_font.finish(source.doc_mut());

    source.into_bytes()
}

/// Title plus labeled fields, top to bottom from the page's top margin.
/// Fields that would cross the bottom margin are omitted along with all later ones.
fn overlay_ops(
    font: &mut PdfFont<'_>,
    extraction: &ExtractionResult,
    page: PageBox,
    options: &RenderOptions,
) -> Vec<Operation> {
    let layout = &options.layout;
    let text = OverlayText::select(font.kind(), |s| font.covers(s));
    let label_x = page.left + layout.margin_pt;
    let value_x = label_x + layout.label_column_pt;
    let floor = page.bottom + layout.bottom_margin_pt;
    let line_height = layout.body_line_height();

    let mut ops = Vec::new();
    let mut cursor = page.top() - layout.margin_pt - layout.title_size_pt;

    match font.encode_all(&[text.title]) {
        Ok(mut title) => ops.extend(canvas::text_ops(
            FONT_RESOURCE_NAME,
            layout.title_size_pt,
            label_x,
            cursor,
            title.remove(0),
        )),
        Err(e) => warn!("Overlay title could not be drawn: {e}"),
    }
    cursor -= layout.title_line_height() + layout.paragraph_gap_pt;

    let fields = {
        let measure = |s: &str| font.width_pt(s, layout.body_size_pt);
        layout_fields(
            extraction,
            options.with_summaries,
            text,
            layout.value_width(page.width),
            measure,
        )
    };

    for (drawn, field) in fields.iter().enumerate() {
        let last_baseline = cursor - line_height * (field.lines.len() as f32 - 1.0);
        if last_baseline < floor {
            debug!(
                "Overlay full: omitting {} of {} fields",
                fields.len() - drawn,
                fields.len()
            );
            break;
        }

        let mut texts: Vec<&str> = vec![field.label.as_str()];
        texts.extend(field.lines.iter().map(String::as_str));
        let encoded = match font.encode_all(&texts) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Field {:?} could not be drawn ({e}); using placeholder", field.key);
                match placeholder_candidates(field)
                    .iter()
                    .find_map(|candidate| font.encode_all(candidate).ok())
                {
                    Some(encoded) => encoded,
                    None => {
                        warn!("Font cannot draw a placeholder for field {:?}", field.key);
                        cursor -= line_height + layout.paragraph_gap_pt;
                        continue;
                    }
                }
            }
        };

        let mut encoded = encoded.into_iter();
        if let Some(label) = encoded.next().filter(|label| !is_empty_text(label)) {
            ops.extend(canvas::text_ops(
                FONT_RESOURCE_NAME,
                layout.body_size_pt,
                label_x,
                cursor,
                label,
            ));
        }
        let mut line_count = 0;
        for line in encoded {
            ops.extend(canvas::text_ops(
                FONT_RESOURCE_NAME,
                layout.body_size_pt,
                value_x,
                cursor - line_height * line_count as f32,
                line,
            ));
            line_count += 1;
        }
        cursor -= line_height * line_count.max(1) as f32 + layout.paragraph_gap_pt;
    }

    ops
}

/// Label and placeholder pairs tried in order after a field fails to encode.
/// The last one drops the label so the field still shows the placeholder.
fn placeholder_candidates(field: &RenderedField) -> [[&str; 2]; 3] {
    [
        [field.label.as_str(), FIELD_FAILURE_PLACEHOLDER],
        [ASCII_TEXT.label(field.key), FIELD_FAILURE_PLACEHOLDER],
        ["", FIELD_FAILURE_PLACEHOLDER],
    ]
}

fn is_empty_text(operand: &lopdf::Object) -> bool {
    matches!(operand, lopdf::Object::String(bytes, _) if bytes.is_empty())
}
