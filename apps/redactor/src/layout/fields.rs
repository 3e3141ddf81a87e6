//! Overlay fields: fixed field order, localized labels, wrapped values.

use serde::{Deserialize, Serialize};

use crate::extraction::ExtractionResult;
use crate::fonts::FontKind;
use crate::layout::wrap::wrap_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Court,
    CaseNumber,
    Parties,
    Counsel,
    OrderSummary,
    ClaimSummary,
}

/// Title, labels and placeholder strings for one overlay language.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayText {
    pub title: &'static str,
    pub no_data: &'static str,
    court: &'static str,
    case_number: &'static str,
    parties: &'static str,
    counsel: &'static str,
    order_summary: &'static str,
    claim_summary: &'static str,
}

/// Korean strings, used when the embedded font covers every one of them.
pub const KOREAN_TEXT: OverlayText = OverlayText {
    title: "비식별 처리된 판결문",
    no_data: "정보 없음",
    court: "법원",
    case_number: "사건번호",
    parties: "당사자",
    counsel: "소송대리인",
    order_summary: "주문 요지",
    claim_summary: "청구 요지",
};

/// ASCII strings for the Latin-only fallback face.
pub const ASCII_TEXT: OverlayText = OverlayText {
    title: "Redacted Judgment",
    no_data: "N/A",
    court: "Court",
    case_number: "Case No.",
    parties: "Parties",
    counsel: "Counsel",
    order_summary: "Order",
    claim_summary: "Claim",
};

/// Drawn in place of a field whose text the font cannot render.
pub const FIELD_FAILURE_PLACEHOLDER: &str = "***";

impl OverlayText {
    /// Korean strings when an embedded face can draw all of them, ASCII otherwise.
    pub fn select<F>(kind: FontKind, covers: F) -> &'static OverlayText
    where
        F: Fn(&str) -> bool,
    {
        if kind == FontKind::Embedded && KOREAN_TEXT.strings().into_iter().all(|s| covers(s)) {
            &KOREAN_TEXT
        } else {
            &ASCII_TEXT
        }
    }

    fn strings(&self) -> [&'static str; 8] {
        [
            self.title,
            self.no_data,
            self.court,
            self.case_number,
            self.parties,
            self.counsel,
            self.order_summary,
            self.claim_summary,
        ]
    }

    pub fn label(&self, key: FieldKey) -> &'static str {
        match key {
            FieldKey::Court => self.court,
            FieldKey::CaseNumber => self.case_number,
            FieldKey::Parties => self.parties,
            FieldKey::Counsel => self.counsel,
            FieldKey::OrderSummary => self.order_summary,
            FieldKey::ClaimSummary => self.claim_summary,
        }
    }
}

/// A label and its wrapped value lines, in draw order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedField {
    pub key: FieldKey,
    pub label: String,
    pub lines: Vec<String>,
}

/// Field values in overlay order. Summaries are included only when requested.
pub fn field_values(extraction: &ExtractionResult, with_summaries: bool) -> Vec<(FieldKey, &str)> {
    let mut values = vec![
        (FieldKey::Court, extraction.court.as_str()),
        (FieldKey::CaseNumber, extraction.case_number.as_str()),
        (FieldKey::Parties, extraction.parties.as_str()),
        (FieldKey::Counsel, extraction.counsel.as_str()),
    ];
    if with_summaries {
        values.push((
            FieldKey::OrderSummary,
            extraction.order_summary.as_deref().unwrap_or_default(),
        ));
        values.push((
            FieldKey::ClaimSummary,
            extraction.claim_summary.as_deref().unwrap_or_default(),
        ));
    }
    values
}

/// Wraps every field value to `max_width`. Empty values become one `no_data` line.
pub fn layout_fields<F>(
    extraction: &ExtractionResult,
    with_summaries: bool,
    text: &OverlayText,
    max_width: f32,
    width_fn: F,
) -> Vec<RenderedField>
where
    F: Fn(&str) -> f32,
{
    field_values(extraction, with_summaries)
        .into_iter()
        .map(|(key, value)| {
            let mut lines = wrap_text(value, max_width, &width_fn);
            if lines.is_empty() {
                lines.push(text.no_data.to_string());
            }
            RenderedField {
                key,
                label: text.label(key).to_string(),
                lines,
            }
        })
        .collect()
}
