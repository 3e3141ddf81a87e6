//! Extraction result types and the lenient parser for model output.
//!
//! Model output is untrusted text. Keys arrive under several spellings and
//! values arrive as strings, numbers, or arrays, so parsing goes through
//! `serde_json::Value` instead of a derived `Deserialize`. Anchor values are
//! kept raw here; `masking::compute_mask_plan` is where they get clamped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Placeholder written into every text field when no model produced a result.
pub const EXTRACTION_FAILED: &str = "extraction failed";

/// Anchor used when extraction failed entirely.
pub const DEFAULT_ANCHOR_PAGE: f64 = 0.0;
pub const DEFAULT_ANCHOR_RATIO: f64 = 0.5;

/// Where identifying content ends, as reported by the model.
///
/// Both fields are raw: `page_index` may be negative or fractional, `ratio`
/// may be outside `(0, 1]`. `None` means the model omitted the value or sent
/// something that is not a number.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskAnchor {
    pub page_index: Option<f64>,
    pub ratio: Option<f64>,
}

impl MaskAnchor {
    pub fn conservative() -> Self {
        Self {
            page_index: Some(DEFAULT_ANCHOR_PAGE),
            ratio: Some(DEFAULT_ANCHOR_RATIO),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub court: String,
    pub case_number: String,
    pub parties: String,
    pub counsel: String,
    /// Anonymized summary of the order; only requested when summaries are rewritten.
    pub order_summary: Option<String>,
    /// Anonymized summary of the claim; only requested when summaries are rewritten.
    pub claim_summary: Option<String>,
    pub mask_anchor: MaskAnchor,
    /// Model that produced this result. `None` for the failure sentinel.
    pub model: Option<String>,
}

impl ExtractionResult {
    /// The result returned when every candidate model failed.
    pub fn failed() -> Self {
        Self {
            court: EXTRACTION_FAILED.to_string(),
            case_number: EXTRACTION_FAILED.to_string(),
            parties: EXTRACTION_FAILED.to_string(),
            counsel: EXTRACTION_FAILED.to_string(),
            order_summary: None,
            claim_summary: None,
            mask_anchor: MaskAnchor::conservative(),
            model: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.model.is_none() && self.court == EXTRACTION_FAILED
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response JSON is not an object")]
    NotAnObject,
}

/// Parses the (already fence-stripped) model response into an `ExtractionResult`.
pub fn parse_extraction(text: &str) -> Result<ExtractionResult, ParseError> {
    let value: Value = serde_json::from_str(text)?;
    let obj = value.as_object().ok_or(ParseError::NotAnObject)?;

    let anchor = lookup(obj, &["maskAnchor", "mask_anchor", "anchor"])
        .and_then(Value::as_object)
        .map(parse_anchor)
        .unwrap_or_else(|| parse_anchor(obj));

    Ok(ExtractionResult {
        court: text_field(obj, &["court", "courtName", "court_name"]).unwrap_or_default(),
        case_number: text_field(obj, &["caseNumber", "caseNo", "case_number", "case_no"])
            .unwrap_or_default(),
        parties: text_field(obj, &["parties", "party"]).unwrap_or_default(),
        counsel: text_field(obj, &["counsel", "lawyer", "lawyers", "attorneys"])
            .unwrap_or_default(),
        order_summary: text_field(obj, &["orderSummary", "order_summary", "order"]),
        claim_summary: text_field(obj, &["claimSummary", "claim_summary", "claim"]),
        mask_anchor: anchor,
        model: None,
    })
}

fn parse_anchor(obj: &Map<String, Value>) -> MaskAnchor {
    MaskAnchor {
        page_index: lookup(obj, &["pageIndex", "page_index", "page"]).and_then(number),
        ratio: lookup(obj, &["ratio", "yRatio", "y_ratio"]).and_then(number),
    }
}

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k)).filter(|v| !v.is_null())
}

/// Accepts JSON numbers and numeric strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let text = match lookup(obj, keys)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    Some(text)
}
