//! Inbound document payload: base64 or data-URI text → raw bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

const DEFAULT_FILE_NAME: &str = "document.pdf";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("no document was provided")]
    Missing,

    #[error("data URI has no ',' separating the header from the payload")]
    MissingDataUriComma,

    #[error("document payload is not valid base64: {0}")]
    Malformed(#[from] base64::DecodeError),
}

/// Decodes a base64 document, optionally prefixed with a `data:` URI header.
///
/// Whitespace anywhere in the payload (line-wrapped base64) is ignored.
pub fn decode_document_payload(raw: &str) -> Result<Vec<u8>, PayloadError> {
    let trimmed = raw.trim();
    let body = if trimmed.starts_with("data:") {
        let (_, data) = trimmed
            .split_once(',')
            .ok_or(PayloadError::MissingDataUriComma)?;
        data
    } else {
        trimmed
    };

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(PayloadError::Missing);
    }
    Ok(STANDARD.decode(compact)?)
}

/// Restricts a display filename to ASCII letters, digits and `.`, ending in `.pdf`.
pub fn sanitize_filename(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect();

    // kept is pure ASCII, so byte slicing is safe
    let stem = if kept.to_ascii_lowercase().ends_with(".pdf") {
        &kept[..kept.len() - 4]
    } else {
        kept.as_str()
    };
    let stem = stem.trim_matches('.');

    if stem.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        format!("{stem}.pdf")
    }
}
