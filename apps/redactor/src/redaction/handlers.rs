use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::fonts::FontKind;
use crate::redaction::payload::PayloadError;
use crate::redaction::pipeline::{RedactionOutcome, RedactionRequest};
use crate::state::AppState;

const DEFAULT_DISPLAY_NAME: &str = "document.pdf";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactRequest {
    #[serde(default, alias = "file")]
    pub file_data: Option<String>,
    #[serde(default, alias = "filename")]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RedactResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub outcome: RedactionOutcome,
}

/// POST /api/v1/redact
pub async fn handle_redact(
    State(state): State<AppState>,
    payload: Result<Json<RedactRequest>, JsonRejection>,
) -> Result<Json<RedactResponse>, AppError> {
    let Json(req) = payload?;
    let file_data = req
        .file_data
        .filter(|data| !data.trim().is_empty())
        .ok_or(PayloadError::Missing)?;
    let file_name = req
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

    let outcome = state
        .pipeline
        .process(&RedactionRequest {
            file_data,
            file_name,
        })
        .await?;

    let message = match outcome.font_kind {
        FontKind::Embedded => "Document redacted and queued".to_string(),
        FontKind::Fallback => {
            "Document redacted and queued (overlay font unavailable; ASCII labels used)".to_string()
        }
    };
    Ok(Json(RedactResponse {
        success: true,
        message,
        outcome,
    }))
}
