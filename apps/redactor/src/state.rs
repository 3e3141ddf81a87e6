use std::sync::Arc;

use crate::redaction::RedactionPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns every collaborator a job needs: model chain, font source, publisher.
    pub pipeline: Arc<RedactionPipeline>,
    /// Request body limit for the redaction route, in bytes.
    pub max_upload_bytes: usize,
}
