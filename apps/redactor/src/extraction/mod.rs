// Metadata extraction: ordered multi-model fallback over a document-reading AI backend.
// All model calls go through llm_client; no direct HTTP calls here.

pub mod chain;
pub mod models;
pub mod prompts;

use serde::{Deserialize, Serialize};

pub use chain::ExtractionChain;
pub use models::{ExtractionResult, MaskAnchor};
pub use prompts::build_extraction_prompt;

/// What the model is asked to anonymize before the text is overlaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionPolicy {
    pub anonymize_parties: bool,
    /// Off by default: counsel names are rendered verbatim.
    pub anonymize_counsel: bool,
    /// Also request anonymized order/claim summaries and render them.
    pub rewrite_summaries: bool,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self {
            anonymize_parties: true,
            anonymize_counsel: false,
            rewrite_summaries: false,
        }
    }
}
