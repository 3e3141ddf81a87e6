//! Ordered fallback chain over interchangeable metadata providers.
//!
//! Providers are tried strictly one after another. The first provider that
//! returns a parsed result wins; every failure is logged and skipped, and no
//! provider is retried. When the chain is exhausted the caller gets the
//! failure sentinel instead of an error.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::extraction::models::{parse_extraction, ExtractionResult, ParseError};
use crate::llm_client::{strip_json_fences, DocumentModel, LlmError};

const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("unparseable response: {0}")]
    Parse(#[from] ParseError),
}

/// One way of turning document bytes into metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short identifier used in logs and in the response metadata.
    fn name(&self) -> &str;

    async fn extract(&self, document: &[u8]) -> Result<ExtractionResult, ExtractError>;
}

/// A provider backed by a single named model on a `DocumentModel` backend.
pub struct ModelProvider {
    client: Arc<dyn DocumentModel>,
    model: String,
    prompt: Arc<str>,
}

impl ModelProvider {
    pub fn new(client: Arc<dyn DocumentModel>, model: impl Into<String>, prompt: Arc<str>) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
        }
    }
}

#[async_trait]
impl MetadataProvider for ModelProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn extract(&self, document: &[u8]) -> Result<ExtractionResult, ExtractError> {
        let raw = self
            .client
            .generate(&self.model, &self.prompt, document, PDF_MIME_TYPE)
            .await?;
        let mut result = parse_extraction(strip_json_fences(&raw))?;
        result.model = Some(self.model.clone());
        Ok(result)
    }
}

/// Prioritized list of providers. Never fails.
pub struct ExtractionChain {
    providers: Vec<Box<dyn MetadataProvider>>,
}

impl ExtractionChain {
    pub fn new(providers: Vec<Box<dyn MetadataProvider>>) -> Self {
        Self { providers }
    }

    /// One `ModelProvider` per model name, in order, sharing a client and prompt.
    pub fn from_models(client: Arc<dyn DocumentModel>, models: &[String], prompt: &str) -> Self {
        let prompt: Arc<str> = Arc::from(prompt);
        let providers = models
            .iter()
            .map(|model| {
                Box::new(ModelProvider::new(client.clone(), model.clone(), prompt.clone()))
                    as Box<dyn MetadataProvider>
            })
            .collect();
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn extract(&self, document: &[u8]) -> ExtractionResult {
        for provider in &self.providers {
            match provider.extract(document).await {
                Ok(result) => {
                    info!("Metadata extracted with {}", provider.name());
                    return result;
                }
                Err(e) => warn!("Extraction with {} failed: {e}", provider.name()),
            }
        }
        warn!(
            "All {} extraction candidates failed; using conservative defaults",
            self.providers.len()
        );
        ExtractionResult::failed()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted backend: each model name maps to a canned reply.
    /// Models without a script answer with a 404.
    #[derive(Default)]
    pub(crate) struct ScriptedModel {
        replies: HashMap<String, Result<String, u16>>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub(crate) fn reply(mut self, model: &str, text: &str) -> Self {
            self.replies.insert(model.to_string(), Ok(text.to_string()));
            self
        }

        pub(crate) fn fail(mut self, model: &str, status: u16) -> Self {
            self.replies.insert(model.to_string(), Err(status));
            self
        }

        pub(crate) fn call_log(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentModel for ScriptedModel {
        async fn generate(
            &self,
            model: &str,
            _prompt: &str,
            _document: &[u8],
            mime_type: &str,
        ) -> Result<String, LlmError> {
            assert_eq!(mime_type, PDF_MIME_TYPE);
            self.calls.lock().unwrap().push(model.to_string());
            match self.replies.get(model) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(status)) => Err(LlmError::Api {
                    status: *status,
                    message: "scripted failure".to_string(),
                }),
                None => Err(LlmError::Api {
                    status: 404,
                    message: format!("model {model} not found"),
                }),
            }
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    const GOOD: &str = r#"{"court": "Seoul District Court", "caseNo": "2024-1234",
        "parties": "A v. B", "lawyer": "Firm X", "maskAnchor": {"pageIndex": 0, "ratio": 0.4}}"#;

    #[tokio::test]
    async fn test_first_success_wins() {
        let backend = Arc::new(ScriptedModel::default().reply("m1", GOOD).reply("m2", GOOD));
        let chain = ExtractionChain::from_models(backend.clone(), &models(&["m1", "m2"]), "p");

        let result = chain.extract(b"%PDF").await;
        assert_eq!(result.court, "Seoul District Court");
        assert_eq!(result.model.as_deref(), Some("m1"));
        assert_eq!(backend.call_log(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_falls_through_failures_in_order() {
        let backend = Arc::new(
            ScriptedModel::default()
                .fail("m1", 429)
                .reply("m2", "I could not read this document.")
                .reply("m3", &format!("```json\n{GOOD}\n```")),
        );
        let chain =
            ExtractionChain::from_models(backend.clone(), &models(&["m1", "m2", "m3", "m4"]), "p");

        let result = chain.extract(b"%PDF").await;
        assert_eq!(result.model.as_deref(), Some("m3"));
        assert_eq!(result.case_number, "2024-1234");
        assert_eq!(result.counsel, "Firm X");
        // each candidate tried once, m4 never reached
        assert_eq!(backend.call_log(), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_exhausted_chain_returns_sentinel() {
        let backend = Arc::new(ScriptedModel::default().fail("m1", 500).fail("m2", 503));
        let chain = ExtractionChain::from_models(backend.clone(), &models(&["m1", "m2"]), "p");

        let result = chain.extract(b"%PDF").await;
        assert!(result.is_sentinel());
        assert_eq!(backend.call_log(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_empty_chain_returns_sentinel_with_default_anchor() {
        let chain = ExtractionChain::new(Vec::new());
        let result = chain.extract(b"%PDF").await;
        assert_eq!(result, ExtractionResult::failed());
        assert_eq!(result.mask_anchor.page_index, Some(0.0));
        assert_eq!(result.mask_anchor.ratio, Some(0.5));
    }

    #[test]
    fn test_provider_names_preserve_order() {
        let backend = Arc::new(ScriptedModel::default());
        let chain = ExtractionChain::from_models(backend, &models(&["b", "a", "c"]), "p");
        assert_eq!(chain.provider_names(), vec!["b", "a", "c"]);
    }
}
