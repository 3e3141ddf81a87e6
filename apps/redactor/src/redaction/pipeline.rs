//! One redaction job, end to end.
//!
//! decode payload → load PDF → (extract ∥ resolve font) → mask plan →
//! render (blocking pool) → upload → queue record.
//!
//! Input errors surface before any model or font call is issued. Extraction
//! and font degradation are absorbed by their components. Publisher failures
//! fail the job even though rendering succeeded.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extraction::{ExtractionChain, ExtractionResult};
use crate::fonts::{FontKind, FontSource};
use crate::masking::{compute_mask_plan, AnchorMode, MaskPlan};
use crate::publish::{Publisher, QueueRecord, PDF_CONTENT_TYPE};
use crate::redaction::payload::{decode_document_payload, sanitize_filename};
use crate::render::{render_redacted, RenderOptions, SourceDocument};

const OBJECT_PREFIX: &str = "redacted";

#[derive(Debug, Clone)]
pub struct RedactionRequest {
    /// Base64 document, optionally a `data:` URI.
    pub file_data: String,
    /// Display filename as supplied by the client.
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionOutcome {
    pub file_url: String,
    pub object_key: String,
    pub metadata: AppliedMetadata,
    pub font_kind: FontKind,
    pub masked_pages: Vec<usize>,
}

/// The anchor the renderer used: clamped page index and margin-adjusted ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedAnchor {
    pub page_index: usize,
    pub ratio: f32,
}

impl AppliedAnchor {
    fn from_plan(plan: &MaskPlan) -> Self {
        Self {
            page_index: plan.anchor().map_or(0, |anchor| anchor.page_index),
            ratio: plan.ratio,
        }
    }
}

/// Extracted metadata as reported back, with the anchor that was actually applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMetadata {
    pub court: String,
    pub case_number: String,
    pub parties: String,
    pub counsel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_summary: Option<String>,
    pub mask_anchor: AppliedAnchor,
    pub model: Option<String>,
}

impl AppliedMetadata {
    fn new(extraction: ExtractionResult, plan: &MaskPlan) -> Self {
        Self {
            court: extraction.court,
            case_number: extraction.case_number,
            parties: extraction.parties,
            counsel: extraction.counsel,
            order_summary: extraction.order_summary,
            claim_summary: extraction.claim_summary,
            mask_anchor: AppliedAnchor::from_plan(plan),
            model: extraction.model,
        }
    }
}

pub struct RedactionPipeline {
    extractor: ExtractionChain,
    fonts: Arc<dyn FontSource>,
    publisher: Arc<dyn Publisher>,
    anchor_mode: AnchorMode,
    render_options: RenderOptions,
}

impl RedactionPipeline {
    pub fn new(
        extractor: ExtractionChain,
        fonts: Arc<dyn FontSource>,
        publisher: Arc<dyn Publisher>,
        anchor_mode: AnchorMode,
        render_options: RenderOptions,
    ) -> Self {
        Self {
            extractor,
            fonts,
            publisher,
            anchor_mode,
            render_options,
        }
    }

    pub async fn process(&self, request: &RedactionRequest) -> Result<RedactionOutcome, AppError> {
        // 1. Input boundary
        let document = decode_document_payload(&request.file_data)?;
        let source = SourceDocument::load(&document)?;
        info!(
            "Redacting '{}' ({} bytes, {} pages)",
            request.file_name,
            document.len(),
            source.page_count()
        );

        // 2. Independent network calls, joined before rendering
        let (extraction, font) =
            tokio::join!(self.extractor.extract(&document), self.fonts.resolve());
        let font_kind = font.kind();
        if extraction.is_sentinel() {
            warn!("No metadata for '{}'; rendering placeholders", request.file_name);
        }

        // 3. Geometry
        let plan = compute_mask_plan(&source.page_boxes(), &extraction.mask_anchor, self.anchor_mode);

        // 4. CPU-bound rendering off the async runtime
        let rendered = {
            let extraction = extraction.clone();
            let plan = plan.clone();
            let options = self.render_options.clone();
            tokio::task::spawn_blocking(move || {
                render_redacted(source, &extraction, &font, &plan, &options)
            })
            .await
            .map_err(|e| anyhow::anyhow!("render task panicked: {e}"))??
        };

        // 5. Publish
        let object_key = object_key(&request.file_name, Utc::now());
        let file_url = self
            .publisher
            .upload(&object_key, Bytes::from(rendered), PDF_CONTENT_TYPE)
            .await?;
        self.publisher
            .enqueue(&QueueRecord::pending(request.file_name.clone(), file_url.clone()))
            .await?;

        info!("Published redacted document {object_key}");
        Ok(RedactionOutcome {
            file_url,
            object_key,
            metadata: AppliedMetadata::new(extraction, &plan),
            font_kind,
            masked_pages: plan.masked_pages(),
        })
    }
}

/// `redacted/<UTC yyyymmddHHMMSS>-<sanitized name>`
fn object_key(file_name: &str, now: chrono::DateTime<Utc>) -> String {
    format!(
        "{OBJECT_PREFIX}/{}-{}",
        now.format("%Y%m%d%H%M%S"),
        sanitize_filename(file_name)
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extraction::chain::tests::ScriptedModel;
    use crate::fonts::FontAsset;
    use crate::publish::tests::RecordingPublisher;
    use crate::render::document::tests::a4_pdf;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const GOOD: &str = r#"{"court": "Seoul District Court", "caseNo": "2024-1234",
        "parties": "A v. B", "lawyer": "Firm X", "maskAnchor": {"pageIndex": 0, "ratio": 0.4}}"#;

    /// Always resolves to the fallback face, counting calls.
    #[derive(Default)]
    pub(crate) struct CountingFonts {
        pub(crate) calls: AtomicUsize,
    }

    #[async_trait]
    impl FontSource for CountingFonts {
        async fn resolve(&self) -> FontAsset {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FontAsset::fallback()
        }
    }

    struct Harness {
        model: Arc<ScriptedModel>,
        fonts: Arc<CountingFonts>,
        publisher: Arc<RecordingPublisher>,
        pipeline: RedactionPipeline,
    }

    fn harness(model: ScriptedModel, publisher: RecordingPublisher) -> Harness {
        let model = Arc::new(model);
        let fonts = Arc::new(CountingFonts::default());
        let publisher = Arc::new(publisher);
        let chain = ExtractionChain::from_models(
            model.clone(),
            &["m1".to_string(), "m2".to_string()],
            "prompt",
        );
        let pipeline = RedactionPipeline::new(
            chain,
            fonts.clone(),
            publisher.clone(),
            AnchorMode::BodyStart,
            RenderOptions::default(),
        );
        Harness {
            model,
            fonts,
            publisher,
            pipeline,
        }
    }

    fn request(file_data: String) -> RedactionRequest {
        RedactionRequest {
            file_data,
            file_name: "판결문 2024.pdf".to_string(),
        }
    }

    fn pdf_payload(pages: usize) -> String {
        format!("data:application/pdf;base64,{}", STANDARD.encode(a4_pdf(pages)))
    }

    #[tokio::test]
    async fn test_malformed_payload_fails_before_any_call() {
        let h = harness(
            ScriptedModel::default().reply("m1", GOOD),
            RecordingPublisher::default(),
        );

        let err = h
            .pipeline
            .process(&request("%%% not base64 %%%".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(h.model.call_log().is_empty());
        assert_eq!(h.fonts.calls.load(Ordering::SeqCst), 0);
        assert!(h.publisher.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_pdf_payload_fails_before_any_call() {
        let h = harness(
            ScriptedModel::default().reply("m1", GOOD),
            RecordingPublisher::default(),
        );

        let err = h
            .pipeline
            .process(&request(STANDARD.encode(b"just some text")))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(h.model.call_log().is_empty());
        assert_eq!(h.fonts.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_job_publishes_and_queues() {
        let h = harness(
            ScriptedModel::default().fail("m1", 503).reply("m2", GOOD),
            RecordingPublisher::default(),
        );

        let outcome = h.pipeline.process(&request(pdf_payload(1))).await.unwrap();

        assert_eq!(h.model.call_log(), vec!["m1", "m2"]);
        assert_eq!(h.fonts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.metadata.court, "Seoul District Court");
        assert_eq!(outcome.metadata.model.as_deref(), Some("m2"));
        assert_eq!(outcome.metadata.mask_anchor.page_index, 0);
        assert!((outcome.metadata.mask_anchor.ratio - 0.45).abs() < 1e-6);
        assert_eq!(outcome.font_kind, FontKind::Fallback);
        assert_eq!(outcome.masked_pages, vec![0]);
        assert!(outcome.object_key.starts_with("redacted/"));
        assert!(outcome.object_key.ends_with("-2024.pdf"));

        let uploads = h.publisher.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let (key, bytes, content_type) = &uploads[0];
        assert_eq!(key, &outcome.object_key);
        assert_eq!(content_type, PDF_CONTENT_TYPE);
        assert_eq!(SourceDocument::load(bytes).unwrap().page_count(), 1);

        let records = h.publisher.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_url, outcome.file_url);
        assert_eq!(records[0].file_name, "판결문 2024.pdf");
        assert_eq!(records[0].status, "pending");
    }

    #[tokio::test]
    async fn test_reported_anchor_is_the_clamped_page() {
        let reply = r#"{"court": "c", "caseNo": "n", "parties": "p", "lawyer": "l",
            "maskAnchor": {"pageIndex": 7.0, "ratio": 0.2}}"#;
        let h = harness(
            ScriptedModel::default().reply("m1", reply),
            RecordingPublisher::default(),
        );

        let outcome = h.pipeline.process(&request(pdf_payload(3))).await.unwrap();

        assert_eq!(outcome.masked_pages, vec![0, 1, 2]);
        assert_eq!(outcome.metadata.mask_anchor.page_index, 2);
        assert!((outcome.metadata.mask_anchor.ratio - 0.25).abs() < 1e-6);
        let json = serde_json::to_value(&outcome.metadata).unwrap();
        assert_eq!(json["maskAnchor"]["pageIndex"], serde_json::json!(2));
        assert!(json.get("orderSummary").is_none());
    }

    #[tokio::test]
    async fn test_extraction_exhaustion_still_produces_document() {
        let h = harness(ScriptedModel::default(), RecordingPublisher::default());

        let outcome = h.pipeline.process(&request(pdf_payload(3))).await.unwrap();

        assert_eq!(outcome.metadata.court, "extraction failed");
        assert!(outcome.metadata.model.is_none());
        assert_eq!(outcome.masked_pages, vec![0]);
        // conservative 0.5 plus the safety margin
        assert_eq!(outcome.metadata.mask_anchor.page_index, 0);
        assert!((outcome.metadata.mask_anchor.ratio - 0.55).abs() < 1e-6);
        assert_eq!(h.publisher.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_fails_job() {
        let h = harness(
            ScriptedModel::default().reply("m1", GOOD),
            RecordingPublisher {
                fail_upload: true,
                ..RecordingPublisher::default()
            },
        );

        let err = h.pipeline.process(&request(pdf_payload(1))).await.unwrap_err();

        assert!(matches!(err, AppError::Publish(_)));
        assert!(h.publisher.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_failure_fails_job() {
        let h = harness(
            ScriptedModel::default().reply("m1", GOOD),
            RecordingPublisher {
                fail_enqueue: true,
                ..RecordingPublisher::default()
            },
        );

        let err = h.pipeline.process(&request(pdf_payload(1))).await.unwrap_err();

        assert!(matches!(err, AppError::Publish(_)));
        assert_eq!(h.publisher.uploads.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_object_key_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            object_key("../case 1.PDF", now),
            "redacted/20240305140709-case1.pdf"
        );
    }
}
