// Metadata extraction prompt templates.
// All prompts for the extraction module are defined here.

use crate::extraction::RedactionPolicy;
use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, NO_GUESSING_INSTRUCTION};
use crate::masking::AnchorMode;

const EXTRACTION_PREAMBLE: &str = "\
You are reading a scanned Korean court judgment (PDF). \
Extract the identifying header metadata and locate where identifying content ends.";

const PARTIES_ANONYMIZED: &str = "\
\"parties\": the parties, with every natural person's name replaced by their role and \
initial (e.g. \"원고 A\", \"피고 B\"). Company names may be kept.";

const PARTIES_VERBATIM: &str = "\"parties\": the parties exactly as printed.";

const COUNSEL_ANONYMIZED: &str = "\
\"counsel\": counsel for each party, with individual attorney names replaced by \
\"변호사\" followed by an initial. Law firm names may be kept.";

const COUNSEL_VERBATIM: &str = "\"counsel\": counsel for each party exactly as printed.";

const SUMMARIES: &str = "\
\"orderSummary\": one or two sentences summarizing the order (주문), using roles instead of names.
\"claimSummary\": one or two sentences summarizing the claim (청구취지), using roles instead of names.";

const ANCHOR_PAGE_RATIO: &str = "\
\"maskAnchor\": {\"pageIndex\": 0-based page on which the identifying header ends, \
\"ratio\": fraction (0 to 1) of that page's height, measured from the top, \
covered by the header}";

const ANCHOR_BODY_START: &str = "\
\"maskAnchor\": {\"pageIndex\": 0-based page on which the judgment body (주문 or 이유) starts, \
\"ratio\": fraction (0 to 1) of that page's height, measured from the top, at which the body starts}";

/// Builds the instruction prompt sent alongside the document.
pub fn build_extraction_prompt(policy: &RedactionPolicy, mode: AnchorMode) -> String {
    let parties = if policy.anonymize_parties {
        PARTIES_ANONYMIZED
    } else {
        PARTIES_VERBATIM
    };
    let counsel = if policy.anonymize_counsel {
        COUNSEL_ANONYMIZED
    } else {
        COUNSEL_VERBATIM
    };
    let anchor = match mode {
        AnchorMode::PageRatio => ANCHOR_PAGE_RATIO,
        AnchorMode::BodyStart => ANCHOR_BODY_START,
    };

    let mut fields = vec![
        "\"court\": the court name.".to_string(),
        "\"caseNumber\": the case number.".to_string(),
        parties.to_string(),
        counsel.to_string(),
    ];
    if policy.rewrite_summaries {
        fields.push(SUMMARIES.to_string());
    }
    fields.push(anchor.to_string());

    format!(
        "{EXTRACTION_PREAMBLE}\n\nReturn a JSON object with these keys:\n{}\n\n{NO_GUESSING_INSTRUCTION}\n{JSON_ONLY_INSTRUCTION}",
        fields.join("\n")
    )
}
