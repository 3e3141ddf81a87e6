// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Instruction appended to every prompt that expects a JSON object back.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that keeps the model from inventing values it cannot read.
pub const NO_GUESSING_INSTRUCTION: &str = "\
    If a value is not printed in the document, return an empty string for it. \
    Do NOT infer, interpolate, or invent details.";
