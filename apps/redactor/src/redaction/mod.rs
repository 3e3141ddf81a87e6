// Redaction job orchestration: inbound payload, the end-to-end pipeline, HTTP handler.

pub mod handlers;
pub mod payload;
pub mod pipeline;

pub use pipeline::RedactionPipeline;
