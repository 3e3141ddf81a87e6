// Overlay text layout: metric tables, greedy word-wrap, labeled fields.
// CPU-bound and synchronous; called from the renderer inside spawn_blocking.

pub mod fields;
pub mod font_metrics;
pub mod wrap;

// Re-export the public API consumed by the renderer.
pub use fields::{layout_fields, OverlayText, RenderedField, ASCII_TEXT, FIELD_FAILURE_PLACEHOLDER};
pub use font_metrics::{LayoutConfig, HELVETICA};
