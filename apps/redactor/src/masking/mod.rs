// Mask geometry: turns the model's page/ratio hint into per-page opaque rectangles.
// Pure computation, no I/O. The renderer consumes the resulting `MaskPlan`.

pub mod plan;

pub use plan::{compute_mask_plan, AnchorMode, MaskPlan, PageBox, Rect};
