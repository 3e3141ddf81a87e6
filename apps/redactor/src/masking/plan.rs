//! Mask plan computation.
//!
//! # Normalization (applied in this order)
//! 1. Page index: absent, non-finite, negative or fractional → 0; past the end → last page.
//! 2. Ratio: absent, non-finite or outside (0, 1] → the anchor mode's default.
//! 3. Safety margin: `ratio' = min(ratio + 0.05, 1.0)`.
//!
//! # Plan
//! Every page before the anchor page is masked in full. The anchor page is masked
//! from its top edge down to `height × ratio'`. Later pages are never touched.
//! An empty document yields an empty plan.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extraction::MaskAnchor;

/// Added to the reported ratio so glyphs sitting on the boundary are still covered.
pub const MASK_MARGIN: f64 = 0.05;

/// Page size used when a page has no usable MediaBox (A4 portrait).
pub const A4_WIDTH_PT: f32 = 595.0;
pub const A4_HEIGHT_PT: f32 = 842.0;

/// What the model's anchor points at. Only affects the default ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    /// Ratio of the anchor page covered by the identifying header.
    PageRatio,
    /// Page and ratio at which the judgment body starts.
    BodyStart,
}

impl AnchorMode {
    pub fn default_ratio(self) -> f64 {
        match self {
            AnchorMode::PageRatio => 0.5,
            AnchorMode::BodyStart => 0.45,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown anchor mode '{0}'")]
pub struct ParseAnchorModeError(String);

impl FromStr for AnchorMode {
    type Err = ParseAnchorModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page_ratio" => Ok(AnchorMode::PageRatio),
            "body_start" => Ok(AnchorMode::BodyStart),
            other => Err(ParseAnchorModeError(other.to_string())),
        }
    }
}

/// A page's MediaBox in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    pub fn new(left: f32, bottom: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            bottom,
            width,
            height,
        }
    }

    pub fn a4() -> Self {
        Self::new(0.0, 0.0, A4_WIDTH_PT, A4_HEIGHT_PT)
    }

    pub fn top(&self) -> f32 {
        self.bottom + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskKind {
    FullPage,
    PartialTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskInstruction {
    pub page_index: usize,
    pub kind: MaskKind,
    pub rect: Rect,
}

/// Ordered mask instructions. At most one `PartialTop`, always last.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaskPlan {
    pub instructions: Vec<MaskInstruction>,
    /// Margin-adjusted ratio applied to the anchor page. Zero for an empty plan.
    pub ratio: f32,
}

impl MaskPlan {
    /// The partial mask on the anchor page.
    pub fn anchor(&self) -> Option<&MaskInstruction> {
        self.instructions
            .last()
            .filter(|i| i.kind == MaskKind::PartialTop)
    }

    /// Indices of every page that receives at least one instruction.
    pub fn masked_pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self.instructions.iter().map(|i| i.page_index).collect();
        pages.dedup();
        pages
    }
}

/// Clamps the raw page index to a valid page.
pub fn normalize_page_index(raw: Option<f64>, page_count: usize) -> usize {
    let index = match raw {
        Some(p) if p.is_finite() && p >= 0.0 && p.fract() == 0.0 => p as usize,
        _ => 0,
    };
    index.min(page_count.saturating_sub(1))
}

/// Validates the raw ratio and applies the safety margin.
pub fn normalize_ratio(raw: Option<f64>, mode: AnchorMode) -> f64 {
    let ratio = match raw {
        Some(r) if r.is_finite() && r > 0.0 && r <= 1.0 => r,
        _ => mode.default_ratio(),
    };
    (ratio + MASK_MARGIN).min(1.0)
}

pub fn compute_mask_plan(pages: &[PageBox], anchor: &MaskAnchor, mode: AnchorMode) -> MaskPlan {
    if pages.is_empty() {
        return MaskPlan::default();
    }

    let anchor_page = normalize_page_index(anchor.page_index, pages.len());
    let ratio = normalize_ratio(anchor.ratio, mode) as f32;

    let mut instructions: Vec<MaskInstruction> = pages[..anchor_page]
        .iter()
        .enumerate()
        .map(|(page_index, page)| MaskInstruction {
            page_index,
            kind: MaskKind::FullPage,
            rect: Rect {
                x: page.left,
                y: page.bottom,
                width: page.width,
                height: page.height,
            },
        })
        .collect();

    let page = &pages[anchor_page];
    let covered = page.height * ratio;
    instructions.push(MaskInstruction {
        page_index: anchor_page,
        kind: MaskKind::PartialTop,
        rect: Rect {
            x: page.left,
            y: page.top() - covered,
            width: page.width,
            height: covered,
        },
    });

    MaskPlan {
        instructions,
        ratio,
    }
}
