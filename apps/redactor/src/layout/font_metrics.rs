//! Static font-metric table for the built-in fallback face, plus overlay page geometry.
//!
//! Character widths are in em units (relative to font size), taken from the
//! standard Helvetica AFM. The fallback face is a PDF base-14 font, so the
//! viewer's widths match these exactly.
//! The table covers ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Overlay layout configuration
// ────────────────────────────────────────────────────────────────────────────

/// Layout parameters for the redaction overlay drawn on the first page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Left, right and top margin in points.
    pub margin_pt: f32,
    /// Text never starts below `page bottom + bottom_margin_pt`.
    pub bottom_margin_pt: f32,
    pub title_size_pt: f32,
    pub body_size_pt: f32,
    /// Vertical advance per line, as a multiple of the font size.
    pub line_height_factor: f32,
    /// Extra vertical space after each field.
    pub paragraph_gap_pt: f32,
    /// Width reserved for field labels; values start to the right of it.
    pub label_column_pt: f32,
}

impl LayoutConfig {
    pub fn body_line_height(&self) -> f32 {
        self.body_size_pt * self.line_height_factor
    }

    pub fn title_line_height(&self) -> f32 {
        self.title_size_pt * self.line_height_factor
    }

    /// Width available to wrapped values on a page of the given width.
    pub fn value_width(&self, page_width: f32) -> f32 {
        (page_width - 2.0 * self.margin_pt - self.label_column_pt).max(0.0)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_pt: 50.0,
            bottom_margin_pt: 50.0,
            title_size_pt: 16.0,
            body_size_pt: 11.0,
            line_height_factor: 1.4,
            paragraph_gap_pt: 8.0,
            label_column_pt: 90.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for a base-14 font.
///
/// `widths[i]` = width of ASCII character `(i + 32)` at 1em.
///
/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    /// PDF `BaseFont` name of the face.
    pub base_font: &'static str,
    widths: [f32; 95],
    /// Width used for characters outside the table when measuring.
    pub average_char_width: f32,
}

impl FontMetricTable {
    /// True if the face can draw `c` (printable ASCII only).
    pub fn supports(&self, c: char) -> bool {
        (' '..='~').contains(&c)
    }

    /// Measures the rendered width of a string in em units.
    ///
    /// Characters outside the table fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Width of `s` in points at `size_pt`.
    pub fn width_pt(&self, s: &str, size_pt: f32) -> f32 {
        self.measure_str(s) * size_pt
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width table  (95 ASCII printable characters)
// ────────────────────────────────────────────────────────────────────────────

/// Helvetica, the built-in fallback face.
pub static HELVETICA: FontMetricTable = FontMetricTable {
    base_font: "Helvetica",
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.556,
};

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
