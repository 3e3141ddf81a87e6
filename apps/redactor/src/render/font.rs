//! Overlay font as PDF objects.
//!
//! The built-in face is a base-14 Type1 font drawn with literal strings.
//! An embedded face becomes a `Type0` composite font with `Identity-H`
//! encoding: text is written as 2-byte glyph ids, and the `W` widths and
//! `ToUnicode` map cover exactly the glyphs that were drawn.

use std::collections::BTreeMap;

use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{name_id, Face, GlyphId};

use crate::fonts::{FontAsset, FontKind};
use crate::layout::font_metrics::FontMetricTable;
use crate::layout::HELVETICA;
use crate::render::RenderError;

/// Resource name the overlay font is registered under on the first page.
pub const FONT_RESOURCE_NAME: &str = "FRedact";

/// PDF glyph space is 1000 units per em.
const GLYPH_SPACE: f32 = 1000.0;

/// bfchar blocks are limited to 100 entries each.
const MAX_BFCHAR_ENTRIES: usize = 100;

pub enum PdfFont<'a> {
    Builtin {
        metrics: &'static FontMetricTable,
        font_id: ObjectId,
    },
    Embedded(EmbeddedFont<'a>),
}

pub struct EmbeddedFont<'a> {
    face: Face<'a>,
    bytes: &'a [u8],
    /// Reserved up front; the font objects are written by `finish`.
    font_id: ObjectId,
    /// Glyph id → the character it was drawn for.
    used: BTreeMap<u16, char>,
}

impl<'a> PdfFont<'a> {
    /// Registers the overlay font with `doc`. Unparseable bytes fall back to the built-in face.
    pub fn prepare(doc: &mut Document, asset: &'a FontAsset) -> Self {
        if let Some(bytes) = asset.bytes() {
            if let Ok(face) = Face::parse(bytes, 0) {
                return PdfFont::Embedded(EmbeddedFont {
                    face,
                    bytes,
                    font_id: doc.new_object_id(),
                    used: BTreeMap::new(),
                });
            }
        }
        Self::builtin(doc)
    }

    fn builtin(doc: &mut Document) -> Self {
        let metrics = &HELVETICA;
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => metrics.base_font,
            "Encoding" => "WinAnsiEncoding",
        });
        PdfFont::Builtin { metrics, font_id }
    }

    pub fn kind(&self) -> FontKind {
        match self {
            PdfFont::Builtin { .. } => FontKind::Fallback,
            PdfFont::Embedded(_) => FontKind::Embedded,
        }
    }

    pub fn font_id(&self) -> ObjectId {
        match self {
            PdfFont::Builtin { font_id, .. } => *font_id,
            PdfFont::Embedded(font) => font.font_id,
        }
    }

    /// Rendered width of `s` in points at `size_pt`.
    pub fn width_pt(&self, s: &str, size_pt: f32) -> f32 {
        match self {
            PdfFont::Builtin { metrics, .. } => metrics.width_pt(s, size_pt),
            PdfFont::Embedded(font) => {
                let units: f32 = s.chars().map(|c| font.advance(font.glyph(c))).sum();
                units * size_pt / GLYPH_SPACE
            }
        }
    }

    /// Whether every character of `text` has a glyph, without recording usage.
    pub fn covers(&self, text: &str) -> bool {
        match self {
            PdfFont::Builtin { metrics, .. } => text.chars().all(|c| metrics.supports(c)),
            PdfFont::Embedded(font) => text.chars().all(|c| font.glyph(c).is_some()),
        }
    }

    /// Encodes every string as a text operand, or none of them.
    ///
    /// Glyph usage is recorded only when all strings encode, so a rejected
    /// field leaves no trace in the embedded font's width table.
    pub fn encode_all(&mut self, texts: &[&str]) -> Result<Vec<Object>, RenderError> {
        match self {
            PdfFont::Builtin { metrics, .. } => texts
                .iter()
                .map(|text| {
                    if let Some(c) = text.chars().find(|c| !metrics.supports(*c)) {
                        return Err(RenderError::UnsupportedGlyph(c));
                    }
                    Ok(Object::String(text.as_bytes().to_vec(), StringFormat::Literal))
                })
                .collect(),
            PdfFont::Embedded(font) => {
                let shaped: Vec<Vec<(u16, char)>> = texts
                    .iter()
                    .map(|text| font.shape(text))
                    .collect::<Result<_, _>>()?;

                let operands = shaped
                    .iter()
                    .map(|glyphs| {
                        let bytes = glyphs.iter().flat_map(|(gid, _)| gid.to_be_bytes()).collect();
                        Object::String(bytes, StringFormat::Hexadecimal)
                    })
                    .collect();
                for (gid, c) in shaped.into_iter().flatten() {
                    font.used.entry(gid).or_insert(c);
                }
                Ok(operands)
            }
        }
    }

    /// Writes the embedded font's objects. The built-in face is complete after `prepare`.
    pub fn finish(self, doc: &mut Document) {
        if let PdfFont::Embedded(font) = self {
            font.write_objects(doc);
        }
    }
}

impl<'a> EmbeddedFont<'a> {
    fn glyph(&self, c: char) -> Option<GlyphId> {
        self.face.glyph_index(c)
    }

    /// Horizontal advance in glyph space. Unmapped characters use `.notdef`.
    fn advance(&self, glyph: Option<GlyphId>) -> f32 {
        let upem = self.face.units_per_em().max(1) as f32;
        let advance = self
            .face
            .glyph_hor_advance(glyph.unwrap_or(GlyphId(0)))
            .unwrap_or(0);
        advance as f32 * GLYPH_SPACE / upem
    }

    fn shape(&self, text: &str) -> Result<Vec<(u16, char)>, RenderError> {
        text.chars()
            .map(|c| {
                self.glyph(c)
                    .map(|gid| (gid.0, c))
                    .ok_or(RenderError::UnsupportedGlyph(c))
            })
            .collect()
    }

    fn base_font_name(&self) -> String {
        let name = self
            .face
            .names()
            .into_iter()
            .filter(|n| n.is_unicode() && n.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|n| n.to_string())
            .map(|n| sanitize_font_name(&n))
            .unwrap_or_default();
        if name.is_empty() {
            "RedactorOverlay".to_string()
        } else {
            name
        }
    }

    fn scaled(&self, units: i16) -> i64 {
        let upem = self.face.units_per_em().max(1) as f32;
        (units as f32 * GLYPH_SPACE / upem).round() as i64
    }

    fn write_objects(self, doc: &mut Document) {
        let base_font = self.base_font_name();
        let is_truetype = self.face.tables().glyf.is_some();

        let mut program = Stream::new(dictionary! {}, self.bytes.to_vec());
        if is_truetype {
            program.dict.set("Length1", self.bytes.len() as i64);
        } else {
            program.dict.set("Subtype", "OpenType");
        }
        let program_id = doc.add_object(program);

        let bbox = self.face.global_bounding_box();
        let ascent = self.scaled(self.face.ascender());
        let mut descriptor = dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(base_font.clone().into_bytes()),
            "Flags" => 32,
            "FontBBox" => vec![
                Object::Integer(self.scaled(bbox.x_min)),
                Object::Integer(self.scaled(bbox.y_min)),
                Object::Integer(self.scaled(bbox.x_max)),
                Object::Integer(self.scaled(bbox.y_max)),
            ],
            "ItalicAngle" => 0,
            "Ascent" => ascent,
            "Descent" => self.scaled(self.face.descender()),
            "CapHeight" => self.face.capital_height().map(|h| self.scaled(h)).unwrap_or(ascent),
            "StemV" => 80,
        };
        let program_key = if is_truetype { "FontFile2" } else { "FontFile3" };
        descriptor.set(program_key, program_id);
        let descriptor_id = doc.add_object(descriptor);

        let widths: BTreeMap<u16, i64> = self
            .used
            .keys()
            .map(|gid| (*gid, self.advance(Some(GlyphId(*gid))).round() as i64))
            .collect();
        let mut cid_font = dictionary! {
            "Type" => "Font",
            "Subtype" => if is_truetype { "CIDFontType2" } else { "CIDFontType0" },
            "BaseFont" => Object::Name(base_font.clone().into_bytes()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
            "W" => width_array(&widths),
        };
        if is_truetype {
            cid_font.set("CIDToGIDMap", "Identity");
        }
        let cid_font_id = doc.add_object(cid_font);

        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            to_unicode_cmap(&self.used).into_bytes(),
        ));

        doc.objects.insert(
            self.font_id,
            Object::Dictionary(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => Object::Name(base_font.into_bytes()),
                "Encoding" => "Identity-H",
                "DescendantFonts" => vec![Object::Reference(cid_font_id)],
                "ToUnicode" => to_unicode_id,
            }),
        );
    }
}

fn sanitize_font_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// `W` array in the `gid [width]` form, one entry per drawn glyph.
fn width_array(widths: &BTreeMap<u16, i64>) -> Vec<Object> {
    widths
        .iter()
        .flat_map(|(gid, width)| {
            [
                Object::Integer(*gid as i64),
                Object::Array(vec![Object::Integer(*width)]),
            ]
        })
        .collect()
}

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(&u16, &char)> = used.iter().collect();
    for chunk in entries.chunks(MAX_BFCHAR_ENTRIES) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, c) in chunk {
            let mut utf16 = [0u16; 2];
            let units: String = c
                .encode_utf16(&mut utf16)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            out.push_str(&format!("<{gid:04X}> <{units}>\n"));
        }
        out.push_str("endbfchar\n");
    }

    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_asset_prepares_builtin_font() {
        let mut doc = Document::with_version("1.7");
        let asset = FontAsset::fallback();
        let font = PdfFont::prepare(&mut doc, &asset);
        assert_eq!(font.kind(), FontKind::Fallback);

        let dict = doc.get_dictionary(font.font_id()).unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
    }

    #[test]
    fn test_builtin_encodes_ascii_as_literal() {
        let mut doc = Document::with_version("1.7");
        let asset = FontAsset::fallback();
        let mut font = PdfFont::prepare(&mut doc, &asset);

        let operands = font.encode_all(&["Court", "A v. B"]).unwrap();
        assert_eq!(operands.len(), 2);
        assert!(matches!(&operands[0], Object::String(b, StringFormat::Literal) if b == b"Court"));
        assert!(matches!(&operands[1], Object::String(b, StringFormat::Literal) if b == b"A v. B"));
    }

    #[test]
    fn test_builtin_rejects_non_latin_text() {
        let mut doc = Document::with_version("1.7");
        let asset = FontAsset::fallback();
        let mut font = PdfFont::prepare(&mut doc, &asset);

        let err = font.encode_all(&["Court", "서울중앙지방법원"]).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedGlyph('서')));
    }

    #[test]
    fn test_builtin_width_matches_metric_table() {
        let mut doc = Document::with_version("1.7");
        let asset = FontAsset::fallback();
        let font = PdfFont::prepare(&mut doc, &asset);
        assert_eq!(font.width_pt("Court", 11.0), HELVETICA.width_pt("Court", 11.0));
    }

    #[test]
    fn test_width_array_layout() {
        let widths = BTreeMap::from([(3u16, 500i64), (40u16, 920i64)]);
        let array = width_array(&widths);
        assert_eq!(array.len(), 4);
        assert_eq!(array[0].as_i64().unwrap(), 3);
        assert_eq!(array[1].as_array().unwrap()[0].as_i64().unwrap(), 500);
        assert_eq!(array[2].as_i64().unwrap(), 40);
        assert_eq!(array[3].as_array().unwrap()[0].as_i64().unwrap(), 920);
    }

    #[test]
    fn test_to_unicode_maps_glyphs_to_utf16() {
        let used = BTreeMap::from([(0x0102u16, '법'), (0x0003u16, 'A'), (0x0200u16, '😀')]);
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("3 beginbfchar"));
        assert!(cmap.contains("<0003> <0041>"));
        assert!(cmap.contains("<0102> <BC95>"));
        assert!(cmap.contains("<0200> <D83DDE00>"));
    }

    #[test]
    fn test_to_unicode_splits_large_tables() {
        let used: BTreeMap<u16, char> = (1u16..=150).map(|gid| (gid, 'a')).collect();
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("100 beginbfchar"));
        assert!(cmap.contains("50 beginbfchar"));
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(sanitize_font_name("NanumGothic Regular"), "NanumGothicRegular");
        assert_eq!(sanitize_font_name("Noto-Sans_KR"), "Noto-Sans_KR");
    }
}
