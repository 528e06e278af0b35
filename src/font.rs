use crate::error::{Error, Result};
use rustybuzz::{Direction as HbDirection, Face as HbFace, UnicodeBuffer};
use std::fs;
use std::path::Path;
use ttf_parser::GlyphId;

/// A loaded TrueType font: raw program bytes plus the metrics the PDF and
/// raster backends need. Metrics are normalized to 1000 units per em, the
/// scale PDF font dictionaries use.
#[derive(Debug)]
pub struct Font {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    pub(crate) metrics: FontMetrics,
}

#[derive(Debug)]
pub(crate) struct FontMetrics {
    pub(crate) first_char: u8,
    pub(crate) last_char: u8,
    /// Advance widths for the `first_char..=last_char` codepoints, /1000.
    pub(crate) widths: Vec<u16>,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: i16,
    pub(crate) stem_v: i16,
    pub(crate) bbox: (i16, i16, i16, i16),
    pub(crate) missing_width: u16,
    pub(crate) is_fixed_pitch: bool,
}

impl Font {
    /// Reads and parses a font file. Only TrueType-flavoured programs are
    /// accepted; the PDF writer embeds the glyf table directly.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|err| Error::Render(format!("invalid font file {}: {err}", path.display())))?;
        if face.tables().cff.is_some() {
            return Err(Error::Render(format!(
                "{} is an OpenType CFF font; only TrueType outlines are supported",
                path.display()
            )));
        }
        let name = face_name(&face, path);
        let metrics = FontMetrics::from_face(&face);
        Ok(Self {
            name,
            data,
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width of `text` at `font_size_pt`, in points. Text inside the
    /// precomputed codepoint range is summed from the width table; anything
    /// else goes through shaping so diacritics and non-Latin names measure
    /// correctly.
    pub fn measure_width_pt(&self, font_size_pt: f64, text: &str) -> f64 {
        if self.metrics.covers(text) {
            return self.metrics.measure(font_size_pt, text);
        }
        self.measure_shaped(font_size_pt, text)
            .unwrap_or_else(|| self.metrics.measure(font_size_pt, text))
    }

    fn measure_shaped(&self, font_size_pt: f64, text: &str) -> Option<f64> {
        let face = HbFace::from_slice(&self.data, 0)?;
        let units_per_em = face.units_per_em().max(1) as f64;
        let mut buffer = UnicodeBuffer::new();
        buffer.set_direction(detect_direction(text));
        buffer.push_str(text);
        let output = rustybuzz::shape(&face, &[], buffer);
        if output.glyph_positions().is_empty() {
            return None;
        }
        let units: i64 = output
            .glyph_positions()
            .iter()
            .map(|pos| pos.x_advance as i64)
            .sum();
        Some(font_size_pt * units as f64 / units_per_em)
    }

    /// Ascender height at `font_size_pt`, in points.
    pub fn ascent_pt(&self, font_size_pt: f64) -> f64 {
        font_size_pt * self.metrics.ascent as f64 / 1000.0
    }

    pub(crate) fn glyph_for_char(&self, ch: char) -> u16 {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return 0;
        };
        face.glyph_index(ch).map(|gid| gid.0).unwrap_or(0)
    }

    /// Advance of a glyph, /1000. Used for the PDF /W array.
    pub(crate) fn glyph_advance_units(&self, gid: u16) -> u16 {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return 0;
        };
        let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
        let units = face.units_per_em().max(1) as i64;
        let scaled = ((advance as i64) * 1000 + (units / 2)) / units;
        scaled.clamp(0, u16::MAX as i64) as u16
    }
}

impl FontMetrics {
    fn from_face(face: &ttf_parser::Face<'_>) -> Self {
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let first_char = 32u8;
        let last_char = 255u8;

        let mut widths = Vec::with_capacity((last_char - first_char + 1) as usize);
        for code in first_char..=last_char {
            let width = char::from_u32(code as u32)
                .and_then(|ch| face.glyph_index(ch))
                .and_then(|gid| face.glyph_hor_advance(gid))
                .unwrap_or(0);
            let scaled = (width as f32 * scale).round() as i32;
            widths.push(scaled.clamp(0, u16::MAX as i32) as u16);
        }
        let missing_width = widths
            .get((b' ' - first_char) as usize)
            .copied()
            .unwrap_or(0);

        let ascent = scale_i16(face.ascender(), scale);
        let descent = scale_i16(face.descender(), scale);
        let cap_height = face
            .capital_height()
            .map(|value| scale_i16(value, scale))
            .unwrap_or(ascent);
        let italic_angle = face
            .italic_angle()
            .map(|value| value.round() as i16)
            .unwrap_or(0);
        let bbox = face.global_bounding_box();
        let bbox = (
            scale_i16(bbox.x_min, scale),
            scale_i16(bbox.y_min, scale),
            scale_i16(bbox.x_max, scale),
            scale_i16(bbox.y_max, scale),
        );

        Self {
            first_char,
            last_char,
            widths,
            ascent,
            descent,
            cap_height,
            italic_angle,
            stem_v: 80,
            bbox,
            missing_width,
            is_fixed_pitch: face.is_monospaced(),
        }
    }

    fn covers(&self, text: &str) -> bool {
        let first = self.first_char as u32;
        let last = self.last_char as u32;
        text.chars().all(|ch| {
            let code = ch as u32;
            code >= first && code <= last
        })
    }

    fn measure(&self, font_size_pt: f64, text: &str) -> f64 {
        let mut units: i64 = 0;
        for ch in text.chars() {
            let code = ch as u32;
            let first = self.first_char as u32;
            let last = self.last_char as u32;
            let advance = if code >= first && code <= last {
                self.widths
                    .get((code - first) as usize)
                    .copied()
                    .unwrap_or(self.missing_width)
            } else {
                self.missing_width
            };
            units += advance as i64;
        }
        font_size_pt * units as f64 / 1000.0
    }
}

fn face_name(face: &ttf_parser::Face<'_>, path: &Path) -> String {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;
    let mut post = None;
    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        let name = name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        match entry.name_id {
            name_id::FAMILY => family = family.or(Some(name)),
            name_id::FULL_NAME => full = full.or(Some(name)),
            name_id::POST_SCRIPT_NAME => post = post.or(Some(name)),
            _ => {}
        }
    }

    post.or(full)
        .or(family)
        .or_else(|| {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "EmbeddedFont".to_string())
}

fn detect_direction(text: &str) -> HbDirection {
    let rtl = text.chars().any(|ch| {
        matches!(
            ch as u32,
            0x0590..=0x08FF | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFF | 0x1EE00..=0x1EEFF
        )
    });
    if rtl {
        HbDirection::RightToLeft
    } else {
        HbDirection::LeftToRight
    }
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round() as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_with_uniform_width(width: u16) -> FontMetrics {
        FontMetrics {
            first_char: 32,
            last_char: 255,
            widths: vec![width; 224],
            ascent: 800,
            descent: -200,
            cap_height: 700,
            italic_angle: 0,
            stem_v: 80,
            bbox: (0, -200, 1000, 800),
            missing_width: width,
            is_fixed_pitch: true,
        }
    }

    #[test]
    fn table_measure_scales_with_size_and_length() {
        let metrics = metrics_with_uniform_width(500);
        let width = metrics.measure(32.0, "ABCD");
        assert!((width - 32.0 * 4.0 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn covers_is_limited_to_the_precomputed_range() {
        let metrics = metrics_with_uniform_width(500);
        assert!(metrics.covers("Ada Lovelace"));
        assert!(!metrics.covers("Łukasz"));
    }

    #[test]
    fn rtl_text_is_detected() {
        assert_eq!(detect_direction("שלום"), HbDirection::RightToLeft);
        assert_eq!(detect_direction("Ada"), HbDirection::LeftToRight);
    }
}
