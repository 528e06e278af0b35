//! PDF backend. Emits the document as hand-assembled PDF objects: a page
//! tree, one embedded TrueType font (Identity-H, so any glyph the font
//! carries can be addressed), the background image XObject, and a content
//! stream per page. Streams are ASCIIHex-encoded; JPEG backgrounds pass
//! through as DCTDecode.

use crate::canvas::{Command, Document, Page};
use crate::error::{Error, Result};
use crate::font::Font;
use crate::layout::mm_to_pt;
use crate::types::PageSize;
use image::GenericImageView;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

pub fn document_to_pdf(document: &Document, font: &Font) -> Result<Vec<u8>> {
    let glyph_map = collect_glyph_map(document, font);
    let image_sources = collect_image_sources(document);

    let mut objects: Vec<String> = Vec::new();
    objects.push(String::new()); // 1: catalog, patched once ids are known
    objects.push(String::new()); // 2: page tree, patched once ids are known

    objects.push(font_file_object(&font.data));
    let font_file_id = objects.len();
    objects.push(font_descriptor_object(font, font_file_id));
    let descriptor_id = objects.len();
    objects.push(cid_font_object(font, descriptor_id, &glyph_map));
    let cid_font_id = objects.len();
    objects.push(stream_object(&to_unicode_cmap(&glyph_map)));
    let to_unicode_id = objects.len();
    objects.push(type0_font_object(font, cid_font_id, to_unicode_id));
    let type0_id = objects.len();

    let mut image_names: BTreeMap<String, String> = BTreeMap::new();
    let mut image_resources: Vec<(String, usize)> = Vec::new();
    for (index, source) in image_sources.iter().enumerate() {
        let image = load_image(source)?;
        let smask_id = image.alpha.as_ref().map(|alpha| {
            objects.push(image_smask_object(alpha));
            objects.len()
        });
        objects.push(image_object(&image, smask_id));
        let name = format!("Im{}", index + 1);
        image_resources.push((name.clone(), objects.len()));
        image_names.insert(source.clone(), name);
    }

    let resources = resources_dictionary(type0_id, &image_resources);

    let mut page_ids = Vec::new();
    for page in &document.pages {
        let content = page_content(page, document.page_size, &image_names, font);
        objects.push(stream_object(&content));
        let content_id = objects.len();
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources {} /Contents {} 0 R >>",
            fmt_coord(document.page_size.width_pt()),
            fmt_coord(document.page_size.height_pt()),
            resources,
            content_id
        ));
        page_ids.push(objects.len());
    }

    objects.push("<< /Producer (laurel) >>".to_string());
    let info_id = objects.len();

    objects[0] = "<< /Type /Catalog /Pages 2 0 R >>".to_string();
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    objects[1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids,
        page_ids.len()
    );

    Ok(build_pdf(&objects, 1, Some(info_id)))
}

fn collect_glyph_map(document: &Document, font: &Font) -> BTreeMap<u16, String> {
    let mut map = BTreeMap::new();
    for page in &document.pages {
        for command in &page.commands {
            if let Command::DrawText { text, .. } = command {
                for ch in text.chars() {
                    let gid = font.glyph_for_char(ch);
                    if gid != 0 {
                        map.entry(gid).or_insert_with(|| ch.to_string());
                    }
                }
            }
        }
    }
    map
}

fn collect_image_sources(document: &Document) -> Vec<String> {
    let mut sources = Vec::new();
    for page in &document.pages {
        for command in &page.commands {
            if let Command::DrawImage { source, .. } = command {
                if !sources.contains(source) {
                    sources.push(source.clone());
                }
            }
        }
    }
    sources
}

fn page_content(
    page: &Page,
    page_size: PageSize,
    image_names: &BTreeMap<String, String>,
    font: &Font,
) -> String {
    let page_height_pt = page_size.height_pt();
    let mut out = String::new();
    let mut font_size_pt = 12.0f64;
    for command in &page.commands {
        match command {
            Command::SetFillColor(color) => {
                let _ = writeln!(
                    out,
                    "{} {} {} rg",
                    fmt_coord(color.r as f64),
                    fmt_coord(color.g as f64),
                    fmt_coord(color.b as f64)
                );
            }
            Command::SetFontSize(size) => font_size_pt = *size,
            Command::DrawText {
                x_mm,
                baseline_mm,
                text,
            } => {
                // Canvas baselines are measured from the page top; PDF user
                // space grows upward from the bottom.
                let x = mm_to_pt(*x_mm);
                let y = page_height_pt - mm_to_pt(*baseline_mm);
                out.push_str("BT\n");
                let _ = writeln!(out, "/F1 {} Tf", fmt_coord(font_size_pt));
                let _ = writeln!(out, "{} {} Td", fmt_coord(x), fmt_coord(y));
                let _ = writeln!(out, "{} Tj", encode_cid_hex(text, font));
                out.push_str("ET\n");
            }
            Command::DrawImage {
                x_mm,
                y_mm,
                width_mm,
                height_mm,
                source,
            } => {
                if let Some(name) = image_names.get(source) {
                    let width = mm_to_pt(*width_mm);
                    let height = mm_to_pt(*height_mm);
                    let x = mm_to_pt(*x_mm);
                    let y = page_height_pt - mm_to_pt(*y_mm) - height;
                    out.push_str("q\n");
                    let _ = writeln!(
                        out,
                        "{} 0 0 {} {} {} cm",
                        fmt_coord(width),
                        fmt_coord(height),
                        fmt_coord(x),
                        fmt_coord(y)
                    );
                    let _ = writeln!(out, "/{} Do", name);
                    out.push_str("Q\n");
                }
            }
        }
    }
    out
}

fn encode_cid_hex(text: &str, font: &Font) -> String {
    let mut out = String::new();
    out.push('<');
    for ch in text.chars() {
        let _ = write!(out, "{:04X}", font.glyph_for_char(ch));
    }
    out.push('>');
    out
}

fn resources_dictionary(type0_id: usize, images: &[(String, usize)]) -> String {
    let mut out = format!("<< /Font << /F1 {} 0 R >>", type0_id);
    if !images.is_empty() {
        let entries = images
            .iter()
            .map(|(name, id)| format!("/{} {} 0 R", name, id))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = write!(out, " /XObject << {} >>", entries);
    }
    out.push_str(" >>");
    out
}

struct ImageData {
    width: u32,
    height: u32,
    color_space: &'static str,
    jpeg: bool,
    data: Vec<u8>,
    alpha: Option<AlphaData>,
}

struct AlphaData {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

fn load_image(source: &str) -> Result<ImageData> {
    let path = Path::new(source);
    let bytes = std::fs::read(path)
        .map_err(|err| Error::Render(format!("cannot read background image {source}: {err}")))?;
    let format = image::guess_format(&bytes).ok();
    let decoded = image::load_from_memory(&bytes)
        .map_err(|err| Error::Render(format!("cannot decode background image {source}: {err}")))?;
    let (width, height) = decoded.dimensions();

    if format == Some(image::ImageFormat::Jpeg) {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Ok(ImageData {
            width,
            height,
            color_space,
            jpeg: true,
            data: bytes,
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width as usize) * (height as usize) * 3);
    let mut alpha = Vec::with_capacity((width as usize) * (height as usize));
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    Ok(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        jpeg: false,
        data: rgb,
        alpha: has_alpha.then_some(AlphaData {
            width,
            height,
            data: alpha,
        }),
    })
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filter = if image.jpeg {
        "[/ASCIIHexDecode /DCTDecode]"
    } else {
        "/ASCIIHexDecode"
    };
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent 8 /Length {} /Filter {}{} >>\nstream\n{}\nendstream",
        image.width,
        image.height,
        image.color_space,
        stream_data.len(),
        filter,
        smask,
        stream_data
    )
}

fn image_smask_object(alpha: &AlphaData) -> String {
    let stream_data = encode_stream_data(&alpha.data);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter /ASCIIHexDecode >>\nstream\n{}\nendstream",
        alpha.width,
        alpha.height,
        stream_data.len(),
        stream_data
    )
}

fn font_file_object(data: &[u8]) -> String {
    let mut stream_data = ascii_hex_encode(data);
    stream_data.push('>');
    stream_data.push('\n');
    format!(
        "<< /Length {} /Length1 {} /Filter /ASCIIHexDecode >>\nstream\n{}endstream",
        stream_data.len(),
        data.len(),
        stream_data
    )
}

fn font_descriptor_object(font: &Font, font_file_id: usize) -> String {
    let metrics = &font.metrics;
    let mut flags = 32;
    if metrics.is_fixed_pitch {
        flags |= 1;
    }
    format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags {} /FontBBox [{} {} {} {}] /ItalicAngle {} /Ascent {} /Descent {} /CapHeight {} /StemV {} /MissingWidth {} /FontFile2 {} 0 R >>",
        sanitize_font_name(font.name()),
        flags,
        metrics.bbox.0,
        metrics.bbox.1,
        metrics.bbox.2,
        metrics.bbox.3,
        metrics.italic_angle,
        metrics.ascent,
        metrics.descent,
        metrics.cap_height,
        metrics.stem_v,
        metrics.missing_width,
        font_file_id
    )
}

fn cid_font_object(font: &Font, descriptor_id: usize, glyph_map: &BTreeMap<u16, String>) -> String {
    let mut entries = Vec::new();
    for gid in glyph_map.keys() {
        let advance = font.glyph_advance_units(*gid);
        let advance = if advance > 0 {
            advance
        } else {
            font.metrics.missing_width
        };
        entries.push(format!("{} [{}]", gid, advance));
    }
    let w_array = if entries.is_empty() {
        String::new()
    } else {
        format!(" /W [{}]", entries.join(" "))
    };
    format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /FontDescriptor {} 0 R{} /CIDToGIDMap /Identity >>",
        sanitize_font_name(font.name()),
        descriptor_id,
        w_array
    )
}

fn type0_font_object(font: &Font, cid_font_id: usize, to_unicode_id: usize) -> String {
    format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
        sanitize_font_name(font.name()),
        cid_font_id,
        to_unicode_id
    )
}

fn to_unicode_cmap(glyph_map: &BTreeMap<u16, String>) -> String {
    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(&u16, &String)> = glyph_map.iter().collect();
    for chunk in entries.chunks(100) {
        let _ = writeln!(out, "{} beginbfchar", chunk.len());
        for (gid, text) in chunk {
            let mut unicode = String::new();
            for ch in text.chars() {
                let code = ch as u32;
                if code <= 0xFFFF {
                    let _ = write!(unicode, "{:04X}", code);
                } else {
                    let code = code - 0x1_0000;
                    let high = 0xD800 | (code >> 10);
                    let low = 0xDC00 | (code & 0x3FF);
                    let _ = write!(unicode, "{:04X}{:04X}", high, low);
                }
            }
            let _ = writeln!(out, "<{:04X}> <{}>", gid, unicode);
        }
        out.push_str("endbfchar\n");
    }

    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    if out.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        out
    }
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for (index, byte) in data.iter().enumerate() {
        let _ = write!(out, "{:02X}", byte);
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = ascii_hex_encode(data);
    hex.push('>');
    hex
}

fn build_pdf(objects: &[String], catalog_id: usize, info_id: Option<usize>) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::new();
    for (index, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(object.as_bytes());
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }

    let mut trailer = format!(
        "trailer\n<< /Size {} /Root {} 0 R",
        objects.len() + 1,
        catalog_id
    );
    if let Some(info_id) = info_id {
        trailer.push_str(&format!(" /Info {} 0 R", info_id));
    }
    trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF", xref_start));
    out.extend_from_slice(trailer.as_bytes());

    out
}

fn fmt_coord(value: f64) -> String {
    let milli = (value * 1000.0).round() as i64;
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut text = format!("{}{}.{:03}", sign, int_part, frac_part);
        while text.ends_with('0') {
            text.pop();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::font::FontMetrics;
    use crate::types::{Color, Orientation, PageSize};

    fn dummy_font() -> Font {
        Font {
            name: "Test Font".to_string(),
            data: vec![0u8; 8],
            metrics: FontMetrics {
                first_char: 32,
                last_char: 255,
                widths: vec![500; 224],
                ascent: 800,
                descent: -200,
                cap_height: 700,
                italic_angle: 0,
                stem_v: 80,
                bbox: (0, -200, 1000, 800),
                missing_width: 500,
                is_fixed_pitch: false,
            },
        }
    }

    #[test]
    fn fmt_coord_trims_trailing_zeros() {
        assert_eq!(fmt_coord(0.0), "0");
        assert_eq!(fmt_coord(297.0), "297");
        assert_eq!(fmt_coord(107.25), "107.25");
        assert_eq!(fmt_coord(-1.5), "-1.5");
    }

    #[test]
    fn sanitize_font_name_strips_awkward_characters() {
        assert_eq!(sanitize_font_name("Lato Black"), "Lato-Black");
        assert_eq!(sanitize_font_name("!!!"), "EmbeddedFont");
    }

    #[test]
    fn document_emits_core_pdf_structure() {
        let mut canvas = Canvas::new(PageSize::a4(Orientation::Landscape));
        canvas.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        canvas.set_font_size(32.0);
        canvas.draw_text(100.0, 107.0, "Ada Lovelace");
        let document = canvas.finish();

        let bytes = document_to_pdf(&document, &dummy_font()).unwrap();
        let pdf = String::from_utf8_lossy(&bytes);
        assert!(pdf.starts_with("%PDF-1.7"));
        assert!(pdf.contains("/Type /Catalog"));
        assert!(pdf.contains("/Subtype /Type0"));
        assert!(pdf.contains("/Encoding /Identity-H"));
        assert!(pdf.contains("/FontFile2"));
        assert!(pdf.contains("1 0 0 rg"));
        assert!(pdf.contains("/F1 32 Tf"));
        assert!(pdf.contains("startxref"));
        assert!(pdf.ends_with("%%EOF"));
    }

    #[test]
    fn text_baseline_converts_to_bottom_up_user_space() {
        let mut canvas = Canvas::new(PageSize::a4(Orientation::Landscape));
        canvas.draw_text(0.0, 210.0, "X");
        let document = canvas.finish();
        let bytes = document_to_pdf(&document, &dummy_font()).unwrap();
        let pdf = String::from_utf8_lossy(&bytes);
        // A baseline on the bottom edge of a 210 mm page lands at y = 0.
        assert!(pdf.contains("0 0 Td"));
    }

    #[test]
    fn missing_background_file_is_a_render_error() {
        let mut canvas = Canvas::new(PageSize::a4(Orientation::Landscape));
        canvas.draw_image(0.0, 0.0, 297.0, 210.0, "/nonexistent/bg.png");
        let document = canvas.finish();
        let err = document_to_pdf(&document, &dummy_font()).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }
}
