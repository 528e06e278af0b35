//! Raster backend. Plays a document into a tiny-skia pixmap and encodes it
//! as PNG. Text is drawn from TrueType outlines; the vertical anchor goes
//! through `baseline_to_top` so the whole-pixel rounding matches what a
//! top-left-anchored raster API would produce.

use crate::canvas::{Command, Document};
use crate::error::{Error, Result};
use crate::font::Font;
use crate::layout::{MM_PER_INCH, baseline_to_top, mm_to_px, pt_to_mm};
use crate::types::{Color, PageSize};
use std::collections::HashMap;
use std::path::Path;
use tiny_skia::{FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Transform};
use ttf_parser::OutlineBuilder;

pub const DEFAULT_DPI: u32 = 150;

pub fn document_to_png_pages(document: &Document, font: &Font, dpi: u32) -> Result<Vec<Vec<u8>>> {
    let dpi = if dpi == 0 { DEFAULT_DPI } else { dpi };
    let width_px = mm_to_px_dimension(document.page_size.width_mm, dpi)?;
    let height_px = mm_to_px_dimension(document.page_size.height_mm, dpi)?;

    let mut pages = Vec::with_capacity(document.pages.len());
    let mut image_cache: HashMap<String, Option<Pixmap>> = HashMap::new();

    for page in &document.pages {
        let mut pixmap = Pixmap::new(width_px, height_px).ok_or_else(|| {
            Error::Render(format!(
                "invalid raster size {width_px}x{height_px} at {dpi} DPI"
            ))
        })?;
        pixmap.fill(tiny_skia::Color::from_rgba8(255, 255, 255, 255));

        let mut fill_color = Color::BLACK;
        let mut font_size_pt = 12.0f64;

        for command in &page.commands {
            match command {
                Command::SetFillColor(color) => fill_color = *color,
                Command::SetFontSize(size) => font_size_pt = *size,
                Command::DrawImage {
                    x_mm,
                    y_mm,
                    width_mm,
                    height_mm,
                    source,
                } => {
                    let cached = image_cache
                        .entry(source.clone())
                        .or_insert_with(|| load_image_pixmap(source));
                    if let Some(image) = cached.as_ref() {
                        draw_image(
                            &mut pixmap,
                            image,
                            document.page_size,
                            (width_px, height_px),
                            (*x_mm, *y_mm, *width_mm, *height_mm),
                        );
                    }
                }
                Command::DrawText {
                    x_mm,
                    baseline_mm,
                    text,
                } => {
                    draw_text(
                        &mut pixmap,
                        font,
                        fill_color,
                        font_size_pt,
                        (*x_mm, *baseline_mm),
                        text,
                        document.page_size,
                        (width_px, height_px),
                    );
                }
            }
        }

        let png = pixmap
            .encode_png()
            .map_err(|err| Error::Render(format!("png encode failed: {err}")))?;
        pages.push(png);
    }

    Ok(pages)
}

fn mm_to_px_dimension(value_mm: f64, dpi: u32) -> Result<u32> {
    let px = (value_mm / MM_PER_INCH * dpi as f64).round();
    if !(1.0..=65_536.0).contains(&px) {
        return Err(Error::Render(format!(
            "page dimension {value_mm} mm does not rasterize at {dpi} DPI"
        )));
    }
    Ok(px as u32)
}

fn load_image_pixmap(source: &str) -> Option<Pixmap> {
    let bytes = std::fs::read(Path::new(source)).ok()?;
    let decoded = image::load_from_memory(&bytes).ok()?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    let src = rgba.as_raw();
    let dst = pixmap.data_mut();
    for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let [r, g, b, a] = [src_px[0], src_px[1], src_px[2], src_px[3]];
        dst_px[0] = premul_u8(r, a);
        dst_px[1] = premul_u8(g, a);
        dst_px[2] = premul_u8(b, a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

fn premul_u8(value: u8, alpha: u8) -> u8 {
    ((value as u16 * alpha as u16 + 127) / 255) as u8
}

fn draw_image(
    pixmap: &mut Pixmap,
    image: &Pixmap,
    page: PageSize,
    (page_w_px, page_h_px): (u32, u32),
    (x_mm, y_mm, width_mm, height_mm): (f64, f64, f64, f64),
) {
    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    if src_w <= 0.0 || src_h <= 0.0 {
        return;
    }
    let target_w = mm_to_px(width_mm, page.width_mm, page_w_px) as f32;
    let target_h = mm_to_px(height_mm, page.height_mm, page_h_px) as f32;
    let x = mm_to_px(x_mm, page.width_mm, page_w_px) as f32;
    let y = mm_to_px(y_mm, page.height_mm, page_h_px) as f32;

    let transform = Transform::from_row(target_w / src_w, 0.0, 0.0, target_h / src_h, x, y);
    let mut paint = PixmapPaint::default();
    paint.quality = FilterQuality::Bilinear;
    pixmap.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
}

#[allow(clippy::too_many_arguments)]
fn draw_text(
    pixmap: &mut Pixmap,
    font: &Font,
    color: Color,
    font_size_pt: f64,
    (x_mm, baseline_mm): (f64, f64),
    text: &str,
    page: PageSize,
    (page_w_px, page_h_px): (u32, u32),
) {
    let size_px = mm_to_px(pt_to_mm(font_size_pt), page.height_mm, page_h_px);
    if size_px <= 0.0 {
        return;
    }
    let Ok(face) = ttf_parser::Face::parse(&font.data, 0) else {
        return;
    };
    let units_per_em = face.units_per_em().max(1) as f64;
    let scale = size_px / units_per_em;

    let ascent_px = face.ascender() as f64 * scale;
    let baseline_px = mm_to_px(baseline_mm, page.height_mm, page_h_px);
    // Anchor at the rounded top edge, then place outlines back on the
    // baseline below it.
    let top_px = baseline_to_top(ascent_px, baseline_px);
    let origin_y = top_px as f64 + ascent_px;

    let paint = fill_paint(color);
    let mut pen_x = mm_to_px(x_mm, page.width_mm, page_w_px);

    for ch in text.chars() {
        let Some(gid) = face.glyph_index(ch) else {
            pen_x += font.metrics.missing_width as f64 / 1000.0 * size_px;
            continue;
        };
        let mut builder = GlyphOutline::new(pen_x, origin_y, scale);
        if face.outline_glyph(gid, &mut builder).is_some() {
            if let Some(path) = builder.finish() {
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
        pen_x += face.glyph_hor_advance(gid).unwrap_or(0) as f64 * scale;
    }
}

fn fill_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(tiny_skia::Color::from_rgba8(
        channel_u8(color.r),
        channel_u8(color.g),
        channel_u8(color.b),
        255,
    ));
    paint.anti_alias = true;
    paint
}

fn channel_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Maps glyph outlines (font units, y-up) into pixmap space (pixels,
/// y-down) at a pen position.
struct GlyphOutline {
    builder: PathBuilder,
    origin_x: f64,
    origin_y: f64,
    scale: f64,
}

impl GlyphOutline {
    fn new(origin_x: f64, origin_y: f64, scale: f64) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn map_x(&self, x: f32) -> f32 {
        (self.origin_x + x as f64 * self.scale) as f32
    }

    fn map_y(&self, y: f32) -> f32 {
        (self.origin_y - y as f64 * self.scale) as f32
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(self.map_x(x), self.map_y(y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(self.map_x(x), self.map_y(y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder
            .quad_to(self.map_x(x1), self.map_y(y1), self.map_x(x), self.map_y(y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.map_x(x1),
            self.map_y(y1),
            self.map_x(x2),
            self.map_y(y2),
            self.map_x(x),
            self.map_y(y),
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
