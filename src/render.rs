//! Certificate renderer: ties style resolution and layout to a canvas
//! backend and writes one artifact per recipient.

use crate::canvas::Canvas;
use crate::config::{Field, StyleConfig};
use crate::error::{Error, Result};
use crate::font::Font;
use crate::layout::{center_x, pt_to_mm, split_baselines};
use crate::pdf;
use crate::raster;
use crate::recipient::RecipientName;
use crate::style::resolve_style;
use crate::types::{Color, Orientation, PageSize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pdf,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
        }
    }
}

pub struct Renderer<'a> {
    config: &'a StyleConfig,
    out_dir: PathBuf,
    format: OutputFormat,
    dpi: u32,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a StyleConfig, out_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            config,
            out_dir: out_dir.into(),
            format,
            dpi: raster::DEFAULT_DPI,
        }
    }

    /// Renders one certificate and writes it under the output directory.
    /// Asset existence is validated up front so nothing is drawn for a
    /// recipient whose background or font cannot be found.
    pub fn render(&self, recipient: &RecipientName) -> Result<PathBuf> {
        let background = self
            .config
            .background_image()
            .ok_or_else(|| Error::Config("background_image is required".into()))?
            .to_string();
        let font_source = self
            .config
            .font_path()
            .ok_or_else(|| Error::Config("font_path is required".into()))?
            .to_string();

        let background_path = Path::new(&background);
        if !background_path.exists() {
            return Err(Error::AssetMissing {
                kind: "background image",
                path: background_path.to_path_buf(),
                recipient: recipient.display(),
            });
        }
        let font_path = Path::new(&font_source);
        if !font_path.exists() {
            return Err(Error::AssetMissing {
                kind: "font file",
                path: font_path.to_path_buf(),
                recipient: recipient.display(),
            });
        }

        let orientation = match self.config.orientation() {
            Field::Value(orientation) => orientation,
            Field::Invalid(raw) => {
                warn!(value = %raw, "invalid orientation; defaulting to landscape");
                Orientation::Landscape
            }
            Field::Absent => Orientation::Landscape,
        };
        let page = PageSize::a4(orientation);

        let font = Font::load(font_path)?;
        let resolution = resolve_style(recipient, self.config)?;
        for anomaly in &resolution.anomalies {
            warn!(recipient = %recipient.display(), %anomaly, "style fallback applied");
        }
        let style = resolution.style;

        let color = match self.config.text_color() {
            Field::Value(color) => color,
            Field::Invalid(raw) => {
                warn!(value = %raw, "invalid text_color; using black");
                Color::BLACK
            }
            Field::Absent => Color::BLACK,
        };

        let mut canvas = Canvas::new(page);
        canvas.draw_image(0.0, 0.0, page.width_mm, page.height_mm, background.clone());
        canvas.set_fill_color(color);
        canvas.set_font_size(style.font_size_pt);

        let measure = |text: &str| pt_to_mm(font.measure_width_pt(style.font_size_pt, text));
        if style.is_split {
            let (first_baseline, second_baseline) =
                split_baselines(style.baseline_mm, style.line_gap_mm);
            // The resolver only splits when both parts are non-empty;
            // re-check so an empty line can never reach a backend.
            if !style.first_line.is_empty() {
                let x = center_x(&style.first_line, &measure, page.width_mm);
                canvas.draw_text(x, first_baseline, style.first_line.clone());
            }
            let x = center_x(&style.second_line, &measure, page.width_mm);
            canvas.draw_text(x, second_baseline, style.second_line.clone());
        } else {
            let x = center_x(&style.first_line, &measure, page.width_mm);
            canvas.draw_text(x, style.baseline_mm, style.first_line.clone());
        }

        let document = canvas.finish();
        let bytes = match self.format {
            OutputFormat::Pdf => pdf::document_to_pdf(&document, &font)?,
            OutputFormat::Png => raster::document_to_png_pages(&document, &font, self.dpi)?
                .into_iter()
                .next()
                .ok_or_else(|| Error::Render("raster backend produced no pages".into()))?,
        };

        fs::create_dir_all(&self.out_dir).map_err(|err| {
            Error::Render(format!(
                "cannot create output directory {}: {err}",
                self.out_dir.display()
            ))
        })?;
        let artifact = self.out_dir.join(format!(
            "{}.{}",
            recipient.artifact_stem(),
            self.format.extension()
        ));
        fs::write(&artifact, &bytes)
            .map_err(|err| Error::Render(format!("cannot write {}: {err}", artifact.display())))?;

        info!(
            recipient = %recipient.display(),
            artifact = %artifact.display(),
            "generated certificate"
        );
        Ok(artifact)
    }
}
