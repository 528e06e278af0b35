//! Style resolution: maps a recipient name plus the content configuration
//! onto the concrete font size, baseline, and split layout used to draw the
//! certificate. The cascade is an ordered pipeline of override steps over an
//! accumulator; every invalid override degrades to the previous value and
//! surfaces as an [`Anomaly`] instead of failing the run.

use crate::config::{Field, StyleConfig};
use crate::error::{Error, Result};
use crate::layout::pt_to_mm;
use crate::recipient::RecipientName;
use std::fmt;

/// Names longer than this (visible characters) split onto two lines unless
/// the configuration overrides the threshold.
pub const DEFAULT_SPLIT_THRESHOLD: i64 = 24;

/// Fallback line gap as a fraction of the font height.
pub const SPLIT_GAP_RATIO: f64 = 0.85;

/// Fully resolved rendering style for one recipient. `line_gap_mm` is only
/// meaningful when `is_split` is set; the baseline is always finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub font_size_pt: f64,
    pub baseline_mm: f64,
    pub is_split: bool,
    pub first_line: String,
    pub second_line: String,
    pub line_gap_mm: f64,
}

/// A non-fatal resolution diagnostic: some configured override could not be
/// used and a documented fallback was applied instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    pub field: &'static str,
    pub detail: String,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.detail)
    }
}

/// Resolution result: the style plus whatever fallbacks were taken along the
/// way, so callers can log them without resolution changing shape.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleResolution {
    pub style: ResolvedStyle,
    pub anomalies: Vec<Anomaly>,
}

/// Resolves the rendering style for one recipient. Pure and deterministic:
/// the same name and configuration always produce the same result. The only
/// fatal case is a missing or unusable base `font_size`, without which no
/// rendering is possible.
pub fn resolve_style(name: &RecipientName, config: &StyleConfig) -> Result<StyleResolution> {
    let mut anomalies = Vec::new();

    let font_size = base_font_size(config)?;
    let baseline = base_baseline(config, &mut anomalies);

    let (font_size, baseline) =
        apply_long_name_override(name, config, font_size, baseline, &mut anomalies);

    let is_split = should_split_full_name(name, config, &mut anomalies);

    let (font_size, baseline, line_gap_mm) = if is_split {
        let (font_size, baseline) =
            resolve_split_style(font_size, baseline, config, &mut anomalies);
        let gap = resolve_split_line_gap(font_size, config, &mut anomalies);
        (font_size, baseline, gap)
    } else {
        (font_size, baseline, 0.0)
    };

    // A baseline must exist by the time anything is drawn; one font-height
    // from the top keeps single-line text visible with no text_y at all.
    let baseline_mm = baseline.unwrap_or_else(|| pt_to_mm(font_size));

    let (first_line, second_line) = if is_split {
        (name.given.clone(), name.family.clone())
    } else {
        (name.display(), String::new())
    };

    Ok(StyleResolution {
        style: ResolvedStyle {
            font_size_pt: font_size,
            baseline_mm,
            is_split,
            first_line,
            second_line,
            line_gap_mm,
        },
        anomalies,
    })
}

fn base_font_size(config: &StyleConfig) -> Result<f64> {
    match config.font_size() {
        Field::Value(size) if size > 0.0 => Ok(size),
        Field::Value(size) => Err(Error::Config(format!(
            "font_size must be positive, got {size}"
        ))),
        Field::Invalid(raw) => Err(Error::Config(format!(
            "font_size must be numeric, got '{raw}'"
        ))),
        Field::Absent => Err(Error::Config("font_size is required".into())),
    }
}

fn base_baseline(config: &StyleConfig, anomalies: &mut Vec<Anomaly>) -> Option<f64> {
    match config.text_y() {
        Field::Value(value) => Some(value),
        Field::Invalid(raw) => {
            anomalies.push(Anomaly {
                field: "text_y",
                detail: format!("invalid value '{raw}'; baseline left unset"),
            });
            None
        }
        Field::Absent => None,
    }
}

/// Applies the long-name override when the visible name length exceeds the
/// configured threshold. The baseline falls back to the base `text_y` chain,
/// never to unset.
pub(crate) fn apply_long_name_override(
    name: &RecipientName,
    config: &StyleConfig,
    font_size: f64,
    baseline: Option<f64>,
    anomalies: &mut Vec<Anomaly>,
) -> (f64, Option<f64>) {
    let threshold = match config.long_name_threshold() {
        Field::Value(threshold) => threshold,
        Field::Invalid(raw) => {
            anomalies.push(Anomaly {
                field: "long_name_threshold",
                detail: format!("invalid value '{raw}'; long-name override disabled"),
            });
            return (font_size, baseline);
        }
        Field::Absent => return (font_size, baseline),
    };

    if name.visible_length() as i64 <= threshold {
        return (font_size, baseline);
    }

    let font_size = match config.long_name_font_size() {
        Field::Value(size) if size > 0.0 => size,
        Field::Value(size) => {
            anomalies.push(Anomaly {
                field: "long_name_font_size",
                detail: format!("non-positive value {size}; keeping font size {font_size}"),
            });
            font_size
        }
        Field::Invalid(raw) => {
            anomalies.push(Anomaly {
                field: "long_name_font_size",
                detail: format!("invalid value '{raw}'; keeping font size {font_size}"),
            });
            font_size
        }
        Field::Absent => font_size,
    };

    let baseline = match config.long_name_text_y() {
        Field::Value(value) => Some(value),
        Field::Invalid(raw) => {
            anomalies.push(Anomaly {
                field: "long_name_text_y",
                detail: format!("invalid value '{raw}'; keeping base baseline"),
            });
            baseline
        }
        Field::Absent => baseline,
    };

    (font_size, baseline)
}

/// Split decision. A present-but-invalid threshold forces the split off:
/// never split on bad configuration. Splitting also requires both name parts
/// to be non-empty, so there is always text on each line.
pub(crate) fn should_split_full_name(
    name: &RecipientName,
    config: &StyleConfig,
    anomalies: &mut Vec<Anomaly>,
) -> bool {
    let threshold = match config.split_name_threshold() {
        Field::Value(threshold) => threshold,
        Field::Invalid(raw) => {
            anomalies.push(Anomaly {
                field: "split_name_threshold",
                detail: format!("invalid value '{raw}'; name will not be split"),
            });
            return false;
        }
        Field::Absent => DEFAULT_SPLIT_THRESHOLD,
    };

    name.visible_length() as i64 > threshold && !name.given.is_empty() && !name.family.is_empty()
}

/// Split-specific font size and baseline overrides, applied on top of
/// whatever the earlier steps produced.
pub(crate) fn resolve_split_style(
    font_size: f64,
    baseline: Option<f64>,
    config: &StyleConfig,
    anomalies: &mut Vec<Anomaly>,
) -> (f64, Option<f64>) {
    let font_size = match config.split_name_font_size() {
        Field::Value(size) if size > 0.0 => size,
        Field::Value(size) => {
            anomalies.push(Anomaly {
                field: "split_name_font_size",
                detail: format!("non-positive value {size}; keeping font size {font_size}"),
            });
            font_size
        }
        Field::Invalid(raw) => {
            anomalies.push(Anomaly {
                field: "split_name_font_size",
                detail: format!("invalid value '{raw}'; keeping font size {font_size}"),
            });
            font_size
        }
        Field::Absent => font_size,
    };

    let baseline = match config.split_name_text_y() {
        Field::Value(value) => Some(value),
        Field::Invalid(raw) => {
            anomalies.push(Anomaly {
                field: "split_name_text_y",
                detail: format!("invalid value '{raw}'; keeping current baseline"),
            });
            baseline
        }
        Field::Absent => baseline,
    };

    (font_size, baseline)
}

/// Gap between the two baselines of a split name, in millimetres. Without a
/// configured value the gap scales with the final font size.
pub(crate) fn resolve_split_line_gap(
    font_size: f64,
    config: &StyleConfig,
    anomalies: &mut Vec<Anomaly>,
) -> f64 {
    match config.split_name_line_gap() {
        Field::Value(gap) => gap,
        Field::Invalid(raw) => {
            anomalies.push(Anomaly {
                field: "split_name_line_gap",
                detail: format!("invalid value '{raw}'; using font-height spacing"),
            });
            pt_to_mm(font_size) * SPLIT_GAP_RATIO
        }
        Field::Absent => pt_to_mm(font_size) * SPLIT_GAP_RATIO,
    }
}
