pub mod batch;
mod canvas;
mod config;
mod error;
mod font;
mod layout;
mod mail;
mod mode;
mod pdf;
mod raster;
mod recipient;
mod render;
mod roster;
mod style;
#[cfg(test)]
mod test_support;
mod types;

pub use batch::Summary;
pub use canvas::{Canvas, Command, Document, Page};
pub use config::{DebugModeConfig, EmailConfig, Field, SmtpConfig, StyleConfig, load_merged};
pub use error::{Error, Result};
pub use font::Font;
pub use layout::{baseline_to_top, center_x, mm_to_pt, mm_to_px, pt_to_mm, split_baselines};
pub use mail::{MailTransport, SmtpMailer};
pub use mode::RunMode;
pub use pdf::document_to_pdf;
pub use raster::{DEFAULT_DPI, document_to_png_pages};
pub use recipient::{RecipientName, RecipientRow};
pub use render::{OutputFormat, Renderer};
pub use roster::load_roster;
pub use style::{
    Anomaly, DEFAULT_SPLIT_THRESHOLD, ResolvedStyle, SPLIT_GAP_RATIO, StyleResolution,
    resolve_style,
};
pub use types::{Color, Orientation, PageSize};
