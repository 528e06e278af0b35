use crate::error::{Error, Result};
use crate::types::{Color, Orientation};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Outcome of looking up one style field. The style document is permissive:
/// numeric fields may arrive as JSON numbers or numeric strings, and a value
/// that fails to coerce is reported as `Invalid` so the resolver can log it
/// and fall back instead of aborting.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Absent,
    Invalid(String),
    Value(T),
}

impl<T> Field<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn invalid_raw(&self) -> Option<&str> {
        match self {
            Field::Invalid(raw) => Some(raw),
            _ => None,
        }
    }
}

/// Reads and merges a sequence of flat JSON documents, later files winning
/// key-by-key. A single file is the common case; the merge exists so a base
/// style can be overlaid with event-specific tweaks.
pub fn load_merged(paths: &[impl AsRef<Path>]) -> Result<Map<String, Value>> {
    let mut merged = Map::new();
    for path in paths {
        let object = read_object(path.as_ref())?;
        for (key, value) in object {
            merged.insert(key, value);
        }
    }
    Ok(merged)
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    let text = fs::read_to_string(path)
        .map_err(|err| Error::Config(format!("cannot read {}: {err}", path.display())))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|err| Error::Config(format!("malformed JSON in {}: {err}", path.display())))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Config(format!(
            "{} must contain a JSON object, found {other}",
            path.display()
        ))),
    }
}

/// The content/style document driving certificate layout. Kept as the raw
/// key-value map with typed accessors, because half of its fields tolerate
/// string-typed numbers and must degrade gracefully on junk.
#[derive(Debug, Clone, Default)]
pub struct StyleConfig {
    raw: Map<String, Value>,
}

impl StyleConfig {
    pub fn from_files(paths: &[impl AsRef<Path>]) -> Result<Self> {
        Ok(Self {
            raw: load_merged(paths)?,
        })
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(raw) => Self { raw },
            _ => Self { raw: Map::new() },
        }
    }

    fn number(&self, key: &str) -> Field<f64> {
        match self.raw.get(key) {
            None => Field::Absent,
            Some(Value::Number(number)) => match number.as_f64() {
                Some(value) if value.is_finite() => Field::Value(value),
                _ => Field::Invalid(number.to_string()),
            },
            Some(Value::String(text)) => match text.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Field::Value(value),
                _ => Field::Invalid(text.clone()),
            },
            Some(other) => Field::Invalid(other.to_string()),
        }
    }

    fn integer(&self, key: &str) -> Field<i64> {
        match self.raw.get(key) {
            None => Field::Absent,
            Some(Value::Number(number)) => match number.as_i64() {
                Some(value) => Field::Value(value),
                None => Field::Invalid(number.to_string()),
            },
            Some(Value::String(text)) => match text.trim().parse::<i64>() {
                Ok(value) => Field::Value(value),
                Err(_) => Field::Invalid(text.clone()),
            },
            Some(other) => Field::Invalid(other.to_string()),
        }
    }

    fn string(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    pub fn font_size(&self) -> Field<f64> {
        self.number("font_size")
    }

    pub fn text_y(&self) -> Field<f64> {
        self.number("text_y")
    }

    pub fn long_name_threshold(&self) -> Field<i64> {
        self.integer("long_name_threshold")
    }

    pub fn long_name_font_size(&self) -> Field<f64> {
        self.number("long_name_font_size")
    }

    pub fn long_name_text_y(&self) -> Field<f64> {
        self.number("long_name_text_y")
    }

    pub fn split_name_threshold(&self) -> Field<i64> {
        self.integer("split_name_threshold")
    }

    pub fn split_name_line_gap(&self) -> Field<f64> {
        self.number("split_name_line_gap")
    }

    pub fn split_name_font_size(&self) -> Field<f64> {
        self.number("split_name_font_size")
    }

    pub fn split_name_text_y(&self) -> Field<f64> {
        self.number("split_name_text_y")
    }

    pub fn orientation(&self) -> Field<Orientation> {
        match self.string("orientation") {
            None => Field::Absent,
            Some(raw) => match Orientation::from_config_value(raw) {
                Some(orientation) => Field::Value(orientation),
                None => Field::Invalid(raw.to_string()),
            },
        }
    }

    pub fn text_color(&self) -> Field<Color> {
        match self.string("text_color") {
            None => Field::Absent,
            Some(raw) => match Color::from_hex(raw) {
                Some(color) => Field::Value(color),
                None => Field::Invalid(raw.to_string()),
            },
        }
    }

    pub fn background_image(&self) -> Option<&str> {
        self.string("background_image")
    }

    pub fn font_path(&self) -> Option<&str> {
        self.string("font_path")
    }
}

/// Email template document. Strict: a malformed file aborts the run before
/// any certificate is touched.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub throttle_per_minute: u32,
}

impl EmailConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_strict(path)
    }

    /// Instantiates the body template for one recipient.
    pub fn body_for(&self, name: &str) -> String {
        self.body.replace("{name}", name)
    }

    /// Pause between sends implied by the throttle; zero means unthrottled.
    pub fn send_interval(&self) -> Option<Duration> {
        if self.throttle_per_minute == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(
                60.0 / self.throttle_per_minute as f64,
            ))
        }
    }
}

/// SMTP connection document.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub email_sender: String,
    pub email_password: String,
}

impl SmtpConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: SmtpConfig = load_strict(path)?;
        if config.smtp_server.trim().is_empty() {
            return Err(Error::Config("smtp_server is required".into()));
        }
        if config.smtp_port == 0 {
            return Err(Error::Config("smtp_port must be a positive integer".into()));
        }
        if config.email_sender.trim().is_empty() {
            return Err(Error::Config("email_sender is required".into()));
        }
        Ok(config)
    }
}

/// Debug-mode document; the raw value is normalized by [`crate::mode::RunMode`].
#[derive(Debug, Clone, Deserialize)]
pub struct DebugModeConfig {
    pub debug_mode: String,
}

impl DebugModeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_strict(path)
    }
}

fn load_strict<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|err| Error::Config(format!("cannot read {}: {err}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|err| Error::Config(format!("malformed JSON in {}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn style(value: Value) -> StyleConfig {
        StyleConfig::from_value(value)
    }

    #[test]
    fn numbers_coerce_from_numbers_and_strings() {
        let config = style(json!({"font_size": 32, "text_y": "107.5"}));
        assert_eq!(config.font_size(), Field::Value(32.0));
        assert_eq!(config.text_y(), Field::Value(107.5));
    }

    #[test]
    fn junk_numbers_report_the_raw_value() {
        let config = style(json!({"font_size": "big", "text_y": true}));
        assert_eq!(config.font_size(), Field::Invalid("big".into()));
        assert_eq!(config.text_y(), Field::Invalid("true".into()));
    }

    #[test]
    fn integers_reject_fractional_values() {
        let config = style(json!({"split_name_threshold": 24.5}));
        assert!(config.split_name_threshold().invalid_raw().is_some());
        let config = style(json!({"split_name_threshold": "10"}));
        assert_eq!(config.split_name_threshold(), Field::Value(10));
    }

    #[test]
    fn missing_fields_are_absent_not_invalid() {
        let config = style(json!({}));
        assert_eq!(config.text_y(), Field::Absent);
        assert_eq!(config.long_name_threshold(), Field::Absent);
        assert_eq!(config.orientation(), Field::Absent);
    }

    #[test]
    fn merge_is_last_wins() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.json");
        let overlay = dir.path().join("overlay.json");
        let mut file = fs::File::create(&base).unwrap();
        write!(file, "{}", json!({"font_size": 32, "text_y": 100})).unwrap();
        let mut file = fs::File::create(&overlay).unwrap();
        write!(file, "{}", json!({"text_y": 150})).unwrap();

        let config = StyleConfig::from_files(&[&base, &overlay]).unwrap();
        assert_eq!(config.font_size(), Field::Value(32.0));
        assert_eq!(config.text_y(), Field::Value(150.0));
    }

    #[test]
    fn non_object_documents_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let err = StyleConfig::from_files(&[&path]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn email_body_substitutes_the_name_placeholder() {
        let config = EmailConfig {
            subject: "Your certificate".into(),
            body: "<p>Hello {name}!</p>".into(),
            throttle_per_minute: 0,
        };
        assert_eq!(config.body_for("Ada"), "<p>Hello Ada!</p>");
        assert_eq!(config.send_interval(), None);
    }

    #[test]
    fn throttle_translates_to_an_interval() {
        let config = EmailConfig {
            subject: String::new(),
            body: String::new(),
            throttle_per_minute: 30,
        };
        assert_eq!(config.send_interval(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn smtp_config_validates_required_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smtp.json");
        fs::write(
            &path,
            json!({
                "smtp_server": "",
                "smtp_port": 587,
                "email_sender": "certs@example.org",
                "email_password": "hunter2"
            })
            .to_string(),
        )
        .unwrap();
        assert!(matches!(
            SmtpConfig::load(&path).unwrap_err(),
            Error::Config(_)
        ));
    }
}
