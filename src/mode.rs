use crate::error::{Error, Result};

/// Run mode controlling whether rendered certificates are actually mailed.
/// `Test` renders everything but skips the SMTP send step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    Test,
}

impl RunMode {
    /// Maps the raw `debug_mode` config value onto a run mode. Legacy
    /// boolean spellings are accepted alongside the labels; anything else
    /// is fatal, since guessing between send and no-send is unsafe.
    pub fn normalize(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full" | "f" | "true" => Ok(RunMode::Full),
            "test" | "t" | "false" => Ok(RunMode::Test),
            _ => Err(Error::Config(format!(
                "unsupported debug_mode value '{raw}'; expected 'Full'/'F' or 'Test'/'T'"
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Full => "Full",
            RunMode::Test => "Test",
        }
    }

    pub fn should_send(&self) -> bool {
        matches!(self, RunMode::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_spellings_normalize_to_sending_mode() {
        for raw in ["Full", "f", "TRUE", "  full  "] {
            let mode = RunMode::normalize(raw).unwrap();
            assert_eq!(mode, RunMode::Full);
            assert_eq!(mode.label(), "Full");
            assert!(mode.should_send());
        }
    }

    #[test]
    fn test_spellings_normalize_to_dry_run() {
        for raw in ["Test", "T", "false"] {
            let mode = RunMode::normalize(raw).unwrap();
            assert_eq!(mode, RunMode::Test);
            assert_eq!(mode.label(), "Test");
            assert!(!mode.should_send());
        }
    }

    #[test]
    fn unknown_values_are_fatal() {
        let err = RunMode::normalize("maybe").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("maybe"));
    }
}
