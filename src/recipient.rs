/// A recipient's name as it appears on the certificate: given name first,
/// family name second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientName {
    pub given: String,
    pub family: String,
}

impl RecipientName {
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into().trim().to_string(),
            family: family.into().trim().to_string(),
        }
    }

    /// Splits a free-form display string into given/family by taking the
    /// last word as the family name. Used when only a single string is
    /// available (preview-style input), not for roster rows.
    pub fn from_display(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.rsplit_once(char::is_whitespace) {
            Some((given, family)) => Self::new(given, family),
            None => Self::new(trimmed, ""),
        }
    }

    /// The single-line form drawn when the name is not split.
    pub fn display(&self) -> String {
        if self.given.is_empty() {
            return self.family.clone();
        }
        if self.family.is_empty() {
            return self.given.clone();
        }
        format!("{} {}", self.given, self.family)
    }

    /// Count of non-whitespace characters in the combined name. Threshold
    /// comparisons in style resolution use this, never the raw string
    /// length, so padding spaces can't flip a name into "long" territory.
    pub fn visible_length(&self) -> usize {
        self.display()
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .count()
    }

    /// Deterministic output file stem. Same-named recipients collide and
    /// the later artifact wins; that is an accepted limitation. Path
    /// separators are replaced so a hostile roster cannot escape the
    /// output directory.
    pub fn artifact_stem(&self) -> String {
        format!("{}_{}", self.given, self.family)
            .chars()
            .map(|ch| match ch {
                '/' | '\\' => '-',
                other => other,
            })
            .collect()
    }
}

/// One roster row: the name plus where to send the certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientRow {
    pub name: RecipientName,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_length_ignores_whitespace() {
        let name = RecipientName::new("Anna  Maria", "Nowak");
        assert_eq!(name.visible_length(), "AnnaMariaNowak".len());
    }

    #[test]
    fn display_collapses_empty_parts() {
        assert_eq!(RecipientName::new("Ada", "").display(), "Ada");
        assert_eq!(RecipientName::new("", "Lovelace").display(), "Lovelace");
        assert_eq!(
            RecipientName::new("Ada", "Lovelace").display(),
            "Ada Lovelace"
        );
    }

    #[test]
    fn from_display_takes_last_word_as_family() {
        let name = RecipientName::from_display("Anna Maria Nowak");
        assert_eq!(name.given, "Anna Maria");
        assert_eq!(name.family, "Nowak");

        let single = RecipientName::from_display("Cher");
        assert_eq!(single.given, "Cher");
        assert_eq!(single.family, "");
    }

    #[test]
    fn artifact_stem_neutralizes_path_separators() {
        let name = RecipientName::new("A/B", "C\\D");
        assert_eq!(name.artifact_stem(), "A-B_C-D");
    }
}
