//! Output validation.
//!
//! Validation fails soft: findings are attached to the response as
//! warnings, the text itself is never discarded.

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[a-z][a-z0-9_]*\}").expect("valid regex"));

/// Findings from validating a generated response.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Check a response for empty output and unresolved template placeholders.
pub fn validate(text: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    if text.trim().is_empty() {
        report
            .warnings
            .push("response is empty or whitespace-only".to_string());
        return report;
    }

    for capture in PLACEHOLDER_RE.find_iter(text) {
        report.warnings.push(format!(
            "unresolved template placeholder: {}",
            capture.as_str()
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_passes() {
        assert!(validate("Project Phoenix is 16.7% complete.").is_clean());
    }

    #[test]
    fn test_empty_output_is_flagged_not_discarded() {
        let report = validate("   \n  ");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("empty"));
    }

    #[test]
    fn test_unresolved_placeholders_are_flagged() {
        let report = validate("Hello {recipient_name}, the status is {status}.");
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("{recipient_name}"));
    }
}
