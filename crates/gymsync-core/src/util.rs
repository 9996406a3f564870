//! Shared utility functions used across multiple modules.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|error| panic!("{error}"))
});

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Parse a loose boolean flag (`1`, `true`, `yes`, `on`).
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Validate and double-quote a SQL identifier.
///
/// Column names arrive from whatever schema the source store has, so they are
/// checked before being spliced into statement text.
pub fn quote_identifier(name: &str) -> Result<String> {
    if IDENTIFIER.is_match(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(Error::InvalidInput(format!(
            "invalid SQL identifier: {}",
            compact_text(name)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" libsql://gym.turso.io ".to_string())),
            Some("libsql://gym.turso.io".to_string())
        );
    }

    #[test]
    fn parse_flag_accepts_common_truthy_values() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" ON "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn quote_identifier_rejects_injection() {
        assert_eq!(quote_identifier("biometric_id").unwrap(), "\"biometric_id\"");
        assert!(quote_identifier("name\"; DROP TABLE members; --").is_err());
        assert!(quote_identifier("1col").is_err());
        assert!(quote_identifier("").is_err());
    }
}
