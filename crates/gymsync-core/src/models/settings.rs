//! Remote sync credentials

use std::fmt;

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Process configuration key for the remote database URL.
pub const REMOTE_URL_ENV: &str = "TURSO_DATABASE_URL";
/// Process configuration key for the remote auth token.
pub const REMOTE_TOKEN_ENV: &str = "TURSO_AUTH_TOKEN";

/// A `(remote url, remote token)` pair used to reach the hosted store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from explicit values, rejecting blanks.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let url = normalize_text_option(Some(url.into()))
            .ok_or_else(|| Error::InvalidInput("remote url must not be empty".to_string()))?;
        let token = normalize_text_option(Some(token.into()))
            .ok_or_else(|| Error::InvalidInput("remote token must not be empty".to_string()))?;
        Ok(Self { url, token })
    }

    /// Resolve credentials from explicit values, falling back to process
    /// configuration for whichever half is not supplied.
    pub fn resolve(
        url: Option<String>,
        token: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let url = normalize_text_option(url).or_else(|| normalize_text_option(lookup(REMOTE_URL_ENV)));
        let token =
            normalize_text_option(token).or_else(|| normalize_text_option(lookup(REMOTE_TOKEN_ENV)));

        match (url, token) {
            (Some(url), Some(token)) => Ok(Self { url, token }),
            _ => Err(Error::MissingCredentials),
        }
    }

    /// Resolve credentials, falling back to the process environment.
    pub fn resolve_from_env(url: Option<String>, token: Option<String>) -> Result<Self> {
        Self::resolve(url, token, |name| std::env::var(name).ok())
    }

    /// Token with everything but the last four characters masked.
    pub fn redacted_token(&self) -> String {
        let visible: String = self
            .token
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{visible}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let credentials = Credentials::new("libsql://gym.turso.io", "secret-token").unwrap();
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn resolve_prefers_explicit_values() {
        let credentials = Credentials::resolve(
            Some("libsql://explicit.turso.io".to_string()),
            Some("explicit".to_string()),
            |_| Some("from-env".to_string()),
        )
        .unwrap();
        assert_eq!(credentials.url, "libsql://explicit.turso.io");
        assert_eq!(credentials.token, "explicit");
    }

    #[test]
    fn resolve_falls_back_to_lookup() {
        let credentials = Credentials::resolve(None, Some("tok".to_string()), |name| {
            (name == REMOTE_URL_ENV).then(|| "libsql://env.turso.io".to_string())
        })
        .unwrap();
        assert_eq!(credentials.url, "libsql://env.turso.io");
    }

    #[test]
    fn resolve_without_values_is_missing_credentials() {
        let error = Credentials::resolve(Some("  ".to_string()), None, |_| None).unwrap_err();
        assert!(matches!(error, Error::MissingCredentials));
    }

    #[test]
    fn redacted_token_keeps_suffix() {
        let credentials = Credentials::new("libsql://gym.turso.io", "abcdef123456").unwrap();
        assert_eq!(credentials.redacted_token(), "****3456");
    }
}
