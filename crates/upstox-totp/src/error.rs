//! Errors that can occur when using this SDK

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification attached to every non-success outcome.
///
/// The set is closed on purpose: the login orchestrator makes retry/abort
/// decisions purely on this kind, never on raw response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required credential material missing or unparseable before any network
    /// call was attempted.
    Configuration,
    /// A field failed format validation before any network call was attempted.
    Validation,
    /// The provider rejected credentials, TOTP code, PIN or OAuth client
    /// details. Resubmitting the same material cannot succeed.
    Authentication,
    /// Connectivity, DNS or timeout failure. Retryable up to the ceiling.
    Network,
    /// The provider signaled throttling. Retryable up to the ceiling.
    RateLimited,
    /// A retryable failure kept occurring past the configured retry ceiling.
    ExhaustedRetries,
    /// The caller-provided deadline expired before the run finished.
    Cancelled,
    /// A response shape not recognized by the classifier. Treated as terminal:
    /// an unknown response is never assumed to be a success.
    Unclassified,
}

impl ErrorKind {
    /// Returns `true` if a step failing with this kind may be re-attempted.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited)
    }

    /// Stable lowercase label, matching the serialized representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::ExhaustedRetries => "exhausted_retries",
            Self::Cancelled => "cancelled",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A required configuration value is missing or unreadable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment variable (or `.env` entry) was not set.
    #[error("Missing required configuration value `{0}`")]
    Missing(&'static str),
    /// The environment variable was set but is not valid unicode.
    #[error("Configuration value `{0}` is not valid unicode")]
    NotUnicode(&'static str),
    /// A tuning value was set but could not be parsed.
    #[error("Configuration value `{name}` is not a valid {expected}")]
    Unparseable {
        /// Name of the offending variable.
        name: &'static str,
        /// What the value was expected to parse as.
        expected: &'static str,
    },
}

/// A credential field failed format validation.
///
/// Raised at construction time, before any network call is attempted. The
/// offending value is never included in the message.
#[derive(Debug, Error)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    /// The credential field that failed validation.
    pub field: &'static str,
    /// Why the value was rejected. Never contains the value itself.
    pub reason: String,
}

/// Errors from the standalone TOTP generator.
#[derive(Debug, Error)]
pub enum TotpError {
    /// The shared secret is not valid base32.
    #[error("TOTP secret is not valid base32")]
    InvalidSecret,
    /// The system clock reports a time before the unix epoch.
    #[error("System time is before the unix epoch")]
    ClockBeforeEpoch,
}

/// Top-level error for client construction and configuration loading.
///
/// Ordinary step failures during a login run are *not* reported through this
/// type; they surface as data in
/// [`AccessTokenResult`](crate::AccessTokenResult).
#[derive(Debug, Error)]
pub enum UpstoxError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A credential field failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The TOTP secret could not be used.
    #[error(transparent)]
    Totp(#[from] TotpError),
    /// The underlying HTTP client could not be constructed.
    #[error("Failed to construct HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

impl UpstoxError {
    /// Maps this error onto the closed [`ErrorKind`] taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Validation(_) | Self::Totp(TotpError::InvalidSecret) => ErrorKind::Validation,
            Self::Totp(TotpError::ClockBeforeEpoch) => ErrorKind::Unclassified,
            Self::Http(_) => ErrorKind::Network,
        }
    }
}
