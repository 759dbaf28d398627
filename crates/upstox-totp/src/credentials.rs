//! Validated credential material for one Upstox account.

use std::fmt;

use url::Url;

use crate::{error::ValidationError, totp};

/// An opaque secret value with a redacted `Debug` representation.
///
/// Keeps passwords, PINs, seeds and client secrets out of logs and panic
/// messages. The inner value is only reachable through
/// [`SecretString::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the inner secret. Call sites should be the only places the
    /// raw value travels through.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(****)")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Immutable, validated identity and secret material for one client instance.
///
/// Every field is format-checked once at construction; a [`Credentials`]
/// value that exists is safe to hand to the login orchestrator. Values are
/// never mutated afterwards and never shared across client instances.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
    pin_code: SecretString,
    totp_secret: SecretString,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: Url,
}

impl Credentials {
    /// Validates and constructs credential material.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field. The
    /// rejected value itself is never part of the error.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<SecretString>,
        pin_code: impl Into<SecretString>,
        totp_secret: impl Into<SecretString>,
        client_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
        redirect_uri: &str,
    ) -> Result<Self, ValidationError> {
        let username = username.into();
        let password = password.into();
        let pin_code = pin_code.into();
        let totp_secret = totp_secret.into();
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if username.len() != 10 || !username.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError {
                field: "username",
                reason: "must be the 10-digit mobile number registered with Upstox".into(),
            });
        }

        if password.expose().is_empty() {
            return Err(ValidationError {
                field: "password",
                reason: "must not be empty".into(),
            });
        }

        let pin_len = pin_code.expose().len();
        if !(4..=6).contains(&pin_len)
            || !pin_code.expose().chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError {
                field: "pin_code",
                reason: "must be 4 to 6 digits".into(),
            });
        }

        if totp::decode_secret(totp_secret.expose()).is_err() {
            return Err(ValidationError {
                field: "totp_secret",
                reason: "must be valid base32 (no spaces required, padding optional)".into(),
            });
        }

        if client_id.trim().is_empty() {
            return Err(ValidationError {
                field: "client_id",
                reason: "must not be empty".into(),
            });
        }

        if client_secret.expose().is_empty() {
            return Err(ValidationError {
                field: "client_secret",
                reason: "must not be empty".into(),
            });
        }

        let redirect_uri = Url::parse(redirect_uri).map_err(|e| ValidationError {
            field: "redirect_uri",
            reason: format!("must be an absolute URI: {e}"),
        })?;
        if !matches!(redirect_uri.scheme(), "http" | "https") {
            return Err(ValidationError {
                field: "redirect_uri",
                reason: "must use the http or https scheme".into(),
            });
        }

        Ok(Self {
            username,
            password,
            pin_code,
            totp_secret,
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// The registered 10-digit mobile number.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Account password.
    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Trading PIN.
    #[must_use]
    pub fn pin_code(&self) -> &SecretString {
        &self.pin_code
    }

    /// Shared TOTP seed (base32).
    #[must_use]
    pub fn totp_secret(&self) -> &SecretString {
        &self.totp_secret
    }

    /// OAuth API client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth API client secret.
    #[must_use]
    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    /// Registered redirect target for the authorization dialog.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Result<Credentials, ValidationError> {
        Credentials::new(
            "9876543210",
            "hunter2!",
            "123456",
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
            "client-id",
            "client-secret",
            "https://localhost:3000/callback",
        )
    }

    #[test]
    fn accepts_valid_material() {
        let creds = valid().expect("valid credentials");
        assert_eq!(creds.username(), "9876543210");
        assert_eq!(creds.client_id(), "client-id");
    }

    #[test]
    fn rejects_nine_digit_username() {
        let err = Credentials::new(
            "987654321",
            "pw",
            "1234",
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
            "id",
            "secret",
            "https://localhost/cb",
        )
        .expect_err("should fail validation");
        assert_eq!(err.field, "username");
    }

    #[test]
    fn rejects_non_numeric_pin() {
        let err = Credentials::new(
            "9876543210",
            "pw",
            "12ab",
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
            "id",
            "secret",
            "https://localhost/cb",
        )
        .expect_err("should fail validation");
        assert_eq!(err.field, "pin_code");
    }

    #[test]
    fn rejects_bad_totp_secret() {
        let err = Credentials::new(
            "9876543210",
            "pw",
            "1234",
            "!!definitely not base32!!",
            "id",
            "secret",
            "https://localhost/cb",
        )
        .expect_err("should fail validation");
        assert_eq!(err.field, "totp_secret");
    }

    #[test]
    fn rejects_relative_redirect_uri() {
        let err = Credentials::new(
            "9876543210",
            "pw",
            "1234",
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
            "id",
            "secret",
            "/callback",
        )
        .expect_err("should fail validation");
        assert_eq!(err.field, "redirect_uri");
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let creds = valid().expect("valid credentials");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("123456"));
        assert!(!debug.contains("GEZDGNBV"));
        assert!(debug.contains("SecretString(****)"));
    }
}
