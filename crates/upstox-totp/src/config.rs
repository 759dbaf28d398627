//! Configuration loading from the process environment and `.env` files.

use std::env;

use crate::{
    client::ClientSettings,
    credentials::Credentials,
    error::{ConfigError, UpstoxError},
};

/// Required credential variables.
const ENV_USERNAME: &str = "UPSTOX_USERNAME";
const ENV_PASSWORD: &str = "UPSTOX_PASSWORD";
const ENV_PIN_CODE: &str = "UPSTOX_PIN_CODE";
const ENV_TOTP_SECRET: &str = "UPSTOX_TOTP_SECRET";
const ENV_CLIENT_ID: &str = "UPSTOX_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "UPSTOX_CLIENT_SECRET";
const ENV_REDIRECT_URI: &str = "UPSTOX_REDIRECT_URI";

/// Optional tuning variables.
const ENV_SLEEP_TIME: &str = "UPSTOX_SLEEP_TIME";
const ENV_MAX_RETRIES: &str = "UPSTOX_MAX_RETRIES";

/// Fully validated configuration: credential material plus client tuning.
#[derive(Debug)]
pub struct Config {
    /// Validated credential material.
    pub credentials: Credentials,
    /// Client settings with any environment overrides applied.
    pub settings: ClientSettings,
}

impl Config {
    /// Loads configuration with precedence: process environment over `.env`
    /// file. (Direct construction via [`Credentials::new`] bypasses this
    /// loader entirely and takes precedence over both.)
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first missing or unparseable
    /// variable, or a validation error for malformed credential values,
    /// always before any network call is attempted.
    pub fn from_env() -> Result<Self, UpstoxError> {
        // `dotenvy` never overrides variables already present in the process
        // environment, which is exactly the documented precedence.
        let _ = dotenvy::dotenv();

        let credentials = Credentials::new(
            required(ENV_USERNAME)?,
            required(ENV_PASSWORD)?,
            required(ENV_PIN_CODE)?,
            required(ENV_TOTP_SECRET)?,
            required(ENV_CLIENT_ID)?,
            required(ENV_CLIENT_SECRET)?,
            &required(ENV_REDIRECT_URI)?,
        )?;

        let mut settings = ClientSettings::default();
        if let Some(sleep_time) = optional(ENV_SLEEP_TIME)? {
            settings.sleep_time_ms =
                sleep_time
                    .parse()
                    .map_err(|_| ConfigError::Unparseable {
                        name: ENV_SLEEP_TIME,
                        expected: "number of milliseconds",
                    })?;
        }
        if let Some(max_retries) = optional(ENV_MAX_RETRIES)? {
            settings.max_retries = max_retries
                .parse()
                .map_err(|_| ConfigError::Unparseable {
                    name: ENV_MAX_RETRIES,
                    expected: "number of attempts",
                })?;
        }

        Ok(Self {
            credentials,
            settings,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(ConfigError::Missing(name)),
        Err(env::VarError::NotPresent) => Err(ConfigError::Missing(name)),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
    }
}

fn optional(name: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
        Ok(_) | Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
    }
}
