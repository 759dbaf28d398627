//! Time-based one-time password generation (RFC 6238).
//!
//! Exposed standalone so the generated code can be compared against a
//! reference authenticator app when debugging a failing login.

use std::time::{SystemTime, UNIX_EPOCH};

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::TotpError;

/// Number of digits in a generated code.
const DIGITS: u32 = 6;
/// Length of one time window, in seconds.
const PERIOD: u64 = 30;

/// Generates the 6-digit code for the current 30-second window.
///
/// Pure given the secret and the clock; nothing is cached across windows.
///
/// # Errors
///
/// Returns [`TotpError::InvalidSecret`] if the secret is not valid base32.
pub fn generate(secret: &str) -> Result<String, TotpError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TotpError::ClockBeforeEpoch)?;
    generate_at(secret, now.as_secs())
}

/// Generates the 6-digit code for the window containing `unix_time`.
///
/// # Errors
///
/// Returns [`TotpError::InvalidSecret`] if the secret is not valid base32.
pub fn generate_at(secret: &str, unix_time: u64) -> Result<String, TotpError> {
    let key = decode_secret(secret)?;
    let counter = unix_time / PERIOD;
    let code = hotp(&key, counter);
    Ok(format!("{code:0width$}", width = DIGITS as usize))
}

/// Decodes a base32 shared secret.
///
/// Accepts the formats authenticator apps commonly hand out: lowercase,
/// embedded spaces and trailing `=` padding are all tolerated.
pub(crate) fn decode_secret(secret: &str) -> Result<Vec<u8>, TotpError> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let normalized = normalized.trim_end_matches('=');

    if normalized.is_empty() {
        return Err(TotpError::InvalidSecret);
    }

    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|_| TotpError::InvalidSecret)
}

/// HMAC-based one-time password with dynamic truncation (RFC 4226 §5.3).
fn hotp(key: &[u8], counter: u64) -> u32 {
    let mut mac = Hmac::<Sha1>::new_from_slice(key)
        .expect("HMAC accepts keys of any length");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    binary % 10u32.pow(DIGITS)
}
