//! Per-client login session state.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, SET_COOKIE};
use uuid::Uuid;

/// Mutable per-client session state threaded through every step of a login
/// attempt.
///
/// Holds the server-set cookies accumulated across steps, the intermediate
/// tokens each step hands to the next, and an opaque correlation identifier
/// attached to every request of one attempt. One value exists per client
/// instance; it is never shared across instances.
#[derive(Debug)]
pub struct SessionState {
    request_id: Uuid,
    cookies: HashMap<String, String>,
    pub(crate) validate_otp_token: Option<String>,
    pub(crate) two_fa_token: Option<String>,
    pub(crate) authorization_code: Option<String>,
}

impl SessionState {
    /// Creates empty session state with a fresh correlation identifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            cookies: HashMap::new(),
            validate_otp_token: None,
            two_fa_token: None,
            authorization_code: None,
        }
    }

    /// Discards all accumulated cookies and intermediate tokens and assigns a
    /// fresh correlation identifier.
    ///
    /// After a reset nothing from a prior partial attempt is resumable; the
    /// next login run starts the step sequence from the beginning.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The correlation identifier for the current attempt.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Merges `Set-Cookie` response headers into the session, additively.
    ///
    /// Later values for the same cookie name replace earlier ones; cookies
    /// set by step N stay visible to step N+1. Attributes (path, expiry,
    /// flags) are dropped: within a single short-lived login attempt only the
    /// name/value pair matters.
    pub fn merge_cookies(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else { continue };
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    self.cookies.insert(name.to_string(), value.trim().to_string());
                }
            }
        }
    }

    /// Renders the accumulated cookies as a `Cookie` request header value.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<_> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        // Deterministic ordering keeps request logs and tests stable.
        pairs.sort();
        Some(pairs.join("; "))
    }

    /// Number of distinct cookies accumulated so far.
    #[must_use]
    pub fn cookie_count(&self) -> usize {
        self.cookies.len()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers_with_cookies(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(SET_COOKIE, HeaderValue::from_str(cookie).expect("header"));
        }
        headers
    }

    #[test]
    fn reset_rotates_the_request_id_and_clears_state() {
        let mut session = SessionState::new();
        session.merge_cookies(&headers_with_cookies(&["sid=abc; Path=/; HttpOnly"]));
        session.validate_otp_token = Some("token".into());

        let before = session.request_id();
        session.reset();

        assert_ne!(session.request_id(), before);
        assert_eq!(session.cookie_count(), 0);
        assert!(session.cookie_header().is_none());
        assert!(session.validate_otp_token.is_none());
    }

    #[test]
    fn cookies_accumulate_additively_across_merges() {
        let mut session = SessionState::new();
        session.merge_cookies(&headers_with_cookies(&["a=1; Secure"]));
        session.merge_cookies(&headers_with_cookies(&["b=2", "c=3; Path=/login"]));

        assert_eq!(session.cookie_header().as_deref(), Some("a=1; b=2; c=3"));
    }

    #[test]
    fn later_cookie_values_replace_earlier_ones() {
        let mut session = SessionState::new();
        session.merge_cookies(&headers_with_cookies(&["sid=first"]));
        session.merge_cookies(&headers_with_cookies(&["sid=second"]));

        assert_eq!(session.cookie_header().as_deref(), Some("sid=second"));
    }

    #[test]
    fn malformed_set_cookie_values_are_skipped() {
        let mut session = SessionState::new();
        session.merge_cookies(&headers_with_cookies(&["no-equals-sign", "=orphan"]));
        assert_eq!(session.cookie_count(), 0);
    }
}
