//! The main entry point for interacting with this SDK.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{sync::RwLock, time::Instant};
use uuid::Uuid;

use crate::{
    config::Config,
    credentials::Credentials,
    error::{TotpError, UpstoxError},
    login::{self, AccessTokenResult, StepExecutor},
    session::SessionState,
    totp,
};

/// Basic client behavior settings: the targeted hosts and the tuning knobs of
/// the login flow. Optional and uneditable once the client is initialized.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientSettings {
    /// Base URL of the browser-facing login service.
    pub service_url: String,
    /// Base URL of the public API host used for the token exchange.
    pub api_url: String,
    /// The user agent sent with every request. The login service expects a
    /// browser-like client.
    pub user_agent: String,
    /// Inter-step pacing delay in milliseconds. Paces requests to stay under
    /// the provider's rate limits; applied before every request. No protocol
    /// significance beyond that.
    pub sleep_time_ms: u64,
    /// Maximum attempts per step before a retryable failure is reclassified
    /// as exhausted.
    pub max_retries: u32,
    /// Timeout for each individual network call, in milliseconds. Distinct
    /// from the pacing delay.
    pub request_timeout_ms: u64,
    /// Optional overall deadline for one login run, in milliseconds. Checked
    /// before each network call and each pacing sleep.
    pub deadline_ms: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            service_url: "https://service.upstox.com".into(),
            api_url: "https://api.upstox.com".into(),
            user_agent: concat!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            )
            .into(),
            sleep_time_ms: 1000,
            max_retries: 3,
            request_timeout_ms: 10_000,
            deadline_ms: None,
        }
    }
}

impl ClientSettings {
    pub(crate) fn sleep_time(&self) -> Duration {
        Duration::from_millis(self.sleep_time_ms)
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub(crate) fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// The main struct to interact with the SDK.
///
/// Holds exactly one account's credential material and one session. Cloning
/// returns an owned reference to the same instance; consumers needing
/// concurrent login attempts should construct one client per attempt instead
/// of sharing a clone.
#[derive(Debug, Clone)]
pub struct Client {
    internal: Arc<InternalClient>,
}

#[derive(Debug)]
struct InternalClient {
    credentials: Credentials,
    settings: ClientSettings,
    http: reqwest::Client,
    session: RwLock<SessionState>,
}

impl Client {
    /// Creates a client with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`UpstoxError::Http`] if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self, UpstoxError> {
        Self::new_with_settings(credentials, ClientSettings::default())
    }

    /// Creates a client with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`UpstoxError::Http`] if the HTTP client cannot be built.
    pub fn new_with_settings(
        credentials: Credentials,
        settings: ClientSettings,
    ) -> Result<Self, UpstoxError> {
        let http = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            internal: Arc::new(InternalClient {
                credentials,
                settings,
                http,
                session: RwLock::new(SessionState::new()),
            }),
        })
    }

    /// Creates a client from the environment (including a `.env` file).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a required variable is missing, or a
    /// validation error if a value is malformed, in both cases before any
    /// network call is attempted.
    pub fn from_env() -> Result<Self, UpstoxError> {
        let config = Config::from_env()?;
        Self::new_with_settings(config.credentials, config.settings)
    }

    /// Runs the full login flow and returns the outcome.
    ///
    /// This is the single entry point of the SDK. Each invocation starts a
    /// fresh attempt at the beginning of the step sequence with a fresh
    /// correlation identifier; there is no cross-attempt resumption because
    /// the provider's intermediate tokens are single-use and time-bound.
    /// Ordinary step failures are reported inside the returned
    /// [`AccessTokenResult`], never as an `Err`.
    pub async fn get_access_token(&self) -> AccessTokenResult {
        let mut session = self.internal.session.write().await;
        session.reset();

        let deadline = self
            .internal
            .settings
            .deadline()
            .map(|d| Instant::now() + d);

        let mut executor = StepExecutor::new(
            &self.internal.http,
            &self.internal.settings,
            &self.internal.credentials,
            &mut session,
            deadline,
        );
        login::run(&mut executor).await
    }

    /// Returns the TOTP code for the current 30-second window.
    ///
    /// Useful for diagnostics: compare against a reference authenticator app
    /// to confirm the configured seed is the right one.
    ///
    /// # Errors
    ///
    /// Returns [`TotpError::InvalidSecret`] if the configured seed is not
    /// valid base32.
    pub fn totp_now(&self) -> Result<String, TotpError> {
        totp::generate(self.internal.credentials.totp_secret().expose())
    }

    /// Discards all session state and assigns a fresh correlation identifier.
    ///
    /// Any partial progress from a prior attempt (cookies, intermediate
    /// tokens, an unexchanged authorization code) becomes unusable.
    pub async fn reset_session(&self) {
        self.internal.session.write().await.reset();
    }

    /// The correlation identifier of the current session, for request
    /// tracing.
    pub async fn request_id(&self) -> Uuid {
        self.internal.session.read().await.request_id()
    }

    /// The settings this client was built with.
    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.internal.settings
    }
}
