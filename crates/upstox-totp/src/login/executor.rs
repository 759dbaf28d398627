//! Executes exactly one HTTP exchange per login step.
//!
//! The executor owns everything that surrounds one request: inter-step
//! pacing, the cancellation deadline, attaching session cookies and the
//! correlation id, merging server-set cookies back into the session, and
//! classifying the response. The orchestrator decides *which* step runs and
//! whether to retry; the executor never loops.

use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::debug;

use super::{classify, LoginStep, LoginStepResult};
use crate::{
    api::{
        AuthorizeData, AuthorizeRequest, OtpGenerateData, OtpGenerateRequest, PinVerifyData,
        PinVerifyRequest, ServiceRequest, ServiceResponse, TokenData, TokenExchangeRequest,
        TotpVerifyData, TotpVerifyRequest,
    },
    client::ClientSettings,
    credentials::Credentials,
    error::ErrorKind,
    session::SessionState,
    totp,
};

/// Outcome a successful step reports to the orchestrator.
///
/// Intermediate tokens are not carried here: each step stores what it
/// produced in the session, and the step that needs it reads it back. A
/// retried step therefore re-sends exactly the material the last successful
/// step stored, since failures never overwrite it.
#[derive(Debug)]
pub(crate) enum StepOutput {
    Advanced,
    Token(Box<TokenData>),
}

pub(crate) struct StepExecutor<'a> {
    http: &'a reqwest::Client,
    settings: &'a ClientSettings,
    credentials: &'a Credentials,
    session: &'a mut SessionState,
    deadline: Option<Instant>,
}

impl<'a> StepExecutor<'a> {
    pub(crate) fn new(
        http: &'a reqwest::Client,
        settings: &'a ClientSettings,
        credentials: &'a Credentials,
        session: &'a mut SessionState,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            http,
            settings,
            credentials,
            session,
            deadline,
        }
    }

    pub(crate) fn max_attempts(&self) -> u32 {
        self.settings.max_retries.max(1)
    }

    /// Discards all session state, e.g. after a cancelled run.
    pub(crate) fn reset_session(&mut self) {
        self.session.reset();
    }

    /// Executes one step: paces, sends, merges session state, classifies.
    pub(crate) async fn execute(&mut self, step: LoginStep) -> LoginStepResult<StepOutput> {
        if let Err(cancelled) = self.pace(step).await {
            return cancelled;
        }

        match step {
            LoginStep::SubmitCredentials => {
                let body = ServiceRequest::new(OtpGenerateRequest {
                    mobile_number: self.credentials.username(),
                    password: self.credentials.password().expose(),
                });
                self.post_service::<OtpGenerateData, _>(
                    step,
                    "/login/open/v1/auth/1fa/otp/generate",
                    &body,
                )
                .await
                .map(|data| {
                    self.session.validate_otp_token = Some(data.validate_otp_token);
                    StepOutput::Advanced
                })
            }
            LoginStep::VerifyTotp => {
                let validate_otp_token = match self.session.validate_otp_token.clone() {
                    Some(token) => token,
                    None => return missing_token(step),
                };
                // The code is generated at the moment of this step, on every
                // attempt, so a retry never re-sends a stale window's code.
                let otp = match totp::generate(self.credentials.totp_secret().expose()) {
                    Ok(otp) => otp,
                    Err(e) => {
                        return LoginStepResult::TerminalFailure {
                            kind: ErrorKind::Validation,
                            detail: e.to_string(),
                        }
                    }
                };
                let body = ServiceRequest::new(TotpVerifyRequest {
                    otp: &otp,
                    validate_otp_token: &validate_otp_token,
                });
                self.post_service::<TotpVerifyData, _>(
                    step,
                    "/login/open/v1/auth/2fa/otp/verify",
                    &body,
                )
                .await
                .map(|data| {
                    self.session.two_fa_token = Some(data.two_fa_token);
                    StepOutput::Advanced
                })
            }
            LoginStep::VerifyPin => {
                let two_fa_token = match self.session.two_fa_token.clone() {
                    Some(token) => token,
                    None => return missing_token(step),
                };
                let body = ServiceRequest::new(PinVerifyRequest {
                    pin: self.credentials.pin_code().expose(),
                    two_fa_token: &two_fa_token,
                });
                self.post_service::<PinVerifyData, _>(
                    step,
                    "/login/open/v2/auth/2fa/pin/verify",
                    &body,
                )
                .await
                .map(|_| StepOutput::Advanced)
            }
            LoginStep::Authorize => {
                let body = ServiceRequest::new(AuthorizeRequest {
                    client_id: self.credentials.client_id(),
                    redirect_uri: self.credentials.redirect_uri().as_str(),
                    response_type: "code",
                });
                self.post_service::<AuthorizeData, _>(
                    step,
                    "/login/v2/authorization/dialog",
                    &body,
                )
                .await
                .map(|data| {
                    self.session.authorization_code = Some(data.authorization_code);
                    StepOutput::Advanced
                })
            }
            LoginStep::ExchangeCode => {
                let code = match self.session.authorization_code.clone() {
                    Some(code) => code,
                    None => return missing_token(step),
                };
                self.exchange_code(step, &code)
                    .await
                    .map(|token| StepOutput::Token(Box::new(token)))
            }
        }
    }

    /// Applies the inter-step delay, honoring the cancellation deadline both
    /// before and after the sleep.
    async fn pace<T>(&mut self, step: LoginStep) -> Result<(), LoginStepResult<T>> {
        self.check_deadline(step)?;
        let delay = self.settings.sleep_time();
        if !delay.is_zero() {
            debug!(step = %step, delay_ms = delay.as_millis() as u64, "pacing before request");
            tokio::time::sleep(delay).await;
        }
        self.check_deadline(step)
    }

    fn check_deadline<T>(&self, step: LoginStep) -> Result<(), LoginStepResult<T>> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(LoginStepResult::TerminalFailure {
                    kind: ErrorKind::Cancelled,
                    detail: format!("deadline expired before step `{step}`"),
                })
            }
            _ => Ok(()),
        }
    }

    /// POSTs a JSON body to the browser-facing service host and decodes the
    /// envelope. Session cookies from the response are merged in regardless
    /// of the outcome, so a retried step sees partial session progress.
    async fn post_service<T: DeserializeOwned, B: serde::Serialize>(
        &mut self,
        step: LoginStep,
        path: &str,
        body: &ServiceRequest<B>,
    ) -> LoginStepResult<T> {
        let url = format!("{}{path}", self.settings.service_url.trim_end_matches('/'));
        debug!(step = %step, request_id = %self.session.request_id(), "sending login step request");

        let mut request = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("x-request-id", self.session.request_id().to_string())
            .json(body);
        if let Some(cookies) = self.session.cookie_header() {
            request = request.header(reqwest::header::COOKIE, cookies);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return classify::classify_transport(&e).into(),
        };

        self.session.merge_cookies(response.headers());

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return classify::classify_transport(&e).into(),
        };

        if !status.is_success() {
            return classify::classify_http(status, &text).into();
        }

        let envelope: ServiceResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                return LoginStepResult::TerminalFailure {
                    kind: ErrorKind::Unclassified,
                    detail: format!("malformed response body: {e}"),
                }
            }
        };

        if !envelope.is_success() {
            return classify::classify_envelope(&envelope.errors).into();
        }

        match envelope.data {
            Some(data) => LoginStepResult::Advance(data),
            None => LoginStepResult::TerminalFailure {
                kind: ErrorKind::Unclassified,
                detail: "success envelope without a data payload".to_string(),
            },
        }
    }

    /// POSTs the form-encoded code exchange to the API host. The token
    /// endpoint answers with a bare payload, not the service envelope.
    async fn exchange_code(&mut self, step: LoginStep, code: &str) -> LoginStepResult<TokenData> {
        let url = format!(
            "{}/v2/login/authorization/token",
            self.settings.api_url.trim_end_matches('/')
        );
        debug!(step = %step, request_id = %self.session.request_id(), "sending token exchange request");

        let body = TokenExchangeRequest {
            code,
            client_id: self.credentials.client_id(),
            client_secret: self.credentials.client_secret().expose(),
            redirect_uri: self.credentials.redirect_uri().as_str(),
            grant_type: "authorization_code",
        };

        let response = match self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("x-request-id", self.session.request_id().to_string())
            .form(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify::classify_transport(&e).into(),
        };

        self.session.merge_cookies(response.headers());

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return classify::classify_transport(&e).into(),
        };

        if !status.is_success() {
            return classify::classify_http(status, &text).into();
        }

        match serde_json::from_str::<TokenData>(&text) {
            Ok(token) => LoginStepResult::Advance(token),
            Err(e) => LoginStepResult::TerminalFailure {
                kind: ErrorKind::Unclassified,
                detail: format!("malformed token response: {e}"),
            },
        }
    }
}

/// A required intermediate token is absent from the session, meaning the
/// sequence was not run in order. Unreachable through the orchestrator.
fn missing_token<T>(step: LoginStep) -> LoginStepResult<T> {
    LoginStepResult::TerminalFailure {
        kind: ErrorKind::Unclassified,
        detail: format!("no intermediate token in the session for step `{step}`"),
    }
}

impl<T> From<classify::Classification> for LoginStepResult<T> {
    fn from(c: classify::Classification) -> Self {
        if c.kind.is_retryable() {
            Self::RetryableFailure {
                kind: c.kind,
                detail: c.detail,
            }
        } else {
            Self::TerminalFailure {
                kind: c.kind,
                detail: c.detail,
            }
        }
    }
}
