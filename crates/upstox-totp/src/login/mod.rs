//! The login orchestration state machine.
//!
//! Drives the provider's fixed five-step sequence end to end. Steps advance
//! strictly in order; a retryable failure re-invokes the same step up to the
//! configured ceiling; a terminal failure aborts the run. The machine never
//! throws for ordinary step failures: the outcome is always returned as data
//! in [`AccessTokenResult`].

mod classify;
mod executor;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub(crate) use executor::{StepExecutor, StepOutput};

pub use crate::api::TokenData;
use crate::error::ErrorKind;

/// One discrete HTTP exchange within the fixed login sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginStep {
    /// Submit mobile number and password.
    SubmitCredentials,
    /// Verify a freshly generated TOTP code.
    VerifyTotp,
    /// Verify the trading PIN.
    VerifyPin,
    /// Obtain an authorization code for the OAuth client.
    Authorize,
    /// Exchange the authorization code for the access token.
    ExchangeCode,
}

impl LoginStep {
    /// Stable kebab-case label, matching the serialized representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitCredentials => "submit-credentials",
            Self::VerifyTotp => "verify-totp",
            Self::VerifyPin => "verify-pin",
            Self::Authorize => "authorize",
            Self::ExchangeCode => "exchange-code",
        }
    }
}

impl fmt::Display for LoginStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States of the login machine, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// Nothing submitted yet.
    Init,
    /// Password accepted, OTP validation token issued.
    CredentialsSubmitted,
    /// TOTP accepted, 2FA token issued.
    TotpVerified,
    /// PIN accepted, session authorized for the dialog.
    PinVerified,
    /// Authorization code issued.
    Authorized,
    /// Access token issued. Success terminal state.
    TokenIssued,
    /// Terminal failure state, reachable from any non-terminal state.
    Failed,
}

/// Discriminated outcome of one step invocation. Consumed immediately by the
/// orchestrator, never persisted.
#[derive(Debug)]
pub enum LoginStepResult<T> {
    /// The step succeeded; carries whatever the next step needs.
    Advance(T),
    /// A presumed-transient failure, eligible for re-attempt up to a ceiling.
    RetryableFailure {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Human-readable description. Never contains secret material.
        detail: String,
    },
    /// A failure that retrying with the same inputs cannot fix.
    TerminalFailure {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Human-readable description. Never contains secret material.
        detail: String,
    },
}

impl<T> LoginStepResult<T> {
    /// Maps the `Advance` payload, leaving failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoginStepResult<U> {
        match self {
            Self::Advance(value) => LoginStepResult::Advance(f(value)),
            Self::RetryableFailure { kind, detail } => {
                LoginStepResult::RetryableFailure { kind, detail }
            }
            Self::TerminalFailure { kind, detail } => {
                LoginStepResult::TerminalFailure { kind, detail }
            }
        }
    }
}

/// Failure description attached to an unsuccessful [`AccessTokenResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// The step at which the run ended, when it got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<LoginStep>,
    /// Human-readable description. Never contains secret material.
    pub message: String,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "[{}] {} (step `{step}`)", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Final outcome of one orchestrator run.
///
/// Invariant, enforced by the constructors: `success` is `true` exactly when
/// `data` is present and `error` is absent; never both, never neither.
#[derive(Debug, Serialize)]
pub struct AccessTokenResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<TokenData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetail>,
}

impl AccessTokenResult {
    pub(crate) fn ok(data: TokenData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub(crate) fn err(error: ErrorDetail) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    /// Whether the run produced an access token.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    /// The token payload, present exactly when [`success`](Self::success).
    #[must_use]
    pub fn data(&self) -> Option<&TokenData> {
        self.data.as_ref()
    }

    /// The failure description, present exactly when the run failed.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }

    /// Consumes the result, yielding the token payload on success.
    pub fn into_data(self) -> Result<TokenData, ErrorDetail> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (None, Some(error)) => Err(error),
            // Unreachable by construction; kept total instead of panicking.
            _ => Err(ErrorDetail {
                kind: ErrorKind::Unclassified,
                step: None,
                message: "internal invariant violated: inconsistent result".to_string(),
            }),
        }
    }
}

/// Runs the full state machine to completion.
///
/// Intermediate tokens travel through the executor's session, so the
/// orchestrator only sequences steps and routes failures.
pub(crate) async fn run(exec: &mut StepExecutor<'_>) -> AccessTokenResult {
    let mut state = LoginState::Init;

    let service_steps = [
        (LoginStep::SubmitCredentials, LoginState::CredentialsSubmitted),
        (LoginStep::VerifyTotp, LoginState::TotpVerified),
        (LoginStep::VerifyPin, LoginState::PinVerified),
        (LoginStep::Authorize, LoginState::Authorized),
    ];
    for (step, next) in service_steps {
        match drive(exec, step).await {
            Ok(StepOutput::Advanced) => advance(&mut state, next),
            Ok(StepOutput::Token(_)) => return AccessTokenResult::err(invariant(step)),
            Err(detail) => return fail(exec, &mut state, detail),
        }
    }

    let token = match drive(exec, LoginStep::ExchangeCode).await {
        Ok(StepOutput::Token(token)) => token,
        Ok(StepOutput::Advanced) => {
            return AccessTokenResult::err(invariant(LoginStep::ExchangeCode))
        }
        Err(detail) => return fail(exec, &mut state, detail),
    };
    advance(&mut state, LoginState::TokenIssued);

    info!("login flow complete, access token issued");
    AccessTokenResult::ok(*token)
}

/// Invokes one step, re-attempting retryable failures up to the ceiling.
///
/// Exceeding the ceiling reclassifies the failure as `ExhaustedRetries`,
/// which is terminal.
async fn drive(exec: &mut StepExecutor<'_>, step: LoginStep) -> Result<StepOutput, ErrorDetail> {
    let max_attempts = exec.max_attempts();
    let mut last_failure: Option<(ErrorKind, String)> = None;

    for attempt in 1..=max_attempts {
        info!(step = %step, attempt, "executing login step");
        match exec.execute(step).await {
            LoginStepResult::Advance(output) => {
                info!(step = %step, "step advanced");
                return Ok(output);
            }
            LoginStepResult::RetryableFailure { kind, detail } => {
                warn!(step = %step, attempt, kind = %kind, %detail, "retryable step failure");
                last_failure = Some((kind, detail));
            }
            LoginStepResult::TerminalFailure { kind, detail } => {
                warn!(step = %step, kind = %kind, %detail, "terminal step failure");
                return Err(ErrorDetail {
                    kind,
                    step: Some(step),
                    message: detail,
                });
            }
        }
    }

    let (kind, detail) = last_failure.unwrap_or((
        ErrorKind::Unclassified,
        "no attempt was made".to_string(),
    ));
    Err(ErrorDetail {
        kind: ErrorKind::ExhaustedRetries,
        step: Some(step),
        message: format!(
            "giving up after {max_attempts} attempt(s); last failure ({kind}): {detail}"
        ),
    })
}

fn advance(state: &mut LoginState, next: LoginState) {
    info!(from = ?state, to = ?next, "login state advanced");
    *state = next;
}

fn fail(
    exec: &mut StepExecutor<'_>,
    state: &mut LoginState,
    detail: ErrorDetail,
) -> AccessTokenResult {
    warn!(from = ?state, kind = %detail.kind, "login run failed");
    *state = LoginState::Failed;
    if detail.kind == ErrorKind::Cancelled {
        // A cancelled run leaves no reusable session material behind.
        exec.reset_session();
    }
    AccessTokenResult::err(detail)
}

fn invariant(step: LoginStep) -> ErrorDetail {
    ErrorDetail {
        kind: ErrorKind::Unclassified,
        step: Some(step),
        message: "internal invariant violated: step produced the wrong output kind".to_string(),
    }
}
