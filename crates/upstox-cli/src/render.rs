use clap::ValueEnum;
use upstox_totp::{ErrorDetail, ErrorKind, LoginStep, UpstoxError};

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub(crate) enum Output {
    Plain,
    Json,
    None,
}

pub(crate) enum CommandOutput {
    Plain(String),
    Object(serde_json::Value),
}

pub(crate) type CommandResult = Result<CommandOutput, CliError>;

impl From<&str> for CommandOutput {
    fn from(text: &str) -> Self {
        CommandOutput::Plain(text.to_owned())
    }
}
impl From<String> for CommandOutput {
    fn from(text: String) -> Self {
        CommandOutput::Plain(text)
    }
}

/// A failed command, carrying the failure class for the exit code plus an
/// optional troubleshooting hint. The message never contains secret material.
pub(crate) struct CliError {
    pub kind: ErrorKind,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Maps the failure class to the documented exit code.
    pub(crate) fn exit_code(&self) -> u8 {
        match self.kind {
            ErrorKind::Configuration => 2,
            ErrorKind::Validation => 3,
            ErrorKind::Authentication => 4,
            ErrorKind::Network | ErrorKind::RateLimited | ErrorKind::ExhaustedRetries => 5,
            ErrorKind::Cancelled | ErrorKind::Unclassified => 1,
        }
    }
}

impl From<UpstoxError> for CliError {
    fn from(e: UpstoxError) -> Self {
        let hint = match e.kind() {
            ErrorKind::Configuration => Some(
                "set the named UPSTOX_* variable in the environment or in a .env file".to_string(),
            ),
            ErrorKind::Validation => {
                Some("run `upstox-totp check-config` to review the configured values".to_string())
            }
            _ => None,
        };
        Self {
            kind: e.kind(),
            message: e.to_string(),
            hint,
        }
    }
}

impl From<ErrorDetail> for CliError {
    fn from(detail: ErrorDetail) -> Self {
        Self {
            kind: detail.kind,
            hint: login_hint(&detail),
            message: detail.to_string(),
        }
    }
}

/// Step- and class-specific troubleshooting hints for login failures.
fn login_hint(detail: &ErrorDetail) -> Option<String> {
    let hint = match (detail.kind, detail.step) {
        (ErrorKind::Authentication, Some(LoginStep::SubmitCredentials)) => {
            "the provider rejected the username or password; verify UPSTOX_USERNAME and \
             UPSTOX_PASSWORD"
        }
        (ErrorKind::Authentication, Some(LoginStep::VerifyTotp)) => {
            "the TOTP code was rejected; compare `upstox-totp totp` against your authenticator \
             app to confirm UPSTOX_TOTP_SECRET, and check the system clock"
        }
        (ErrorKind::Authentication, Some(LoginStep::VerifyPin)) => {
            "the trading PIN was rejected; verify UPSTOX_PIN_CODE"
        }
        (ErrorKind::Authentication, Some(LoginStep::Authorize | LoginStep::ExchangeCode)) => {
            "the OAuth client was rejected; verify UPSTOX_CLIENT_ID, UPSTOX_CLIENT_SECRET and \
             that UPSTOX_REDIRECT_URI exactly matches the app's registered redirect URI"
        }
        (ErrorKind::RateLimited, _) => {
            "the provider is rate limiting; increase UPSTOX_SLEEP_TIME and try again later"
        }
        (ErrorKind::Network | ErrorKind::ExhaustedRetries, _) => {
            "check network connectivity and whether the provider is reachable, then retry"
        }
        _ => return None,
    };
    Some(hint.to_string())
}

pub(crate) struct RenderConfig {
    pub output: Output,
    pub quiet: bool,
}

impl RenderConfig {
    /// Prints the outcome and converts it to the process exit code.
    ///
    /// Command output goes to stdout, failures to stderr, so the token can be
    /// captured with a plain shell substitution.
    pub(crate) fn render_result(&self, result: CommandResult) -> u8 {
        match result {
            Err(e) => {
                eprintln!("error: {}", e.message);
                if let Some(hint) = &e.hint {
                    eprintln!("hint: {hint}");
                }
                e.exit_code()
            }
            Ok(_) if self.quiet || self.output == Output::None => 0,
            Ok(CommandOutput::Plain(text)) => {
                println!("{text}");
                0
            }
            Ok(CommandOutput::Object(value)) => {
                match serde_json::to_string_pretty(&value) {
                    Ok(json) => println!("{json}"),
                    // Value serialization is infallible in practice.
                    Err(e) => eprintln!("error: {e}"),
                }
                0
            }
        }
    }
}
