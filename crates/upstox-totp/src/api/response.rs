use serde::{Deserialize, Serialize};

/// Service-host response envelope.
///
/// A 2xx status does not imply success: the envelope's own `status` field is
/// authoritative, and recognized failure payloads arrive inside `errors`.
#[derive(Deserialize, Debug)]
pub(crate) struct ServiceResponse<T> {
    #[serde(default)]
    pub status: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<ServiceError>,
}

impl<T> ServiceResponse<T> {
    /// Whether the envelope itself reports success.
    pub(crate) fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success") && self.errors.is_empty()
    }
}

/// One entry of the service-host `errors` array.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServiceError {
    /// Renders `code: message` for human-readable failure details.
    pub(crate) fn detail(&self) -> String {
        match (&self.error_code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(code), None) => code.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "unspecified provider error".to_string(),
        }
    }
}

/// Step 1 success payload.
#[derive(Deserialize, Debug)]
pub(crate) struct OtpGenerateData {
    #[serde(rename = "validateOTPToken")]
    pub validate_otp_token: String,
}

/// Step 2 success payload.
#[derive(Deserialize, Debug)]
pub(crate) struct TotpVerifyData {
    #[serde(rename = "twoFAToken")]
    pub two_fa_token: String,
}

/// Step 3 success payload. The interesting outcome of PIN verification is the
/// authenticated session cookie, not the body.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PinVerifyData {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Step 4 success payload.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorizeData {
    pub authorization_code: String,
}

/// Final access-token payload returned by the API host token endpoint.
///
/// Mirrors the provider's published token response: the token itself plus the
/// user profile and entitlement lists tied to it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    /// The time-limited API access token.
    pub access_token: String,
    /// Email address registered with the account.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name of the account holder.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Provider-assigned user identifier.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Account category, e.g. `individual`.
    #[serde(default)]
    pub user_type: Option<String>,
    /// Broker identifier.
    #[serde(default)]
    pub broker: Option<String>,
    /// Product entitlements enabled for the account.
    #[serde(default)]
    pub products: Vec<String>,
    /// Exchange entitlements enabled for the account.
    #[serde(default)]
    pub exchanges: Vec<String>,
    /// Order types enabled for the account.
    #[serde(default)]
    pub order_types: Vec<String>,
    /// Whether the account is active.
    #[serde(default)]
    pub is_active: bool,
}
