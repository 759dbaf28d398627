use serde::Serialize;

/// Service-host envelope: every browser-emulating request wraps its payload
/// in a `data` object.
#[derive(Serialize, Debug)]
pub(crate) struct ServiceRequest<T> {
    pub data: T,
}

impl<T> ServiceRequest<T> {
    pub(crate) fn new(data: T) -> Self {
        Self { data }
    }
}

/// Step 1: submit mobile number and password to start the 1FA exchange.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OtpGenerateRequest<'a> {
    pub mobile_number: &'a str,
    pub password: &'a str,
}

/// Step 2: verify the freshly generated TOTP code.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TotpVerifyRequest<'a> {
    pub otp: &'a str,
    pub validate_otp_token: &'a str,
}

/// Step 3: verify the trading PIN.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PinVerifyRequest<'a> {
    pub pin: &'a str,
    #[serde(rename = "twoFAToken")]
    pub two_fa_token: &'a str,
}

/// Step 4: request an authorization code for the registered OAuth client.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorizeRequest<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub response_type: &'a str,
}

/// Step 5: exchange the authorization code for an access token.
///
/// Posted to the API host as `application/x-www-form-urlencoded`, matching
/// the public token endpoint contract.
#[derive(Serialize, Debug)]
pub(crate) struct TokenExchangeRequest<'a> {
    pub code: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
    pub grant_type: &'a str,
}
