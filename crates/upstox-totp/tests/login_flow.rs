//! End-to-end tests for the login state machine against a scripted server.

use serde_json::json;
use upstox_test::{client_for, start_login_mock, test_credentials};
use upstox_totp::{ClientSettings, Credentials, ErrorKind, LoginStep};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

const OTP_GENERATE_PATH: &str = "/login/open/v1/auth/1fa/otp/generate";
const TOTP_VERIFY_PATH: &str = "/login/open/v1/auth/2fa/otp/verify";
const PIN_VERIFY_PATH: &str = "/login/open/v2/auth/2fa/pin/verify";
const AUTHORIZE_PATH: &str = "/login/v2/authorization/dialog";
const TOKEN_PATH: &str = "/v2/login/authorization/token";

fn advance_response(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "status": "success", "data": data }))
}

fn otp_generate_mock() -> Mock {
    Mock::given(matchers::method("POST"))
        .and(matchers::path(OTP_GENERATE_PATH))
        .and(matchers::body_partial_json(
            json!({ "data": { "mobileNumber": "9876543210" } }),
        ))
        .respond_with(
            advance_response(json!({ "validateOTPToken": "otp-token-1" }))
                .insert_header("set-cookie", "sid=session-1; Path=/; HttpOnly"),
        )
}

fn totp_verify_mock() -> Mock {
    Mock::given(matchers::method("POST"))
        .and(matchers::path(TOTP_VERIFY_PATH))
        .and(matchers::body_partial_json(
            json!({ "data": { "validateOtpToken": "otp-token-1" } }),
        ))
        // Cookies set by the first step must be replayed on later steps.
        .and(matchers::header("cookie", "sid=session-1"))
        .respond_with(advance_response(json!({ "twoFAToken": "twofa-1" })))
}

fn pin_verify_mock() -> Mock {
    Mock::given(matchers::method("POST"))
        .and(matchers::path(PIN_VERIFY_PATH))
        .and(matchers::body_partial_json(
            json!({ "data": { "pin": "1234", "twoFAToken": "twofa-1" } }),
        ))
        .respond_with(advance_response(json!({ "userId": "UX0001" })))
}

fn authorize_mock() -> Mock {
    Mock::given(matchers::method("POST"))
        .and(matchers::path(AUTHORIZE_PATH))
        .and(matchers::body_partial_json(
            json!({ "data": { "clientId": "test-client-id", "responseType": "code" } }),
        ))
        .respond_with(advance_response(json!({ "authorizationCode": "auth-code-1" })))
}

fn token_mock() -> Mock {
    Mock::given(matchers::method("POST"))
        .and(matchers::path(TOKEN_PATH))
        .and(matchers::body_string_contains("code=auth-code-1"))
        .and(matchers::body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "daily-token-xyz",
            "email": "trader@example.com",
            "user_name": "Test Trader",
            "user_id": "UX0001",
            "user_type": "individual",
            "broker": "UPSTOX",
            "products": ["D", "I"],
            "exchanges": ["NSE_EQ", "BSE_EQ"],
            "order_types": ["LIMIT", "MARKET"],
            "is_active": true
        })))
}

#[tokio::test]
async fn full_flow_issues_the_access_token() {
    let (_server, client) = start_login_mock(vec![
        otp_generate_mock().expect(1),
        totp_verify_mock().expect(1),
        pin_verify_mock().expect(1),
        authorize_mock().expect(1),
        token_mock().expect(1),
    ])
    .await;

    let result = client.get_access_token().await;

    assert!(result.success());
    assert!(result.error().is_none());
    let token = result.data().expect("token payload");
    assert_eq!(token.access_token, "daily-token-xyz");
    assert_eq!(token.email.as_deref(), Some("trader@example.com"));
    assert_eq!(token.exchanges, vec!["NSE_EQ", "BSE_EQ"]);
    assert!(token.is_active);
}

#[tokio::test]
async fn terminal_failure_at_totp_stops_the_run() {
    let rejection = ResponseTemplate::new(400).set_body_json(json!({
        "status": "error",
        "errors": [{ "errorCode": "UDAPI1011", "message": "Incorrect OTP entered" }]
    }));

    let (_server, client) = start_login_mock(vec![
        otp_generate_mock().expect(1),
        Mock::given(matchers::method("POST"))
            .and(matchers::path(TOTP_VERIFY_PATH))
            .respond_with(rejection)
            .expect(1),
        // No later step may be attempted after a terminal failure.
        Mock::given(matchers::path(PIN_VERIFY_PATH)).respond_with(ResponseTemplate::new(200)).expect(0),
        Mock::given(matchers::path(AUTHORIZE_PATH)).respond_with(ResponseTemplate::new(200)).expect(0),
        Mock::given(matchers::path(TOKEN_PATH)).respond_with(ResponseTemplate::new(200)).expect(0),
    ])
    .await;

    let result = client.get_access_token().await;

    assert!(!result.success());
    assert!(result.data().is_none());
    let error = result.error().expect("error detail");
    assert_eq!(error.kind, ErrorKind::Authentication);
    assert_eq!(error.step, Some(LoginStep::VerifyTotp));
    assert!(error.message.contains("UDAPI1011"));
}

#[tokio::test]
async fn transient_failures_are_retried_until_the_step_succeeds() {
    let server = MockServer::start().await;

    // First two calls fail with a server error, the third succeeds.
    Mock::given(matchers::method("POST"))
        .and(matchers::path(OTP_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    otp_generate_mock().expect(1).mount(&server).await;
    totp_verify_mock().expect(1).mount(&server).await;
    pin_verify_mock().expect(1).mount(&server).await;
    authorize_mock().expect(1).mount(&server).await;
    token_mock().expect(1).mount(&server).await;

    let mut settings = ClientSettings::default();
    settings.max_retries = 3;
    let client = client_for(&server, settings);

    let result = client.get_access_token().await;

    assert!(result.success(), "error: {:?}", result.error());
}

#[tokio::test]
async fn retry_ceiling_reclassifies_as_exhausted_retries() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path(OTP_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(matchers::path(TOTP_VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = ClientSettings::default();
    settings.max_retries = 2;
    let client = client_for(&server, settings);

    let result = client.get_access_token().await;

    assert!(!result.success());
    let error = result.error().expect("error detail");
    assert_eq!(error.kind, ErrorKind::ExhaustedRetries);
    assert_eq!(error.step, Some(LoginStep::SubmitCredentials));
    assert!(error.message.contains("network"));
}

#[tokio::test]
async fn rate_limiting_is_retried() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path(OTP_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    otp_generate_mock().expect(1).mount(&server).await;
    totp_verify_mock().expect(1).mount(&server).await;
    pin_verify_mock().expect(1).mount(&server).await;
    authorize_mock().expect(1).mount(&server).await;
    token_mock().expect(1).mount(&server).await;

    let client = client_for(&server, ClientSettings::default());
    let result = client.get_access_token().await;

    assert!(result.success(), "error: {:?}", result.error());
}

#[tokio::test]
async fn cookies_from_failed_responses_are_replayed_on_the_retry() {
    let server = MockServer::start().await;

    // The failing response still sets a cookie, as a load balancer or WAF
    // would; the session must pick it up even though the step failed.
    Mock::given(matchers::method("POST"))
        .and(matchers::path(OTP_GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(503).insert_header("set-cookie", "trace=retry-1; Path=/"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    // The retry of the same step must present the cookie the failure set.
    Mock::given(matchers::method("POST"))
        .and(matchers::path(OTP_GENERATE_PATH))
        .and(matchers::header("cookie", "trace=retry-1"))
        .respond_with(
            advance_response(json!({ "validateOTPToken": "otp-token-1" }))
                .insert_header("set-cookie", "sid=session-1; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;
    // Later steps see the union of both cookies, sorted by name.
    Mock::given(matchers::method("POST"))
        .and(matchers::path(TOTP_VERIFY_PATH))
        .and(matchers::header("cookie", "sid=session-1; trace=retry-1"))
        .respond_with(advance_response(json!({ "twoFAToken": "twofa-1" })))
        .expect(1)
        .mount(&server)
        .await;
    pin_verify_mock().expect(1).mount(&server).await;
    authorize_mock().expect(1).mount(&server).await;
    token_mock().expect(1).mount(&server).await;

    let client = client_for(&server, ClientSettings::default());
    let result = client.get_access_token().await;

    assert!(result.success(), "error: {:?}", result.error());
}

#[tokio::test]
async fn unrecognized_success_body_fails_closed() {
    let (_server, client) = start_login_mock(vec![
        Mock::given(matchers::method("POST"))
            .and(matchers::path(OTP_GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>totally unexpected</html>"))
            .expect(1),
        Mock::given(matchers::path(TOTP_VERIFY_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0),
    ])
    .await;

    let result = client.get_access_token().await;

    assert!(!result.success());
    assert_eq!(
        result.error().map(|e| e.kind),
        Some(ErrorKind::Unclassified)
    );
}

#[tokio::test]
async fn each_run_restarts_the_sequence_from_the_beginning() {
    let rejection = ResponseTemplate::new(401).set_body_json(json!({
        "status": "error",
        "errors": [{ "errorCode": "UDAPI1012", "message": "Incorrect PIN" }]
    }));

    let server = MockServer::start().await;
    // Both runs must hit step 1: no cross-attempt resumption exists.
    otp_generate_mock().expect(2).mount(&server).await;
    totp_verify_mock().expect(2).mount(&server).await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path(PIN_VERIFY_PATH))
        .respond_with(rejection)
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, ClientSettings::default());

    let first = client.get_access_token().await;
    let id_after_first = client.request_id().await;
    let second = client.get_access_token().await;
    let id_after_second = client.request_id().await;

    assert!(!first.success());
    assert!(!second.success());
    assert_eq!(first.error().map(|e| e.kind), Some(ErrorKind::Authentication));
    // Every attempt runs under its own correlation identifier.
    assert_ne!(id_after_first, id_after_second);
}

#[tokio::test]
async fn expired_deadline_cancels_before_any_network_call() {
    let server = MockServer::start().await;
    Mock::given(matchers::path(OTP_GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = ClientSettings::default();
    settings.deadline_ms = Some(0);
    let client = client_for(&server, settings);

    let result = client.get_access_token().await;

    assert!(!result.success());
    assert_eq!(result.error().map(|e| e.kind), Some(ErrorKind::Cancelled));
}

#[test]
fn invalid_credential_material_never_reaches_the_transport() {
    let err = Credentials::new(
        "987654321", // nine digits
        "pw",
        "1234",
        "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
        "client-id",
        "client-secret",
        "https://localhost/callback",
    )
    .expect_err("nine-digit username must be rejected");
    assert_eq!(err.field, "username");
    // No client can exist for invalid material, so no transport invocation
    // is possible; Client::new is only reachable with validated credentials.
    let _ = test_credentials();
}
