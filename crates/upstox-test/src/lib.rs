//! Test utilities for the upstox-totp crates.

use upstox_totp::{Client, ClientSettings, Credentials};

/// Valid placeholder credential material for tests.
#[must_use]
pub fn test_credentials() -> Credentials {
    Credentials::new(
        "9876543210",
        "correct-horse-battery-staple",
        "1234",
        // The RFC 6238 reference secret.
        "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
        "test-client-id",
        "test-client-secret",
        "https://localhost:3000/callback",
    )
    .expect("test credentials are valid")
}

/// Helper for testing the login flow against wiremock.
///
/// Registers the given mocks and returns a client whose service and API
/// hosts both point at the mock server, with pacing disabled so tests run at
/// full speed.
///
/// Warning: when using `Mock::expect` ensure the returned server is not
/// dropped before the test completes.
pub async fn start_login_mock(mocks: Vec<wiremock::Mock>) -> (wiremock::MockServer, Client) {
    let server = wiremock::MockServer::start().await;

    for mock in mocks {
        server.register(mock).await;
    }

    let client = client_for(&server, ClientSettings::default());
    (server, client)
}

/// Builds a client against an existing mock server with explicit settings.
///
/// The service/api URLs are always overridden to point at the server, and
/// the pacing delay is zeroed unless the caller set one deliberately.
#[must_use]
pub fn client_for(server: &wiremock::MockServer, mut settings: ClientSettings) -> Client {
    settings.service_url = server.uri();
    settings.api_url = server.uri();
    if settings.sleep_time_ms == ClientSettings::default().sleep_time_ms {
        settings.sleep_time_ms = 0;
    }
    Client::new_with_settings(test_credentials(), settings).expect("test client builds")
}
