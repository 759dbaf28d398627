//! Maps raw HTTP outcomes onto the closed [`ErrorKind`] taxonomy.
//!
//! Pure, deterministic mapping. Anything the classifier does not recognize
//! becomes [`ErrorKind::Unclassified`], which the orchestrator treats as
//! terminal: an unknown response shape is never assumed to be a success.

use reqwest::StatusCode;

use crate::{api::ServiceError, error::ErrorKind};

/// Outcome of classifying one failure response.
#[derive(Debug)]
pub(crate) struct Classification {
    pub kind: ErrorKind,
    pub detail: String,
}

impl Classification {
    fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Classifies a transport-level failure (no HTTP response was obtained).
pub(crate) fn classify_transport(err: &reqwest::Error) -> Classification {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        Classification::new(ErrorKind::Network, format!("transport failure: {err}"))
    } else {
        Classification::new(ErrorKind::Unclassified, format!("unexpected HTTP client failure: {err}"))
    }
}

/// Classifies a non-2xx HTTP response.
pub(crate) fn classify_http(status: StatusCode, body: &str) -> Classification {
    let detail = body_detail(body);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Classification::new(
            ErrorKind::RateLimited,
            format!("provider throttled the request: {detail}"),
        );
    }

    if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
        return Classification::new(
            ErrorKind::Network,
            format!("server-side failure ({status}): {detail}"),
        );
    }

    if matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) {
        return classify_failure_text(&detail, status);
    }

    Classification::new(
        ErrorKind::Unclassified,
        format!("unrecognized response ({status}): {detail}"),
    )
}

/// Classifies a 2xx response whose envelope reports an error.
pub(crate) fn classify_envelope(errors: &[ServiceError]) -> Classification {
    let detail = errors
        .iter()
        .map(ServiceError::detail)
        .collect::<Vec<_>>()
        .join("; ");
    if detail.is_empty() {
        return Classification::new(
            ErrorKind::Unclassified,
            "provider reported an error without details",
        );
    }
    classify_failure_text(&detail, StatusCode::OK)
}

/// Keyword classification of a provider failure message.
///
/// The provider's error-code list is not publicly documented, so the mapping
/// keys off the message text: throttling markers first, then anything that
/// points at rejected credential material. A 4xx on an auth endpoint whose
/// message matches neither stays `Unclassified` rather than being guessed at.
fn classify_failure_text(detail: &str, status: StatusCode) -> Classification {
    let lowered = detail.to_lowercase();

    const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "too many requests", "throttl"];
    const AUTH_MARKERS: &[&str] = &[
        "password",
        "credential",
        "otp",
        "totp",
        "pin",
        "client id",
        "client_id",
        "invalid_client",
        "invalid_grant",
        "unauthorized_client",
        "redirect",
        "unauthorized",
        "expired",
        "blocked",
    ];

    if RATE_LIMIT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Classification::new(ErrorKind::RateLimited, detail.to_string());
    }
    if AUTH_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Classification::new(ErrorKind::Authentication, detail.to_string());
    }
    Classification::new(
        ErrorKind::Unclassified,
        format!("unrecognized provider failure ({status}): {detail}"),
    )
}

/// Extracts a human-readable detail string from a failure body.
fn body_detail(body: &str) -> String {
    // The service host wraps failures in its envelope; the API host token
    // endpoint may answer with a bare OAuth-style error object instead.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(errors) = value.get("errors").and_then(|e| e.as_array()) {
            let details: Vec<String> = errors
                .iter()
                .filter_map(|e| serde_json::from_value::<ServiceError>(e.clone()).ok())
                .map(|e| e.detail())
                .collect();
            if !details.is_empty() {
                return details.join("; ");
            }
        }
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            let description = value
                .get("error_description")
                .and_then(|d| d.as_str())
                .unwrap_or("");
            return if description.is_empty() {
                error.to_string()
            } else {
                format!("{error}: {description}")
            };
        }
    }

    if body.trim().is_empty() {
        "empty response body".to_string()
    } else {
        // Unparseable bodies are truncated; they can be arbitrarily large.
        body.chars().take(200).collect()
    }
}
