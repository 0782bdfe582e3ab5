use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error taxonomy for the relay. Every gateway failure is translated into
/// one of these before it reaches the caller; nothing crosses the handler
/// boundary unhandled.
#[derive(Debug)]
pub enum RelayError {
    /// Upstream credential absent; reported before any network call.
    Configuration(String),
    /// Invalid inbound request (empty messages, bad role, out-of-range field).
    BadRequest(String),
    /// 4xx from upstream, passed through with the upstream status and detail.
    Upstream {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },
    /// Network failure, timeout, or upstream 5xx after bounded retries.
    Unavailable(String),
    /// Stream ended or errored before the terminal marker. Consumed by the
    /// fallback path; only surfaced if the fallback call also fails.
    StreamInterrupted(String),
    /// JSON encode/decode failure on our side.
    Serialization(String),
    Internal(String),
}

impl RelayError {
    /// Error kind string used in the JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Configuration(_) => "configuration_error",
            RelayError::BadRequest(_) => "bad_request",
            RelayError::Upstream { .. } => "upstream_error",
            RelayError::Unavailable(_) => "upstream_unavailable",
            RelayError::StreamInterrupted(_) => "stream_interrupted",
            RelayError::Serialization(_) => "serialization_error",
            RelayError::Internal(_) => "internal_error",
        }
    }

    /// Whether a failed stream open should trigger the single non-streaming
    /// fallback. Caller mistakes and missing credentials are surfaced as-is.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            RelayError::Upstream { .. }
                | RelayError::Unavailable(_)
                | RelayError::StreamInterrupted(_)
        )
    }

    /// HTTP status mirroring the upstream failure class.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => match *status {
                400 => StatusCode::BAD_REQUEST,
                401 => StatusCode::UNAUTHORIZED,
                403 => StatusCode::FORBIDDEN,
                413 => StatusCode::PAYLOAD_TOO_LARGE,
                429 => StatusCode::TOO_MANY_REQUESTS,
                s if s >= 500 => StatusCode::SERVICE_UNAVAILABLE,
                s => StatusCode::from_u16(s).unwrap_or(StatusCode::BAD_GATEWAY),
            },
            RelayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::StreamInterrupted(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        let body = match &self {
            RelayError::Upstream {
                message,
                details: Some(details),
                ..
            } => json!({
                "error": kind,
                "message": message,
                "details": details,
            }),
            other => json!({
                "error": kind,
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Configuration(msg) => write!(f, "AI service not configured: {}", msg),
            RelayError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            RelayError::Upstream {
                status, message, ..
            } => write!(f, "Upstream error (HTTP {}): {}", status, message),
            RelayError::Unavailable(msg) => write!(f, "AI service unavailable: {}", msg),
            RelayError::StreamInterrupted(msg) => write!(f, "Stream interrupted: {}", msg),
            RelayError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            RelayError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<reqwest::Error> for RelayError {
    /// Classify reqwest failures: timeouts and connection errors are
    /// availability problems (retry-eligible at the gateway), the rest are
    /// surfaced by category.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Unavailable("upstream did not respond in time".to_string())
        } else if err.is_connect() {
            RelayError::Unavailable("unable to reach upstream service".to_string())
        } else if err.is_request() {
            RelayError::BadRequest(format!("invalid request: {}", err))
        } else {
            RelayError::Unavailable(format!("HTTP client error: {}", err))
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_mirroring() {
        let cases = [
            (400, StatusCode::BAD_REQUEST),
            (401, StatusCode::UNAUTHORIZED),
            (413, StatusCode::PAYLOAD_TOO_LARGE),
            (429, StatusCode::TOO_MANY_REQUESTS),
            (500, StatusCode::SERVICE_UNAVAILABLE),
            (502, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (upstream, expected) in cases {
            let err = RelayError::Upstream {
                status: upstream,
                message: "x".to_string(),
                details: None,
            };
            assert_eq!(err.status_code(), expected, "upstream {}", upstream);
        }
    }

    #[test]
    fn test_configuration_error_is_service_unavailable() {
        let err = RelayError::Configuration("XAI_API_KEY missing".to_string());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.is_fallback_eligible());
    }

    #[test]
    fn test_fallback_eligibility() {
        assert!(RelayError::Unavailable("down".into()).is_fallback_eligible());
        assert!(RelayError::StreamInterrupted("eof".into()).is_fallback_eligible());
        assert!(!RelayError::BadRequest("empty messages".into()).is_fallback_eligible());
    }
}
