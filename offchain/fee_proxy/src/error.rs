use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Everything that can go wrong serving one fee-rate request.
/// None of these are retried here; the caller decides.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("missing OKX credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("invalid proxy configuration: {0}")]
    InvalidConfig(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("upstream returned HTTP {status}")]
    UpstreamHttp { status: u16, body: String },

    #[error("upstream API error")]
    UpstreamApi { data: Value },

    #[error("cannot parse maker/taker from upstream response")]
    UpstreamParse { raw: Value },

    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("upstream request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProxyError::UpstreamTimeout
        } else {
            ProxyError::Transport(e.to_string())
        }
    }
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamHttp { .. } | ProxyError::UpstreamApi { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            ProxyError::MissingCredentials(missing) => {
                json!({"error": "Missing OKX API env variables", "missing": missing})
            }
            ProxyError::UpstreamHttp { status, body } => {
                json!({"error": "OKX HTTP error", "status": status, "body": body})
            }
            ProxyError::UpstreamApi { data } => json!({"error": "OKX API error", "data": data}),
            ProxyError::UpstreamParse { raw } => json!({"error": "Cannot parse maker/taker", "raw": raw}),
            ProxyError::UpstreamTimeout => json!({"error": "OKX request timed out"}),
            ProxyError::InvalidConfig(detail) | ProxyError::Signing(detail) | ProxyError::Transport(detail) => {
                json!({"error": "Proxy error", "detail": detail})
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_failure_kind() {
        assert_eq!(ProxyError::MissingCredentials(vec!["OKX_API_KEY"]).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ProxyError::UpstreamHttp { status: 401, body: String::new() }.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::UpstreamApi { data: json!({}) }.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::UpstreamParse { raw: json!({}) }.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ProxyError::UpstreamTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_bodies_carry_diagnostics() {
        let e = ProxyError::UpstreamHttp { status: 503, body: "busy".into() };
        assert_eq!(e.body(), json!({"error": "OKX HTTP error", "status": 503, "body": "busy"}));
        let e = ProxyError::UpstreamParse { raw: json!({"maker": "x"}) };
        assert_eq!(e.body()["raw"]["maker"], "x");
    }
}
