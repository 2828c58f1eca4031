use serde::Serialize;

/// The five error families surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthenticationError,
    InvalidRequestError,
    RateLimitError,
    UpstreamError,
    ApiError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthenticationError => "authentication_error",
            ErrorKind::InvalidRequestError => "invalid_request_error",
            ErrorKind::RateLimitError => "rate_limit_error",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::ApiError => "api_error",
        }
    }

    /// Default HTTP status used when nothing more specific (an upstream
    /// passthrough code, say) overrides it.
    pub fn default_status(&self) -> u16 {
        match self {
            ErrorKind::AuthenticationError => 401,
            ErrorKind::InvalidRequestError => 400,
            ErrorKind::RateLimitError => 429,
            ErrorKind::UpstreamError => 502,
            ErrorKind::ApiError => 500,
        }
    }
}

/// The gateway's own error type, independent of any concrete upstream
/// response it may be wrapping (see `UpstreamFailoverError` in `model` for
/// that case).
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
    /// Overrides `kind.default_status()` when set, e.g. by a passthrough
    /// rule or a literal upstream status code being relayed.
    pub status: Option<u16>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthenticationError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequestError, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimitError, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamError, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ApiError, message)
    }

    pub fn status(&self) -> u16 {
        self.status.unwrap_or_else(|| self.kind.default_status())
    }

    /// Renders the standard `{"error": {"type": ..., "message": ...}}` body
    /// used by every non-stream error exit.
    pub fn to_json_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "type": self.kind.as_str(),
                "message": self.message,
            }
        })
    }

    /// Renders the same error as an SSE `error` event, for mid-stream
    /// failures where the HTTP status line has already been sent.
    pub fn to_sse_event(&self) -> String {
        let body = self.to_json_body();
        format!("event: error\ndata: {body}\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_matches_taxonomy() {
        assert_eq!(ErrorKind::RateLimitError.default_status(), 429);
        assert_eq!(ErrorKind::AuthenticationError.default_status(), 401);
    }

    #[test]
    fn status_override_wins_over_default() {
        let err = GatewayError::upstream("boom").with_status(503);
        assert_eq!(err.status(), 503);
    }

    #[test]
    fn json_body_has_expected_shape() {
        let err = GatewayError::invalid_request("bad model");
        let body = err.to_json_body();
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["message"], "bad model");
    }

    #[test]
    fn sse_event_is_well_formed() {
        let err = GatewayError::api("oops");
        let event = err.to_sse_event();
        assert!(event.starts_with("event: error\ndata: "));
        assert!(event.ends_with("\n\n"));
    }
}
