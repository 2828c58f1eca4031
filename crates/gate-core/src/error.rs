use bytes::Bytes;
use gate_common::GatewayError;
use http::StatusCode;

/// The HTTP-shaped form of an error ready to leave the pipeline: a status
/// code plus a JSON (or, mid-stream, SSE) body already rendered. Every
/// constructor routes through `GatewayError` so the body is always the
/// uniform `{"error": {"type": ..., "message": ...}}` envelope, never a
/// raw string.
#[derive(Debug)]
pub struct ProxyError {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ProxyError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_gateway_error(&GatewayError::invalid_request(message).with_status(400))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_gateway_error(&GatewayError::invalid_request(message).with_status(404))
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::from_gateway_error(&GatewayError::invalid_request(message).with_status(405))
    }

    pub fn from_gateway_error(err: &GatewayError) -> Self {
        let status =
            StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_vec(&err.to_json_body()).unwrap_or_default();
        Self {
            status,
            body: Bytes::from(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_common::GatewayError;

    #[test]
    fn gateway_error_maps_its_own_status() {
        let err = GatewayError::rate_limit("too fast").with_status(429);
        let proxy_err = ProxyError::from_gateway_error(&err);
        assert_eq!(proxy_err.status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn bad_request_carries_a_json_envelope_not_a_raw_string() {
        let err = ProxyError::bad_request("model is required");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&err.body).unwrap();
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["message"], "model is required");
    }

    #[test]
    fn not_found_and_method_not_allowed_also_use_the_envelope() {
        let nf = ProxyError::not_found("unknown group");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        let nf_body: serde_json::Value = serde_json::from_slice(&nf.body).unwrap();
        assert_eq!(nf_body["error"]["type"], "invalid_request_error");

        let mna = ProxyError::method_not_allowed("only POST is accepted on this path");
        assert_eq!(mna.status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
