use bytes::Bytes;
use gate_common::{GatewayError, Platform, PassthroughRule};
use gate_provider_core::{UnavailableDecision, UpstreamFailure, default_decide_unavailable};

/// The response the caller sees when no operator rule matches a given
/// upstream status: account-saturation/failure statuses are translated
/// into the uniform error envelope instead of being relayed as-is.
fn default_mapped_response(status: u16) -> Option<(u16, GatewayError)> {
    match status {
        401 | 403 | 500 | 502 | 503 | 504 => Some((
            502,
            GatewayError::upstream("Upstream service temporarily unavailable"),
        )),
        429 => Some((
            429,
            GatewayError::rate_limit("Upstream service temporarily unavailable"),
        )),
        529 => Some((
            503,
            GatewayError::upstream("Upstream service temporarily unavailable"),
        )),
        _ => None,
    }
}

/// What the caller should see, and whether the account should be marked
/// unavailable, for one observed upstream failure.
#[derive(Debug, Clone)]
pub struct PassthroughOutcome {
    pub status: u16,
    pub body: Bytes,
    pub unavailable: Option<UnavailableDecision>,
    pub skip_monitoring: bool,
}

/// Error Passthrough: operator-configured rules are tried
/// first, in order; the first match wins. Anything left unmatched falls
/// back to `default_mapped_response`'s status-driven classification, which
/// maps account-saturation/failure statuses onto the uniform error
/// envelope; statuses outside that set still relay the upstream's own
/// status/body unchanged.
pub struct PassthroughController {
    rules: Vec<PassthroughRule>,
}

impl PassthroughController {
    pub fn new(rules: Vec<PassthroughRule>) -> Self {
        Self { rules }
    }

    pub fn evaluate(&self, platform: Platform, failure: &UpstreamFailure) -> PassthroughOutcome {
        let (status, body) = match failure {
            UpstreamFailure::Http { status, body, .. } => (*status, body.clone()),
            UpstreamFailure::Transport { message, .. } => (502, Bytes::from(message.clone())),
        };
        let body_str = String::from_utf8_lossy(&body);

        let matched = self
            .rules
            .iter()
            .find(|rule| rule.matches(platform, status, &body_str));

        match matched {
            Some(rule) => PassthroughOutcome {
                status: if rule.passthrough_code {
                    status
                } else {
                    rule.response_code.unwrap_or(status)
                },
                body: if rule.passthrough_body {
                    body
                } else {
                    rule.custom_message
                        .clone()
                        .map(Bytes::from)
                        .unwrap_or_else(|| body.clone())
                },
                unavailable: if rule.skip_monitoring {
                    None
                } else {
                    default_decide_unavailable(failure)
                },
                skip_monitoring: rule.skip_monitoring,
            },
            None => match default_mapped_response(status) {
                Some((mapped_status, mapped_err)) => PassthroughOutcome {
                    status: mapped_status,
                    body: Bytes::from(serde_json::to_vec(&mapped_err.to_json_body()).unwrap_or_default()),
                    unavailable: default_decide_unavailable(failure),
                    skip_monitoring: false,
                },
                None => PassthroughOutcome {
                    status,
                    body,
                    unavailable: default_decide_unavailable(failure),
                    skip_monitoring: false,
                },
            },
        }
    }
}
