use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::headers::{Headers, header_get};

pub const RATE_LIMIT_FALLBACK_SECS: u64 = 30;
pub const SHORT_COOLDOWN_SECS: u64 = 10;
/// Effectively permanent: an auth-invalid account stays unschedulable until
/// an operator rotates its credential, not until a timer expires.
pub const AUTH_INVALID_YEARS: u64 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamTransportErrorKind {
    Timeout,
    ReadTimeout,
    Connect,
    Dns,
    Tls,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    RateLimit,
    AuthInvalid,
    Upstream5xx,
    Timeout,
    Other,
}

/// A failed upstream call, before the Failover Controller has decided
/// whether it is worth retrying on another account.
#[derive(Debug, Clone)]
pub enum UpstreamFailure {
    Transport {
        kind: UpstreamTransportErrorKind,
        message: String,
    },
    Http {
        status: u16,
        headers: Headers,
        body: bytes::Bytes,
    },
}

/// How long, and why, an account should be taken out of the selection pool
/// after a given failure.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableDecision {
    pub duration: Duration,
    pub reason: UnavailableReason,
}

/// The status-code-driven default classification consulted whenever no
/// operator `PassthroughRule` matches first. 404 is treated
/// as "this account doesn't serve this route" rather than a hard failure,
/// so it neither disables the account nor counts as a terminal error —
/// callers should keep trying the next candidate without marking anything
/// unavailable for it.
pub fn default_decide_unavailable(failure: &UpstreamFailure) -> Option<UnavailableDecision> {
    match failure {
        UpstreamFailure::Http {
            status, headers, ..
        } => match *status {
            404 => None,
            429 => {
                let retry_after = parse_retry_after(headers).unwrap_or(RATE_LIMIT_FALLBACK_SECS);
                Some(UnavailableDecision {
                    duration: Duration::from_secs(retry_after),
                    reason: UnavailableReason::RateLimit,
                })
            }
            401 | 403 => Some(UnavailableDecision {
                duration: auth_invalid_duration(),
                reason: UnavailableReason::AuthInvalid,
            }),
            500..=599 => Some(UnavailableDecision {
                duration: Duration::from_secs(SHORT_COOLDOWN_SECS),
                reason: UnavailableReason::Upstream5xx,
            }),
            _ => None,
        },
        UpstreamFailure::Transport { kind, .. } => match kind {
            UpstreamTransportErrorKind::Timeout
            | UpstreamTransportErrorKind::ReadTimeout
            | UpstreamTransportErrorKind::Connect
            | UpstreamTransportErrorKind::Dns
            | UpstreamTransportErrorKind::Tls => Some(UnavailableDecision {
                duration: Duration::from_secs(SHORT_COOLDOWN_SECS),
                reason: UnavailableReason::Timeout,
            }),
            UpstreamTransportErrorKind::Other => None,
        },
    }
}

pub fn parse_retry_after(headers: &Headers) -> Option<u64> {
    header_get(headers, "retry-after")?.trim().parse().ok()
}

pub fn auth_invalid_duration() -> Duration {
    Duration::from_secs(AUTH_INVALID_YEARS * 365 * 24 * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_not_terminal_for_the_account() {
        let failure = UpstreamFailure::Http {
            status: 404,
            headers: Vec::new(),
            body: bytes::Bytes::new(),
        };
        assert!(default_decide_unavailable(&failure).is_none());
    }

    #[test]
    fn rate_limit_uses_retry_after_header_when_present() {
        let failure = UpstreamFailure::Http {
            status: 429,
            headers: vec![("retry-after".to_string(), "12".to_string())],
            body: bytes::Bytes::new(),
        };
        let decision = default_decide_unavailable(&failure).unwrap();
        assert_eq!(decision.duration, Duration::from_secs(12));
        assert_eq!(decision.reason, UnavailableReason::RateLimit);
    }

    #[test]
    fn rate_limit_falls_back_without_retry_after() {
        let failure = UpstreamFailure::Http {
            status: 429,
            headers: Vec::new(),
            body: bytes::Bytes::new(),
        };
        let decision = default_decide_unavailable(&failure).unwrap();
        assert_eq!(decision.duration, Duration::from_secs(RATE_LIMIT_FALLBACK_SECS));
    }

    #[test]
    fn auth_failures_are_effectively_permanent() {
        let failure = UpstreamFailure::Http {
            status: 401,
            headers: Vec::new(),
            body: bytes::Bytes::new(),
        };
        let decision = default_decide_unavailable(&failure).unwrap();
        assert_eq!(decision.reason, UnavailableReason::AuthInvalid);
        assert!(decision.duration > Duration::from_secs(3600 * 24 * 365));
    }

    #[test]
    fn server_errors_get_a_short_cooldown() {
        let failure = UpstreamFailure::Http {
            status: 503,
            headers: Vec::new(),
            body: bytes::Bytes::new(),
        };
        let decision = default_decide_unavailable(&failure).unwrap();
        assert_eq!(decision.duration, Duration::from_secs(SHORT_COOLDOWN_SECS));
        assert_eq!(decision.reason, UnavailableReason::Upstream5xx);
    }

    #[test]
    fn transport_timeouts_map_to_timeout_reason() {
        let failure = UpstreamFailure::Transport {
            kind: UpstreamTransportErrorKind::ReadTimeout,
            message: "idle".to_string(),
        };
        let decision = default_decide_unavailable(&failure).unwrap();
        assert_eq!(decision.reason, UnavailableReason::Timeout);
    }
}
