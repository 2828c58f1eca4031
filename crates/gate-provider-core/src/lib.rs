//! Platform-facing boundary shared by every stage that talks to an
//! upstream: the observability event bus, the header bag helpers, and the
//! default failure-classification table the Failover Controller and Error
//! Passthrough stages consult.

pub mod classify;
pub mod errors;
pub mod events;
pub mod headers;
pub mod transport;

pub use classify::{
    AUTH_INVALID_YEARS, RATE_LIMIT_FALLBACK_SECS, SHORT_COOLDOWN_SECS, UnavailableDecision,
    UnavailableReason, UpstreamFailure, UpstreamTransportErrorKind, auth_invalid_duration,
    default_decide_unavailable, parse_retry_after,
};
pub use errors::{ProviderError, ProviderResult};
pub use events::{
    AccountSwitchEvent, DownstreamEvent, Event, EventHub, EventSink, OperationalEvent,
    TracingEventSink, UnavailableEndEvent, UnavailableStartEvent, UpstreamEvent,
};
pub use headers::{Headers, header_get, header_remove, header_set};
pub use transport::{HttpMethod, UpstreamBody, UpstreamHttpRequest, UpstreamHttpResponse};
