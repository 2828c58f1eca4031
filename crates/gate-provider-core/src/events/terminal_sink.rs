use std::future::Future;
use std::pin::Pin;

use super::{Event, EventSink};

/// Default `EventSink`: renders each event as one structured `tracing`
/// line, matching the `event = "..."` convention the rest of the request
/// path logs with.
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for TracingEventSink {
    fn write<'a>(&'a self, event: &'a Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            match event {
                Event::Downstream(ev) => tracing::info!(
                    event = "downstream_recorded",
                    trace_id = ev.trace_id.as_deref(),
                    status = ev.response_status,
                    is_stream = ev.is_stream,
                    elapsed_ms = ev.elapsed_ms,
                ),
                Event::Upstream(ev) => tracing::info!(
                    event = "upstream_recorded",
                    trace_id = ev.trace_id.as_deref(),
                    platform = %ev.platform,
                    attempt_no = ev.attempt_no,
                    status = ev.response_status,
                    error_kind = ev.error_kind.as_deref(),
                ),
                Event::Operational(op) => tracing::info!(event = "operational", op = ?op),
            }
        })
    }
}
