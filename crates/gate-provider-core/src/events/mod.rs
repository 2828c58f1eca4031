mod hub;
mod terminal_sink;
mod types;

pub use hub::{EventHub, EventSink};
pub use terminal_sink::TracingEventSink;
pub use types::{
    AccountSwitchEvent, DownstreamEvent, Event, OperationalEvent, UnavailableEndEvent,
    UnavailableStartEvent, UpstreamEvent,
};
