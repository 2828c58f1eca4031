//! Wire-level types shared by the request-routing core: the family enum
//! that names which of the four chat/completion shapes a request or
//! response is in, a JSON-document view over request/response bodies, and
//! the SSE frame parser/encoder used by the stream processor.

pub mod family;
pub mod sse;
pub mod wire;

pub use family::Family;
pub use sse::{SseEvent, SseItem, SseParser, encode_event, encode_ping_comment};
pub use wire::{WireRequest, WireResponse};
