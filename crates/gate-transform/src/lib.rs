//! Cross-family protocol translation: request/response bodies and live
//! SSE streams, pivoted through a family-neutral representation rather
//! than one hand-written conversion per ordered pair of wire shapes.

pub mod adapter;
pub mod error;
pub mod id_tracker;
pub mod stream;

pub use adapter::{NeutralMessage, NeutralRequest, translate_request, translate_response};
pub use error::{TransformError, TransformResult};
pub use id_tracker::IdTracker;
pub use stream::StreamTranslator;
