use bytes::Bytes;
use tokio::sync::mpsc::Receiver;

use crate::headers::Headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// A fully-resolved HTTP call ready to leave this process for an upstream
/// platform: absolute URL, already-translated body, and the streaming hint
/// the Forwarder needs to decide whether to buffer or pipe the response.
#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub is_stream: bool,
}

pub enum UpstreamBody {
    Bytes(Bytes),
    Stream(Receiver<Bytes>),
}

impl std::fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamBody::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            UpstreamBody::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

#[derive(Debug)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: UpstreamBody,
}
