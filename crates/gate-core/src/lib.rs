pub mod auth;
pub mod catalog;
pub mod classify;
pub mod concurrency;
pub mod error;
pub mod failover;
pub mod forwarder;
pub mod handler;
pub mod passthrough;
pub mod pipeline;
pub mod selector;
pub mod state;
pub mod usage;

pub use auth::{
    AuthContext, AuthError, AuthKeyEntry, AuthProvider, AuthSnapshot, MemoryAuth, NoopAuth,
    UserEntry,
};
pub use classify::{classify_request, ClassifiedRequest};
pub use concurrency::{
    AcquireOutcome, ConcurrencyController, ConcurrencyError, ConcurrencySlots, DefaultWaitPolicy,
    WaitPlan, WaitPolicy,
};
pub use error::ProxyError;
pub use failover::{FailoverDecision, FailoverState};
pub use forwarder::{UpstreamClient, UpstreamClientConfig, WreqUpstreamClient};
pub use handler::{count_tokens_handler, list_models_handler, proxy_handler};
pub use passthrough::{PassthroughController, PassthroughOutcome};
pub use pipeline::{JsonOutcome, ProxyEngine, ProxyOutcome, StreamOutcome};
pub use selector::{AccountSelector, Selection, SelectionReason};
pub use state::{AppState, RuntimeSnapshot};
pub use usage::UsageRecorder;
