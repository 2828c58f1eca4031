use async_trait::async_trait;

use gate_common::{Account, ApiKey, Group, User, UsageEvent};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serde json error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The full set of tenant rows the gateway needs at bootstrap (and on
/// each periodic refresh) to build its in-memory `AppState` snapshot.
/// Runtime request handling never calls back into `Storage` directly —
/// it reads from the `ArcSwap`-held snapshot gate-core builds from this.
#[derive(Debug, Clone, Default)]
pub struct TenantSnapshot {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub accounts: Vec<Account>,
    pub api_keys: Vec<ApiKey>,
}

/// The persistence boundary. Implementations live outside this workspace
/// (a real database, an admin service); this crate only defines the shape
/// the gateway core depends on and ships an in-memory double for tests.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load_snapshot(&self) -> StorageResult<TenantSnapshot>;

    /// Persists one completed request's billing-relevant usage.
    /// The recorder stage treats this as fire-and-forget relative to the
    /// response already sent to the caller.
    async fn record_usage(&self, event: &UsageEvent) -> StorageResult<()>;
}
