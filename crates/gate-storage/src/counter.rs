use async_trait::async_trait;

pub type CounterResult<T> = Result<T, CounterError>;

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// A handle to one acquired concurrency slot. Dropping it without calling
/// `release` still frees the slot on the backing store's own TTL, but the
/// Concurrency Controller always calls `release` explicitly on the
/// request's exit path (including cancellation) so slots don't sit pinned
/// for the full TTL under normal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotToken(pub String);

/// The external, cross-node shared counter store the two-tier Concurrency
/// Controller relies on for atomic "increment if below cap" decisions. A
/// single-process gateway could get away with an `AtomicU32`; this trait
/// exists because the controller's invariant (`active <= cap` at every
/// instant) must hold across a fleet of gateway processes sharing one KV
/// store, not just within one.
///
/// Implementations must make `try_acquire` atomic: a compare-and-increment,
/// not a read-then-write, or two concurrent callers can both observe
/// `active < cap` and both succeed, breaking the invariant. No cross-node
/// global ordering is assumed; this store is the only source of truth for
/// the current count.
#[async_trait]
pub trait SharedCounterStore: Send + Sync {
    /// Atomically increments the counter at `key` if doing so would not
    /// exceed `cap`. Returns `Some(token)` on success, `None` if the
    /// counter is already at `cap`.
    async fn try_acquire(&self, key: &str, cap: u32, ttl_secs: u64) -> CounterResult<Option<SlotToken>>;

    /// Releases a previously acquired slot. Idempotent: releasing a token
    /// that was already released (or that expired via TTL) is a no-op, not
    /// an error, since the controller's cancellation path and its normal
    /// completion path can both race to release the same slot.
    async fn release(&self, key: &str, token: &SlotToken) -> CounterResult<()>;

    /// Current in-flight count at `key`, used by the Account Selector's
    /// load-aware ranking. Best-effort: a caller must not
    /// rely on this being perfectly fresh relative to concurrent
    /// `try_acquire`/`release` calls elsewhere.
    async fn current(&self, key: &str) -> CounterResult<u32>;
}
