use std::sync::Arc;
use std::time::Duration;

use gate_common::{AccountId, UserId};
use gate_storage::{CounterError, SharedCounterStore, SlotToken};

/// How many requests may queue for a slot, and how long each is willing to
/// wait, before giving up and failing over to a different account.
/// Injectable so deployments can tune it without touching the controller;
/// the default scales with the account's own cap so a high-cap account
/// both admits more waiters and gives them more patience than a
/// single-slot one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPlan {
    /// Bound on concurrently-pending requests for this tier; a request
    /// arriving once this many are already waiting is rejected immediately
    /// instead of joining the queue.
    pub max_waiting: u32,
    pub timeout: Duration,
}

pub trait WaitPolicy: Send + Sync {
    fn plan(&self, account_cap: u32) -> WaitPlan;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWaitPolicy;

impl WaitPolicy for DefaultWaitPolicy {
    fn plan(&self, account_cap: u32) -> WaitPlan {
        WaitPlan {
            max_waiting: (account_cap * 2).max(4),
            timeout: Duration::from_secs((account_cap as u64 * 2).max(4)),
        }
    }
}

/// Two held slots: one against the user's own cap, one against the
/// account's. Dropping this without calling `release` leaks both slots
/// until the external store's TTL reclaims them, so every caller must hold
/// it inside a guard that releases on every exit path, including panics.
pub struct ConcurrencySlots {
    user_key: String,
    user_token: SlotToken,
    account_key: String,
    account_token: SlotToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Granted,
    /// The wait bound elapsed before both tiers had room. The caller should
    /// fail over to a different account rather than keep waiting.
    TimedOut,
    /// The wait-counter for this principal was already at `max_waiting`
    /// pending requests; rejected synchronously without ever joining the
    /// poll loop.
    Rejected,
}

#[derive(Debug, thiserror::Error)]
pub enum ConcurrencyError {
    #[error("counter store error: {0}")]
    Store(#[from] CounterError),
}

/// The two-tier fair-share Concurrency Controller: a request
/// may proceed only once it holds a slot under the user's cap *and* a slot
/// under the selected account's cap. Slot bookkeeping is delegated to a
/// `SharedCounterStore` so the same caps hold across every gateway node.
pub struct ConcurrencyController {
    counters: Arc<dyn SharedCounterStore>,
    slot_ttl_secs: u64,
}

impl ConcurrencyController {
    pub fn new(counters: Arc<dyn SharedCounterStore>, slot_ttl_secs: u64) -> Self {
        Self {
            counters,
            slot_ttl_secs,
        }
    }

    fn user_key(user_id: UserId) -> String {
        format!("user:{}", user_id.0)
    }

    fn account_key(account_id: AccountId) -> String {
        format!("account:{}", account_id.0)
    }

    fn wait_key(user_id: UserId) -> String {
        format!("wait:{}", user_id.0)
    }

    /// Attempts both tiers once, releasing the user slot immediately if the
    /// account tier is full so a blocked account never pins down a user
    /// slot another of the user's requests could use.
    async fn try_once(
        &self,
        user_id: UserId,
        user_cap: u32,
        account_id: AccountId,
        account_cap: u32,
    ) -> Result<Option<ConcurrencySlots>, ConcurrencyError> {
        let user_key = Self::user_key(user_id);
        let Some(user_token) = self
            .counters
            .try_acquire(&user_key, user_cap, self.slot_ttl_secs)
            .await?
        else {
            return Ok(None);
        };

        let account_key = Self::account_key(account_id);
        match self
            .counters
            .try_acquire(&account_key, account_cap, self.slot_ttl_secs)
            .await?
        {
            Some(account_token) => Ok(Some(ConcurrencySlots {
                user_key,
                user_token,
                account_key,
                account_token,
            })),
            None => {
                self.counters.release(&user_key, &user_token).await?;
                Ok(None)
            }
        }
    }

    /// Grants a slot immediately if one is free. Otherwise admits the
    /// caller into this principal's wait queue — rejecting synchronously if
    /// `max_waiting` requests are already queued there — and polls both
    /// tiers until a slot opens or `max_wait` elapses, invoking `on_tick`
    /// every `poll_interval` so the caller can forward an SSE keep-alive
    /// comment while the downstream connection is held open waiting for
    /// capacity.
    #[allow(clippy::too_many_arguments)]
    pub async fn acquire(
        &self,
        user_id: UserId,
        user_cap: u32,
        account_id: AccountId,
        account_cap: u32,
        max_waiting: u32,
        max_wait: Duration,
        poll_interval: Duration,
        mut on_tick: impl FnMut(),
    ) -> Result<(AcquireOutcome, Option<ConcurrencySlots>), ConcurrencyError> {
        if let Some(slots) = self
            .try_once(user_id, user_cap, account_id, account_cap)
            .await?
        {
            return Ok((AcquireOutcome::Granted, Some(slots)));
        }

        let wait_key = Self::wait_key(user_id);
        let Some(wait_token) = self
            .counters
            .try_acquire(&wait_key, max_waiting, self.slot_ttl_secs)
            .await?
        else {
            return Ok((AcquireOutcome::Rejected, None));
        };

        let deadline = tokio::time::Instant::now() + max_wait;
        let outcome = loop {
            if let Some(slots) = self
                .try_once(user_id, user_cap, account_id, account_cap)
                .await?
            {
                break (AcquireOutcome::Granted, Some(slots));
            }
            if tokio::time::Instant::now() >= deadline {
                break (AcquireOutcome::TimedOut, None);
            }
            tokio::time::sleep(poll_interval.min(deadline - tokio::time::Instant::now())).await;
            on_tick();
        };
        self.counters.release(&wait_key, &wait_token).await?;
        Ok(outcome)
    }

    pub async fn release(&self, slots: ConcurrencySlots) -> Result<(), ConcurrencyError> {
        self.counters
            .release(&slots.account_key, &slots.account_token)
            .await?;
        self.counters
            .release(&slots.user_key, &slots.user_token)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_storage::MemoryCounterStore;

    #[test]
    fn default_wait_policy_scales_with_account_cap_with_a_floor() {
        let small = DefaultWaitPolicy.plan(1);
        assert_eq!(small.max_waiting, 4);
        assert_eq!(small.timeout, Duration::from_secs(4));
        let large = DefaultWaitPolicy.plan(10);
        assert_eq!(large.max_waiting, 20);
        assert_eq!(large.timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn grants_immediately_when_both_tiers_have_room() {
        let controller = ConcurrencyController::new(Arc::new(MemoryCounterStore::new()), 60);
        let (outcome, slots) = controller
            .acquire(
                UserId::new(),
                4,
                AccountId::new(),
                2,
                4,
                Duration::from_millis(50),
                Duration::from_millis(10),
                || {},
            )
            .await
            .unwrap();
        assert_eq!(outcome, AcquireOutcome::Granted);
        assert!(slots.is_some());
    }

    #[tokio::test]
    async fn account_tier_exhaustion_times_out_without_starving_the_user_tier() {
        let counters = Arc::new(MemoryCounterStore::new());
        let controller = ConcurrencyController::new(counters.clone(), 60);
        let user_id = UserId::new();
        let account_id = AccountId::new();

        // Fill the account's single slot directly.
        let held = counters.try_acquire("account:fill", 1, 60).await.unwrap();
        assert!(held.is_some());
        let account_key = format!("account:{}", account_id.0);
        counters.try_acquire(&account_key, 1, 60).await.unwrap();

        let mut ticks = 0;
        let (outcome, slots) = controller
            .acquire(
                user_id,
                4,
                account_id,
                1,
                4,
                Duration::from_millis(30),
                Duration::from_millis(5),
                || ticks += 1,
            )
            .await
            .unwrap();
        assert_eq!(outcome, AcquireOutcome::TimedOut);
        assert!(slots.is_none());
        assert!(ticks > 0);

        // The user's own tier must show zero usage: each failed attempt
        // released its user slot instead of holding it during the wait.
        assert_eq!(counters.current(&format!("user:{}", user_id.0)).await.unwrap(), 0);
        // The wait-counter slot must also be released once the wait ends.
        assert_eq!(counters.current(&format!("wait:{}", user_id.0)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn wait_queue_rejects_once_the_waiter_cap_is_already_full() {
        let counters = Arc::new(MemoryCounterStore::new());
        let controller = ConcurrencyController::new(counters.clone(), 60);
        let user_id = UserId::new();
        let account_id = AccountId::new();
        let account_key = format!("account:{}", account_id.0);
        counters.try_acquire(&account_key, 1, 60).await.unwrap();

        let (outcome, slots) = controller
            .acquire(
                user_id,
                4,
                account_id,
                1,
                0,
                Duration::from_millis(30),
                Duration::from_millis(5),
                || {},
            )
            .await
            .unwrap();
        assert_eq!(outcome, AcquireOutcome::Rejected);
        assert!(slots.is_none());
    }

    #[tokio::test]
    async fn release_frees_both_tiers() {
        let counters = Arc::new(MemoryCounterStore::new());
        let controller = ConcurrencyController::new(counters.clone(), 60);
        let user_id = UserId::new();
        let account_id = AccountId::new();
        let (_, slots) = controller
            .acquire(
                user_id,
                1,
                account_id,
                1,
                4,
                Duration::from_millis(10),
                Duration::from_millis(5),
                || {},
            )
            .await
            .unwrap();
        controller.release(slots.unwrap()).await.unwrap();
        assert_eq!(counters.current(&format!("user:{}", user_id.0)).await.unwrap(), 0);
        assert_eq!(
            counters.current(&format!("account:{}", account_id.0)).await.unwrap(),
            0
        );
    }
}
