use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use gate_common::{Account, AccountId, Platform};
use gate_storage::SharedCounterStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    StickySession,
    LeastLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub account_id: AccountId,
    pub reason: SelectionReason,
}

struct StickyEntry {
    account_id: AccountId,
    expires_at: Instant,
}

/// Binds a session hash to the account it was last routed to, so a
/// multi-turn conversation keeps hitting the same account (and therefore
/// the same provider-side cache/session) as long as that account stays
/// schedulable and the binding hasn't expired.
struct StickyTable {
    entries: Mutex<HashMap<u64, StickyEntry>>,
}

impl StickyTable {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, session_hash: u64) -> Option<AccountId> {
        let mut guard = self.entries.lock().unwrap();
        match guard.get(&session_hash) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.account_id),
            Some(_) => {
                guard.remove(&session_hash);
                None
            }
            None => None,
        }
    }

    fn bind(&self, session_hash: u64, account_id: AccountId, ttl: Duration) {
        self.entries.lock().unwrap().insert(
            session_hash,
            StickyEntry {
                account_id,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn evict(&self, account_id: AccountId) {
        self.entries
            .lock()
            .unwrap()
            .retain(|_, entry| entry.account_id != account_id);
    }
}

/// The Account Selector: picks the least-loaded
/// schedulable account in a group, preferring the sticky binding for the
/// request's session when one exists and still points at a live account.
pub struct AccountSelector {
    sticky: StickyTable,
    sticky_ttl: Duration,
}

impl AccountSelector {
    pub fn new(sticky_ttl: Duration) -> Self {
        Self {
            sticky: StickyTable::new(),
            sticky_ttl,
        }
    }

    /// `candidates` must already be filtered to schedulable, available
    /// accounts (`Account::is_available`) in the caller's group; this
    /// function narrows that set to accounts whose model-mapping table
    /// supports `requested_model` and whose platform matches
    /// `forced_platform` (when set), then ranks what remains.
    pub async fn select(
        &self,
        candidates: &[Account],
        session_hash: Option<u64>,
        counters: &dyn SharedCounterStore,
        exclude: &[AccountId],
        requested_model: &str,
        forced_platform: Option<Platform>,
    ) -> Option<Selection> {
        let eligible: Vec<&Account> = candidates
            .iter()
            .filter(|a| !exclude.contains(&a.id))
            .filter(|a| forced_platform.map(|p| p == a.platform).unwrap_or(true))
            .filter(|a| a.resolve_model(requested_model).is_some())
            .collect();
        if eligible.is_empty() {
            return None;
        }

        if let Some(hash) = session_hash {
            if let Some(sticky_id) = self.sticky.get(hash) {
                if eligible.iter().any(|a| a.id == sticky_id) {
                    return Some(Selection {
                        account_id: sticky_id,
                        reason: SelectionReason::StickySession,
                    });
                }
            }
        }

        let mut best: Option<(AccountId, u32)> = None;
        for account in &eligible {
            let key = format!("account:{}", account.id.0);
            let load = counters.current(&key).await.unwrap_or(0);
            if best.map(|(_, l)| load < l).unwrap_or(true) {
                best = Some((account.id, load));
            }
        }

        let chosen = best.map(|(id, _)| id)?;
        if let Some(hash) = session_hash {
            self.sticky.bind(hash, chosen, self.sticky_ttl);
        }
        Some(Selection {
            account_id: chosen,
            reason: SelectionReason::LeastLoaded,
        })
    }

    /// Called by the Failover Controller when an account just failed, so a
    /// sticky binding doesn't keep routing a session back to it.
    pub fn forget_account(&self, account_id: AccountId) {
        self.sticky.evict(account_id);
    }
}
