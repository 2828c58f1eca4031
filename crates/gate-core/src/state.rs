use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use gate_common::{Account, AccountId, GlobalConfig, Group, GroupId, User, UserId};
use gate_provider_core::EventHub;
use gate_storage::{SharedCounterStore, Storage, TenantSnapshot};

/// Indices built once per `TenantSnapshot` refresh, so every request-path
/// lookup (`account by id`, `accounts in group`, `user by id`) is a hash
/// lookup against data the bootstrap/refresh cycle already paid to fetch —
/// the request path never hits storage directly.
#[derive(Debug, Clone, Default)]
pub struct RuntimeSnapshot {
    pub users_by_id: HashMap<UserId, User>,
    pub groups_by_id: HashMap<GroupId, Group>,
    pub accounts_by_id: HashMap<AccountId, Account>,
    pub accounts_by_group: HashMap<GroupId, Vec<AccountId>>,
}

impl RuntimeSnapshot {
    pub fn from_tenant_snapshot(tenant: TenantSnapshot) -> Self {
        let mut accounts_by_group: HashMap<GroupId, Vec<AccountId>> = HashMap::new();
        for account in &tenant.accounts {
            accounts_by_group
                .entry(account.group_id)
                .or_default()
                .push(account.id);
        }
        Self {
            users_by_id: tenant.users.into_iter().map(|u| (u.id, u)).collect(),
            groups_by_id: tenant.groups.into_iter().map(|g| (g.id, g)).collect(),
            accounts_by_id: tenant.accounts.into_iter().map(|a| (a.id, a)).collect(),
            accounts_by_group,
        }
    }
}

/// Process-wide shared state: the merged config, the tenant-data snapshot,
/// the event bus, and the two external collaborators (shared counters,
/// persistence) every pipeline stage needs a handle to.
pub struct AppState {
    pub global: ArcSwap<GlobalConfig>,
    pub snapshot: ArcSwap<RuntimeSnapshot>,
    pub events: EventHub,
    pub counters: Arc<dyn SharedCounterStore>,
    pub storage: Arc<dyn Storage>,
}

impl AppState {
    pub fn new(
        global: GlobalConfig,
        snapshot: RuntimeSnapshot,
        counters: Arc<dyn SharedCounterStore>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            global: ArcSwap::from_pointee(global),
            snapshot: ArcSwap::from_pointee(snapshot),
            events: EventHub::new(1024),
            counters,
            storage,
        }
    }

    pub async fn bootstrap(
        counters: Arc<dyn SharedCounterStore>,
        storage: Arc<dyn Storage>,
        global: GlobalConfig,
    ) -> Result<Self, gate_storage::StorageError> {
        let tenant = storage.load_snapshot().await?;
        Ok(Self::new(
            global,
            RuntimeSnapshot::from_tenant_snapshot(tenant),
            counters,
            storage,
        ))
    }

    /// Re-pulls tenant data from storage and atomically swaps the snapshot
    /// in; in-flight requests keep using the snapshot `Arc` they already
    /// loaded until they finish.
    pub async fn refresh(&self) -> Result<(), gate_storage::StorageError> {
        let tenant = self.storage.load_snapshot().await?;
        self.snapshot
            .store(Arc::new(RuntimeSnapshot::from_tenant_snapshot(tenant)));
        Ok(())
    }

    pub fn account(&self, id: AccountId) -> Option<Account> {
        self.snapshot.load().accounts_by_id.get(&id).cloned()
    }

    pub fn accounts_in_group(&self, group_id: GroupId) -> Vec<Account> {
        let snapshot = self.snapshot.load();
        snapshot
            .accounts_by_group
            .get(&group_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| snapshot.accounts_by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.snapshot.load().users_by_id.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_common::{AccountStatus, AccountType, Platform};
    use gate_storage::{MemoryCounterStore, MemoryStorage};
    use time::OffsetDateTime;

    fn sample_account(group_id: GroupId) -> Account {
        let now = OffsetDateTime::UNIX_EPOCH;
        Account {
            id: AccountId::new(),
            group_id,
            platform: Platform::Anthropic,
            account_type: AccountType::OAuth,
            status: AccountStatus::Active,
            schedulable: true,
            concurrency_cap: 2,
            credentials: serde_json::json!({}),
            rate_limit_reset_at: None,
            temp_unschedulable_until: None,
            last_used_at: None,
            session_window: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn accounts_in_group_is_indexed_from_snapshot() {
        let group_id = GroupId::new();
        let account = sample_account(group_id);
        let tenant = TenantSnapshot {
            accounts: vec![account.clone()],
            ..Default::default()
        };
        let storage = Arc::new(MemoryStorage::new(tenant));
        let state = AppState::bootstrap(
            Arc::new(MemoryCounterStore::new()),
            storage,
            GlobalConfig::default(),
        )
        .await
        .unwrap();

        let accounts = state.accounts_in_group(group_id);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, account.id);
        assert!(state.accounts_in_group(GroupId::new()).is_empty());
    }
}
