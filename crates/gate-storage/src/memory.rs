use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use gate_common::UsageEvent;

use crate::counter::{CounterResult, SharedCounterStore, SlotToken};
use crate::storage::{Storage, StorageResult, TenantSnapshot};

/// An in-memory `Storage` double for tests: seeded once, read many times,
/// recording whatever usage events pass through it for assertions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: TenantSnapshot,
    recorded: Mutex<Vec<UsageEvent>>,
}

impl MemoryStorage {
    pub fn new(snapshot: TenantSnapshot) -> Self {
        Self {
            snapshot,
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_usage(&self) -> Vec<UsageEvent> {
        self.recorded.lock().expect("recorded lock poisoned").clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_snapshot(&self) -> StorageResult<TenantSnapshot> {
        Ok(self.snapshot.clone())
    }

    async fn record_usage(&self, event: &UsageEvent) -> StorageResult<()> {
        self.recorded
            .lock()
            .expect("recorded lock poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// An in-memory `SharedCounterStore` double. Correct for a single process
/// (it is exactly the `Mutex<HashMap>` a real cross-node store replaces),
/// used by every concurrency-controller test in `gate-core`.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counts: Mutex<HashMap<String, u32>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedCounterStore for MemoryCounterStore {
    async fn try_acquire(
        &self,
        key: &str,
        cap: u32,
        _ttl_secs: u64,
    ) -> CounterResult<Option<SlotToken>> {
        let mut counts = self.counts.lock().expect("counts lock poisoned");
        let current = counts.entry(key.to_string()).or_insert(0);
        if *current >= cap {
            return Ok(None);
        }
        *current += 1;
        Ok(Some(SlotToken(Uuid::new_v4().to_string())))
    }

    async fn release(&self, key: &str, _token: &SlotToken) -> CounterResult<()> {
        let mut counts = self.counts.lock().expect("counts lock poisoned");
        if let Some(current) = counts.get_mut(key) {
            *current = current.saturating_sub(1);
        }
        Ok(())
    }

    async fn current(&self, key: &str) -> CounterResult<u32> {
        let counts = self.counts.lock().expect("counts lock poisoned");
        Ok(counts.get(key).copied().unwrap_or(0))
    }
}
