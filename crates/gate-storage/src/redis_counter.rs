use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use redis::Script;
use uuid::Uuid;

use crate::counter::{CounterError, CounterResult, SharedCounterStore, SlotToken};

const KEY_PREFIX: &str = "llmgate:concurrency:v1";

/// Compare-and-increment, done in one round trip so two gateway processes
/// racing on the same key can't both observe `count < cap` and both
/// succeed. Returns 1 on success, 0 if the cap was already reached.
const TRY_ACQUIRE_SCRIPT: &str = r#"
local key = KEYS[1]
local cap = tonumber(ARGV[1])
local ttl = tonumber(ARGV[2])
local current = tonumber(redis.call('GET', key) or '0')
if current >= cap then
  return 0
end
redis.call('INCR', key)
redis.call('EXPIRE', key, ttl)
return 1
"#;

/// Decrement floored at zero, so a stray double-release never drives the
/// counter negative and lets through more than `cap` concurrent slots.
const RELEASE_SCRIPT: &str = r#"
local key = KEYS[1]
local current = tonumber(redis.call('GET', key) or '0')
if current <= 0 then
  return 0
end
redis.call('DECR', key)
return 1
"#;

/// A `SharedCounterStore` backed by Redis, so the two-tier concurrency
/// controller's `active <= cap` invariant holds across every gateway
/// process sharing one Redis instance, not just within one.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisCounterStore {
    pub async fn connect(redis_url: &str) -> Result<Self, String> {
        let client = redis::Client::open(redis_url).map_err(|err| err.to_string())?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|err| err.to_string())?;
        Ok(Self {
            connection,
            key_prefix: KEY_PREFIX.to_string(),
        })
    }

    fn composed_key(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }
}

#[async_trait]
impl SharedCounterStore for RedisCounterStore {
    async fn try_acquire(
        &self,
        key: &str,
        cap: u32,
        ttl_secs: u64,
    ) -> CounterResult<Option<SlotToken>> {
        let mut connection = self.connection.clone();
        let acquired: i64 = Script::new(TRY_ACQUIRE_SCRIPT)
            .key(self.composed_key(key))
            .arg(cap)
            .arg(ttl_secs)
            .invoke_async(&mut connection)
            .await
            .map_err(|err| CounterError::Backend(err.to_string()))?;
        if acquired == 1 {
            Ok(Some(SlotToken(Uuid::new_v4().to_string())))
        } else {
            Ok(None)
        }
    }

    async fn release(&self, key: &str, _token: &SlotToken) -> CounterResult<()> {
        let mut connection = self.connection.clone();
        let _: i64 = Script::new(RELEASE_SCRIPT)
            .key(self.composed_key(key))
            .invoke_async(&mut connection)
            .await
            .map_err(|err| CounterError::Backend(err.to_string()))?;
        Ok(())
    }

    async fn current(&self, key: &str) -> CounterResult<u32> {
        let mut connection = self.connection.clone();
        let value: Option<u32> = connection
            .get(self.composed_key(key))
            .await
            .map_err(|err| CounterError::Backend(err.to_string()))?;
        Ok(value.unwrap_or(0))
    }
}
