//! External-boundary traits for the request-routing core: persisted tenant
//! data (`Storage`) and the shared atomic counters the Concurrency
//! Controller needs across gateway nodes (`SharedCounterStore`).
//!
//! Neither trait is implemented against a concrete database or ledger here:
//! that is someone else's system. This crate only defines the boundary and
//! ships the in-memory doubles used by the rest of the workspace's tests,
//! plus one real `SharedCounterStore` backed by Redis, since a two-tier
//! semaphore that only works against a fake store isn't worth shipping.

pub mod counter;
pub mod memory;
pub mod redis_counter;
pub mod storage;

pub use counter::{CounterError, CounterResult, SharedCounterStore, SlotToken};
pub use memory::{MemoryCounterStore, MemoryStorage};
pub use redis_counter::RedisCounterStore;
pub use storage::{Storage, StorageError, StorageResult, TenantSnapshot};
