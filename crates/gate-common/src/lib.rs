//! Shared data model and configuration for the llmgate request-routing core.
//!
//! This crate intentionally does **not** depend on axum, tokio, or any
//! concrete storage/HTTP client. It holds the value types that cross crate
//! boundaries: account/group/user rows, the error taxonomy, and global
//! config.

pub mod config;
pub mod error;
pub mod model;
pub mod platform;

pub use config::{GlobalConfig, GlobalConfigError, GlobalConfigPatch, PassthroughRuleConfig};
pub use error::{ErrorKind, GatewayError};
pub use model::{
    Account, AccountId, AccountStatus, AccountType, ApiKey, ForwardResult, Group, GroupId,
    GroupStatus, PassthroughRule, UpstreamFailoverError, UsageEvent, User, UserId,
};
pub use platform::Platform;
