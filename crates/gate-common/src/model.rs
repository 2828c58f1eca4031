use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{PassthroughRuleConfig, StatusMatcher};
use crate::platform::Platform;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(GroupId);
uuid_id!(AccountId);

/// An API key bound to exactly one user and (optionally) one group,
/// carrying its own per-key concurrency ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: UserId,
    pub group_id: Option<GroupId>,
    pub key_hash: String,
    pub enabled: bool,
    /// Per-key concurrency cap; `None` means "inherit the user's cap".
    pub concurrency_cap: Option<u32>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A tenant. `allowed_groups` is the ordered list the Account Selector
/// walks when a group is not pinned by the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub allowed_groups: Vec<GroupId>,
    /// `C_user`: the user-level concurrency ceiling, always >= 1.
    pub concurrency_cap: u32,
    pub enabled: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Active,
    Disabled,
}

/// A pool of accounts speaking the same platform, selected from as a unit
/// by the Account Selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub platform: Platform,
    pub subscription_type: String,
    pub status: GroupStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    OAuth,
    SetupToken,
    ApiKey,
    UpstreamProxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Error,
    Disabled,
}

/// One upstream credential slot within a group.
///
/// `credentials` is deliberately an opaque JSON blob: its shape is
/// platform-specific (OAuth token pair, API key, base-url override, model
/// remapping table). `resolve_model`/`bearer_token` read the handful of
/// well-known keys this crate does interpret; everything else in the blob
/// passes through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub group_id: GroupId,
    pub platform: Platform,
    pub account_type: AccountType,
    pub status: AccountStatus,
    pub schedulable: bool,
    /// `C_acct`: per-account concurrency ceiling.
    pub concurrency_cap: u32,
    pub credentials: serde_json::Value,
    pub rate_limit_reset_at: Option<OffsetDateTime>,
    pub temp_unschedulable_until: Option<OffsetDateTime>,
    pub last_used_at: Option<OffsetDateTime>,
    /// Sticky-session window length, if this account's platform needs one
    /// (e.g. a provider that bills in fixed windows); `None` disables
    /// session stickiness for this account.
    pub session_window: Option<time::Duration>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Account {
    pub fn is_available(&self, now: OffsetDateTime) -> bool {
        if self.status != AccountStatus::Active || !self.schedulable {
            return false;
        }
        if let Some(until) = self.temp_unschedulable_until {
            if now < until {
                return false;
            }
        }
        if let Some(reset) = self.rate_limit_reset_at {
            if now < reset {
                return false;
            }
        }
        true
    }

    /// Looks `requested_model` up in this account's `credentials.models`
    /// mapping and returns the model name to actually send upstream.
    ///
    /// An account with no `models` table at all accepts any model
    /// unchanged (a bare API-key/base-url credential with no remapping
    /// configured). An account with a `models` table must have either an
    /// exact entry for the requested model or a `"*"` wildcard fallback;
    /// absent both, the model is unsupported and `None` is returned so the
    /// Account Selector excludes this account from the candidate set.
    pub fn resolve_model(&self, requested_model: &str) -> Option<String> {
        match self.credentials.get("models") {
            None => Some(requested_model.to_string()),
            Some(serde_json::Value::Object(map)) => {
                if let Some(mapped) = map.get(requested_model) {
                    return Some(
                        mapped
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| requested_model.to_string()),
                    );
                }
                map.get("*").map(|wildcard| {
                    wildcard
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| requested_model.to_string())
                })
            }
            Some(_) => Some(requested_model.to_string()),
        }
    }

    /// The bearer token to attach to the outbound `Authorization` header,
    /// read from whichever credential field this account's type populates.
    pub fn bearer_token(&self) -> Option<&str> {
        self.credentials
            .get("access_token")
            .and_then(serde_json::Value::as_str)
            .or_else(|| self.credentials.get("api_key").and_then(serde_json::Value::as_str))
            .or_else(|| self.credentials.get("token").and_then(serde_json::Value::as_str))
    }
}

/// Usage recorded for one completed forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardResult {
    pub request_id: Uuid,
    pub model: String,
    pub stream: bool,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub duration: time::Duration,
    /// Time-to-first-token; `None` for non-stream responses.
    pub first_token_ms: Option<u64>,
}

/// An upstream failure that the Failover Controller decided was terminal
/// and should be relayed to the caller verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamFailoverError {
    pub status_code: u16,
    pub response_body: serde_json::Value,
    pub headers: HashMap<String, String>,
}

/// An evaluated error-passthrough rule; the config-layer form lives
/// in `crate::config::PassthroughRuleConfig` and is compiled into this
/// shape once at config-load time.
#[derive(Debug, Clone)]
pub struct PassthroughRule {
    pub platform: Option<Platform>,
    pub status_matcher: StatusMatcher,
    pub body_matcher: Option<String>,
    pub response_code: Option<u16>,
    pub custom_message: Option<String>,
    pub passthrough_code: bool,
    pub passthrough_body: bool,
    pub skip_monitoring: bool,
}

impl PassthroughRule {
    pub fn from_config(cfg: &PassthroughRuleConfig) -> Self {
        Self {
            platform: cfg.platform.as_deref().and_then(Platform::parse),
            status_matcher: cfg.status_matcher,
            body_matcher: cfg.body_matcher.clone(),
            response_code: cfg.response_code,
            custom_message: cfg.custom_message.clone(),
            passthrough_code: cfg.passthrough_code,
            passthrough_body: cfg.passthrough_body,
            skip_monitoring: cfg.skip_monitoring,
        }
    }

    /// Matches a rule against an observed upstream failure. `body` is the
    /// upstream response body rendered as a string for substring matching.
    pub fn matches(&self, platform: Platform, status: u16, body: &str) -> bool {
        if let Some(want) = self.platform {
            if want != platform {
                return false;
            }
        }
        if !self.status_matcher.matches(status) {
            return false;
        }
        if let Some(needle) = &self.body_matcher {
            if !body.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

/// A billable usage record, emitted by the Usage Recorder stage.
/// Recording it is someone else's job (an external ledger); this crate
/// only defines its shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub request_id: Uuid,
    pub api_key_id: Uuid,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub group_id: GroupId,
    pub subscription_type: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub forward_result: ForwardResult,
    pub recorded_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account(status: AccountStatus, schedulable: bool) -> Account {
        let now = OffsetDateTime::UNIX_EPOCH;
        Account {
            id: AccountId::new(),
            group_id: GroupId::new(),
            platform: Platform::Anthropic,
            account_type: AccountType::OAuth,
            status,
            schedulable,
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

    #[test]
    fn account_unavailable_when_disabled_or_unschedulable() {
        let now = OffsetDateTime::UNIX_EPOCH;
        assert!(!sample_account(AccountStatus::Disabled, true).is_available(now));
        assert!(!sample_account(AccountStatus::Active, false).is_available(now));
        assert!(sample_account(AccountStatus::Active, true).is_available(now));
    }

    #[test]
    fn account_unavailable_during_rate_limit_window() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let mut acct = sample_account(AccountStatus::Active, true);
        acct.rate_limit_reset_at = Some(now + time::Duration::seconds(30));
        assert!(!acct.is_available(now));
        assert!(acct.is_available(now + time::Duration::seconds(31)));
    }

    #[test]
    fn resolve_model_accepts_anything_with_no_models_table() {
        let acct = sample_account(AccountStatus::Active, true);
        assert_eq!(acct.resolve_model("claude-3-5-sonnet").as_deref(), Some("claude-3-5-sonnet"));
    }

    #[test]
    fn resolve_model_maps_known_aliases_and_rejects_unknown_ones() {
        let mut acct = sample_account(AccountStatus::Active, true);
        acct.credentials = serde_json::json!({"models": {"claude-3-5-sonnet": "claude-sonnet-4-5"}});
        assert_eq!(acct.resolve_model("claude-3-5-sonnet").as_deref(), Some("claude-sonnet-4-5"));
        assert!(acct.resolve_model("gpt-4o").is_none());
    }

    #[test]
    fn resolve_model_falls_back_to_wildcard_entry() {
        let mut acct = sample_account(AccountStatus::Active, true);
        acct.credentials = serde_json::json!({"models": {"*": true}});
        assert_eq!(acct.resolve_model("anything").as_deref(), Some("anything"));
    }

    #[test]
    fn bearer_token_prefers_access_token_over_api_key() {
        let mut acct = sample_account(AccountStatus::Active, true);
        acct.credentials = serde_json::json!({"access_token": "at", "api_key": "ak"});
        assert_eq!(acct.bearer_token(), Some("at"));
        acct.credentials = serde_json::json!({"api_key": "ak"});
        assert_eq!(acct.bearer_token(), Some("ak"));
        acct.credentials = serde_json::json!({});
        assert_eq!(acct.bearer_token(), None);
    }

    #[test]
    fn passthrough_rule_matches_platform_status_and_body() {
        let rule = PassthroughRule {
            platform: Some(Platform::OpenAI),
            status_matcher: StatusMatcher::Exact(429),
            body_matcher: Some("quota".to_string()),
            response_code: Some(429),
            custom_message: None,
            passthrough_code: true,
            passthrough_body: true,
            skip_monitoring: false,
        };
        assert!(rule.matches(Platform::OpenAI, 429, "quota exceeded"));
        assert!(!rule.matches(Platform::OpenAI, 429, "server error"));
        assert!(!rule.matches(Platform::Anthropic, 429, "quota exceeded"));
    }
}
