use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GlobalConfigError {
    #[error("missing required global config field: {0}")]
    MissingField(&'static str),
}

/// Final, merged global configuration used by the running process.
///
/// Merge order (after defaults): CLI > ENV > stored config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Optional outbound proxy for upstream egress.
    pub proxy: Option<String>,
    /// Whether to redact sensitive fields in emitted events.
    pub event_redact_sensitive: bool,

    /// `Concurrency.PingInterval` — SSE keep-alive comment cadence while
    /// waiting for a concurrency slot.
    pub concurrency_ping_interval: Duration,
    /// `Gateway.MaxAccountSwitches` — failover attempts per request.
    pub max_account_switches: u32,
    /// `Security.URLAllowlist.*` — upstream URL validation allowlist.
    pub url_allowlist: Vec<String>,
    /// `Security.ResponseHeaders` — allowlist of headers propagated from
    /// upstream to the client.
    pub response_header_allowlist: Vec<String>,

    /// Per-process cache TTLs.
    pub api_cache_ttl: Duration,
    pub window_stats_ttl: Duration,

    /// Operator-configured error passthrough rules, consulted before the
    /// default status map.
    pub passthrough_rules: Vec<PassthroughRuleConfig>,

    /// Request Ingress byte-limit; a body larger than this is rejected with
    /// `body_too_large` before it is parsed.
    pub max_request_body_bytes: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            proxy: None,
            event_redact_sensitive: true,
            concurrency_ping_interval: Duration::from_secs(10),
            max_account_switches: 3,
            url_allowlist: Vec::new(),
            response_header_allowlist: default_response_headers(),
            api_cache_ttl: Duration::from_secs(180),
            window_stats_ttl: Duration::from_secs(60),
            passthrough_rules: Vec::new(),
            max_request_body_bytes: 10 * 1024 * 1024,
        }
    }
}

fn default_response_headers() -> Vec<String> {
    vec![
        "content-type".to_string(),
        "request-id".to_string(),
        "x-request-id".to_string(),
    ]
}

/// Operator-configured error passthrough rule (wire format; see
/// `gate_common::model::PassthroughRule` for the evaluated form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassthroughRuleConfig {
    pub platform: Option<String>,
    pub status_matcher: StatusMatcher,
    pub body_matcher: Option<String>,
    pub response_code: Option<u16>,
    pub custom_message: Option<String>,
    pub passthrough_code: bool,
    pub passthrough_body: bool,
    pub skip_monitoring: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusMatcher {
    Exact(u16),
    Range(u16, u16),
    Any,
}

impl StatusMatcher {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusMatcher::Exact(s) => *s == status,
            StatusMatcher::Range(lo, hi) => (*lo..=*hi).contains(&status),
            StatusMatcher::Any => true,
        }
    }
}

/// Optional layer used for merging global config (CLI flags / env vars are
/// each collected into one of these, then overlaid in precedence order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub proxy: Option<String>,
    pub event_redact_sensitive: Option<bool>,
    pub concurrency_ping_interval: Option<Duration>,
    pub max_account_switches: Option<u32>,
    pub url_allowlist: Option<Vec<String>>,
    pub response_header_allowlist: Option<Vec<String>>,
    pub api_cache_ttl: Option<Duration>,
    pub window_stats_ttl: Option<Duration>,
    pub passthrough_rules: Option<Vec<PassthroughRuleConfig>>,
    pub max_request_body_bytes: Option<usize>,
}

impl GlobalConfigPatch {
    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(host);
        take!(port);
        take!(proxy);
        take!(event_redact_sensitive);
        take!(concurrency_ping_interval);
        take!(max_account_switches);
        take!(url_allowlist);
        take!(response_header_allowlist);
        take!(api_cache_ttl);
        take!(window_stats_ttl);
        take!(passthrough_rules);
        take!(max_request_body_bytes);
    }

    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        let defaults = GlobalConfig::default();
        Ok(GlobalConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            proxy: self.proxy,
            event_redact_sensitive: self
                .event_redact_sensitive
                .unwrap_or(defaults.event_redact_sensitive),
            concurrency_ping_interval: self
                .concurrency_ping_interval
                .unwrap_or(defaults.concurrency_ping_interval),
            max_account_switches: self
                .max_account_switches
                .unwrap_or(defaults.max_account_switches),
            url_allowlist: self.url_allowlist.unwrap_or(defaults.url_allowlist),
            response_header_allowlist: self
                .response_header_allowlist
                .unwrap_or(defaults.response_header_allowlist),
            api_cache_ttl: self.api_cache_ttl.unwrap_or(defaults.api_cache_ttl),
            window_stats_ttl: self.window_stats_ttl.unwrap_or(defaults.window_stats_ttl),
            passthrough_rules: self.passthrough_rules.unwrap_or(defaults.passthrough_rules),
            max_request_body_bytes: self
                .max_request_body_bytes
                .unwrap_or(defaults.max_request_body_bytes),
        })
    }
}

impl From<GlobalConfig> for GlobalConfigPatch {
    fn from(value: GlobalConfig) -> Self {
        Self {
            host: Some(value.host),
            port: Some(value.port),
            proxy: value.proxy,
            event_redact_sensitive: Some(value.event_redact_sensitive),
            concurrency_ping_interval: Some(value.concurrency_ping_interval),
            max_account_switches: Some(value.max_account_switches),
            url_allowlist: Some(value.url_allowlist),
            response_header_allowlist: Some(value.response_header_allowlist),
            api_cache_ttl: Some(value.api_cache_ttl),
            window_stats_ttl: Some(value.window_stats_ttl),
            passthrough_rules: Some(value.passthrough_rules),
            max_request_body_bytes: Some(value.max_request_body_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_overlay_prefers_later_non_none_fields() {
        let mut base = GlobalConfigPatch {
            port: Some(8787),
            max_account_switches: Some(3),
            ..Default::default()
        };
        let override_patch = GlobalConfigPatch {
            port: Some(9000),
            ..Default::default()
        };
        base.overlay(override_patch);
        assert_eq!(base.port, Some(9000));
        assert_eq!(base.max_account_switches, Some(3));
    }

    #[test]
    fn into_config_fills_defaults() {
        let cfg = GlobalConfigPatch::default().into_config().unwrap();
        assert_eq!(cfg.max_account_switches, 3);
        assert_eq!(cfg.port, 8787);
    }
}
