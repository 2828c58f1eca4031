use std::time::SystemTime;

use gate_common::AccountId;
use serde::{Deserialize, Serialize};

use crate::headers::Headers;
use crate::classify::{UnavailableReason, UpstreamTransportErrorKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Downstream(DownstreamEvent),
    Upstream(UpstreamEvent),
    Operational(OperationalEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownstreamEvent {
    pub trace_id: Option<String>,
    pub at: SystemTime,
    pub user_id: Option<String>,
    pub api_key_id: Option<String>,
    pub request_method: String,
    pub request_headers: Headers,
    pub request_path: String,
    pub request_query: Option<String>,
    pub response_status: Option<u16>,
    pub response_headers: Headers,
    pub is_stream: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamEvent {
    pub trace_id: Option<String>,
    pub at: SystemTime,
    pub user_id: Option<String>,
    pub account_id: Option<AccountId>,
    pub platform: String,
    pub attempt_no: u32,
    pub operation: String,
    pub model: Option<String>,
    pub request_method: String,
    pub request_path: String,
    pub response_status: Option<u16>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub transport_kind: Option<UpstreamTransportErrorKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OperationalEvent {
    UnavailableStart(UnavailableStartEvent),
    UnavailableEnd(UnavailableEndEvent),
    AccountSwitch(AccountSwitchEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableStartEvent {
    pub at: SystemTime,
    pub account_id: AccountId,
    pub reason: UnavailableReason,
    pub until: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableEndEvent {
    pub at: SystemTime,
    pub account_id: AccountId,
}

/// Emitted each time the Failover Controller switches accounts mid-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSwitchEvent {
    pub at: SystemTime,
    pub trace_id: Option<String>,
    pub from_account_id: Option<AccountId>,
    pub to_account_id: Option<AccountId>,
    pub switch_count: u32,
    pub reason: UnavailableReason,
}
