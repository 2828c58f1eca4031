use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use gate_common::{AccountId, ForwardResult, GatewayError, GroupId, Platform, UsageEvent};
use gate_common::PassthroughRule;
use gate_protocol::{Family, SseItem, SseParser, WireRequest, WireResponse, encode_event, encode_ping_comment};
use gate_provider_core::{
    Event, HttpMethod, UpstreamBody, UpstreamEvent, UpstreamFailure, UpstreamHttpRequest,
    UpstreamTransportErrorKind, header_set,
};
use gate_transform::{StreamTranslator, translate_request, translate_response};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::classify::ClassifiedRequest;
use crate::concurrency::{AcquireOutcome, ConcurrencyController, DefaultWaitPolicy, WaitPolicy};
use crate::error::ProxyError;
use crate::failover::{FailoverDecision, FailoverState};
use crate::forwarder::UpstreamClient;
use crate::passthrough::PassthroughController;
use crate::selector::AccountSelector;
use crate::state::AppState;
use crate::usage::UsageRecorder;

/// A JSON response body plus the status it should leave with, already
/// translated into the caller's family.
pub struct JsonOutcome {
    pub status: u16,
    pub body: Bytes,
}

/// A live stream of SSE bytes, already translated into the caller's family
/// event-by-event as it arrives.
pub struct StreamOutcome {
    pub status: u16,
    pub body: Box<dyn futures_util::Stream<Item = Result<Bytes, std::io::Error>> + Send + Unpin>,
}

pub enum ProxyOutcome {
    Json(JsonOutcome),
    Stream(StreamOutcome),
}

/// The end-to-end proxy engine: classify → identify → rank accounts →
/// acquire concurrency → translate → forward → translate back → record
/// usage, retrying on another account when the Failover Controller says to.
pub struct ProxyEngine {
    state: Arc<AppState>,
    concurrency: Arc<ConcurrencyController>,
    selector: AccountSelector,
    client: Arc<dyn UpstreamClient>,
    usage: UsageRecorder,
    max_account_switches: u32,
    ping_interval: Duration,
    wait_policy: Arc<dyn WaitPolicy>,
}

impl ProxyEngine {
    pub fn new(
        state: Arc<AppState>,
        concurrency: Arc<ConcurrencyController>,
        selector: AccountSelector,
        client: Arc<dyn UpstreamClient>,
        usage: UsageRecorder,
        max_account_switches: u32,
        ping_interval: Duration,
    ) -> Self {
        Self::with_wait_policy(
            state,
            concurrency,
            selector,
            client,
            usage,
            max_account_switches,
            ping_interval,
            Arc::new(DefaultWaitPolicy),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_wait_policy(
        state: Arc<AppState>,
        concurrency: Arc<ConcurrencyController>,
        selector: AccountSelector,
        client: Arc<dyn UpstreamClient>,
        usage: UsageRecorder,
        max_account_switches: u32,
        ping_interval: Duration,
        wait_policy: Arc<dyn WaitPolicy>,
    ) -> Self {
        Self {
            state,
            concurrency,
            selector,
            client,
            usage,
            max_account_switches,
            ping_interval,
            wait_policy,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.state.global.load().max_request_body_bytes
    }

    pub async fn handle(
        &self,
        trace_id: Uuid,
        auth: AuthContext,
        classified: ClassifiedRequest,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<ProxyOutcome, ProxyError> {
        let Some(user_id) = auth.user_id else {
            return Err(ProxyError::bad_request("caller has no resolved identity"));
        };

        let requested_model = classified
            .wire
            .model()
            .map(|m| m.to_string())
            .ok_or_else(|| ProxyError::bad_request("model is required"))?;

        let group_id = self.resolve_group(user_id, auth.group_id, &requested_model, classified.forced_platform)?;

        let group = self
            .state
            .snapshot
            .load()
            .groups_by_id
            .get(&group_id)
            .cloned()
            .ok_or_else(|| ProxyError::not_found("unknown group"))?;

        let session_hash = session_hash(&classified.wire);
        let user_cap = auth.api_key_concurrency_cap.unwrap_or(auth.user_concurrency_cap);
        let account_cap_override = None::<u32>;

        let mut failover = FailoverState::new();
        let start = Instant::now();

        loop {
            let candidates: Vec<_> = self
                .state
                .accounts_in_group(group_id)
                .into_iter()
                .filter(|a| a.is_available(time::OffsetDateTime::now_utc()))
                .collect();

            let selection = self
                .selector
                .select(
                    &candidates,
                    session_hash,
                    self.state.counters.as_ref(),
                    failover.excluded_accounts(),
                    &requested_model,
                    classified.forced_platform,
                )
                .await
                .ok_or_else(|| {
                    if failover.excluded_accounts().is_empty() {
                        ProxyError::from_gateway_error(
                            &GatewayError::api("service_unavailable").with_status(503),
                        )
                    } else {
                        ProxyError::from_gateway_error(
                            &GatewayError::upstream("service_unavailable").with_status(502),
                        )
                    }
                })?;

            let account = self
                .state
                .account(selection.account_id)
                .ok_or_else(|| ProxyError::not_found("selected account vanished"))?;

            let resolved_model = account
                .resolve_model(&requested_model)
                .unwrap_or_else(|| requested_model.clone());

            let account_cap = account_cap_override.unwrap_or(account.concurrency_cap);
            let wait_plan = self.wait_policy.plan(account_cap);

            let (outcome, slots) = self
                .concurrency
                .acquire(
                    user_id,
                    user_cap,
                    account.id,
                    account_cap,
                    wait_plan.max_waiting,
                    wait_plan.timeout,
                    self.ping_interval,
                    || {},
                )
                .await
                .map_err(|_| ProxyError::bad_request("concurrency store unavailable"))?;

            let Some(slots) = slots else {
                return Err(match outcome {
                    AcquireOutcome::TimedOut => ProxyError::from_gateway_error(
                        &GatewayError::rate_limit("no free concurrency slot").with_status(429),
                    ),
                    AcquireOutcome::Rejected => ProxyError::from_gateway_error(
                        &GatewayError::rate_limit("Too many pending requests, please retry later")
                            .with_status(429),
                    ),
                    AcquireOutcome::Granted => unreachable!("acquire returned Granted without slots"),
                });
            };

            let target_family = platform_family(account.platform);
            let mut translated = match translate_request(
                classified.wire.family,
                target_family,
                &classified.wire,
            ) {
                Ok(req) => req,
                Err(err) => {
                    self.concurrency.release(slots).await.ok();
                    return Err(ProxyError::bad_request(err.to_string()));
                }
            };
            translated.set_model(&resolved_model);

            let forward_result = self
                .forward(&account, translated, classified.is_stream, trace_id)
                .await;

            match forward_result {
                Ok(ForwardOutcome::Json { body, input_tokens, output_tokens }) => {
                    self.concurrency.release(slots).await.ok();
                    self.record_usage(
                        trace_id,
                        &auth,
                        group_id,
                        account.id,
                        &group.subscription_type,
                        classified.wire.model().unwrap_or("unknown"),
                        false,
                        input_tokens,
                        output_tokens,
                        start.elapsed(),
                        None,
                        client_ip,
                        user_agent,
                    )
                    .await;
                    let response_body = match translate_response(
                        target_family,
                        classified.wire.family,
                        &WireResponse::new(target_family, body),
                    ) {
                        Ok(resp) => resp.body,
                        Err(err) => return Err(ProxyError::bad_request(err.to_string())),
                    };
                    return Ok(ProxyOutcome::Json(JsonOutcome {
                        status: 200,
                        body: Bytes::from(serde_json::to_vec(&response_body).unwrap_or_default()),
                    }));
                }
                Ok(ForwardOutcome::Stream { status, rx }) => {
                    failover.mark_stream_started();
                    let translator =
                        StreamTranslator::new(target_family, classified.wire.family);
                    let stream = translate_stream(rx, translator, self.concurrency_release_handle(slots));
                    return Ok(ProxyOutcome::Stream(StreamOutcome {
                        status,
                        body: Box::new(stream),
                    }));
                }
                Err(failure) => {
                    self.concurrency.release(slots).await.ok();
                    let rules: Vec<PassthroughRule> = self
                        .state
                        .global
                        .load()
                        .passthrough_rules
                        .iter()
                        .map(PassthroughRule::from_config)
                        .collect();
                    let passthrough =
                        PassthroughController::new(rules).evaluate(account.platform, &failure);
                    let reason = passthrough.unavailable.map(|d| d.reason);
                    self.selector.forget_account(account.id);

                    let decision =
                        failover.record_failure(account.id, reason, self.max_account_switches);
                    if decision == FailoverDecision::Retry {
                        continue;
                    }
                    return Ok(ProxyOutcome::Json(JsonOutcome {
                        status: passthrough.status,
                        body: passthrough.body,
                    }));
                }
            }
        }
    }

    /// Identity Resolution: a bound group wins outright; otherwise walk the
    /// caller's allowed groups in order and use the first one that actually
    /// has an account serving `requested_model` (respecting a forced
    /// platform, if the request's path named one).
    fn resolve_group(
        &self,
        user_id: gate_common::UserId,
        bound_group_id: Option<GroupId>,
        requested_model: &str,
        forced_platform: Option<Platform>,
    ) -> Result<GroupId, ProxyError> {
        if let Some(group_id) = bound_group_id {
            return Ok(group_id);
        }

        let user = self
            .state
            .user(user_id)
            .ok_or_else(|| ProxyError::not_found("unknown user"))?;
        let now = time::OffsetDateTime::now_utc();

        for candidate in &user.allowed_groups {
            let has_match = self
                .state
                .accounts_in_group(*candidate)
                .iter()
                .any(|a| {
                    a.is_available(now)
                        && a.resolve_model(requested_model).is_some()
                        && forced_platform.map(|p| p == a.platform).unwrap_or(true)
                });
            if has_match {
                return Ok(*candidate);
            }
        }

        Err(ProxyError::from_gateway_error(
            &GatewayError::invalid_request("no_accessible_groups"),
        ))
    }

    fn concurrency_release_handle(
        &self,
        slots: crate::concurrency::ConcurrencySlots,
    ) -> impl FnOnce() + Send + 'static {
        let concurrency = self.concurrency.clone();
        move || {
            tokio::spawn(async move {
                let _ = concurrency.release(slots).await;
            });
        }
    }

    async fn forward(
        &self,
        account: &gate_common::Account,
        wire: WireRequest,
        is_stream: bool,
        trace_id: Uuid,
    ) -> Result<ForwardOutcome, UpstreamFailure> {
        let url = upstream_url(account, &wire);
        let body = Bytes::from(serde_json::to_vec(&wire.body).unwrap_or_default());
        let mut headers = Vec::new();
        if let Some(token) = account.bearer_token() {
            header_set(&mut headers, "authorization", format!("Bearer {token}"));
        }
        let req = UpstreamHttpRequest {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(body),
            is_stream,
        };

        let response = self.client.send(req).await?;
        self.state
            .events
            .emit(Event::Upstream(UpstreamEvent {
            trace_id: trace_id.to_string(),
            at: std::time::SystemTime::now(),
            user_id: None,
            account_id: Some(account.id),
            platform: account.platform.to_string(),
            attempt_no: 1,
            operation: wire.family.to_string(),
            model: wire.model().map(|m| m.to_string()),
            request_method: "POST".to_string(),
            request_path: String::new(),
            response_status: Some(response.status),
            input_tokens: None,
            output_tokens: None,
            error_kind: None,
            error_message: None,
            transport_kind: None,
            }))
            .await;

        if !(200..300).contains(&response.status) {
            let body = match response.body {
                UpstreamBody::Bytes(b) => b,
                UpstreamBody::Stream(mut rx) => {
                    let mut collected = Vec::new();
                    while let Some(chunk) = rx.recv().await {
                        collected.extend_from_slice(&chunk);
                    }
                    Bytes::from(collected)
                }
            };
            return Err(UpstreamFailure::Http {
                status: response.status,
                headers: response.headers,
                body,
            });
        }

        match response.body {
            UpstreamBody::Bytes(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|err| {
                    UpstreamFailure::Transport {
                        kind: UpstreamTransportErrorKind::Other,
                        message: err.to_string(),
                    }
                })?;
                let wire_response = WireResponse::new(wire.family, value);
                let (input_tokens, output_tokens) =
                    wire_response.usage_tokens().unwrap_or((0, 0));
                Ok(ForwardOutcome::Json {
                    body: wire_response.body,
                    input_tokens,
                    output_tokens,
                })
            }
            UpstreamBody::Stream(rx) => Ok(ForwardOutcome::Stream {
                status: response.status,
                rx,
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_usage(
        &self,
        trace_id: Uuid,
        auth: &AuthContext,
        group_id: GroupId,
        account_id: AccountId,
        subscription_type: &str,
        model: &str,
        stream: bool,
        input_tokens: u64,
        output_tokens: u64,
        duration: Duration,
        first_token_ms: Option<u64>,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) {
        let Some(user_id) = auth.user_id else { return };
        let Some(api_key_id) = auth.api_key_id else { return };
        let event = UsageEvent {
            request_id: trace_id,
            api_key_id,
            user_id,
            account_id,
            group_id,
            subscription_type: subscription_type.to_string(),
            client_ip,
            user_agent,
            forward_result: ForwardResult {
                request_id: trace_id,
                model: model.to_string(),
                stream,
                input_tokens,
                output_tokens,
                total_tokens: input_tokens + output_tokens,
                duration: time::Duration::try_from(duration).unwrap_or(time::Duration::ZERO),
                first_token_ms,
            },
            recorded_at: time::OffsetDateTime::now_utc(),
        };
        self.usage.record(event, Duration::from_millis(200)).await;
    }
}

enum ForwardOutcome {
    Json {
        body: serde_json::Value,
        input_tokens: u64,
        output_tokens: u64,
    },
    Stream {
        status: u16,
        rx: mpsc::Receiver<Bytes>,
    },
}

fn session_hash(wire: &WireRequest) -> Option<u64> {
    use std::hash::{Hash, Hasher};
    let seed = wire.session_hash_seed();
    if seed.is_empty() {
        return None;
    }
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    seed.hash(&mut hasher);
    Some(hasher.finish())
}

fn platform_family(platform: Platform) -> Family {
    match platform {
        Platform::Anthropic => Family::ClaudeMessages,
        Platform::OpenAI | Platform::Copilot | Platform::Aggregator => {
            Family::OpenAiChatCompletions
        }
        Platform::Gemini | Platform::Antigravity => Family::GeminiGenerateContent,
    }
}

fn upstream_url(account: &gate_common::Account, wire: &WireRequest) -> String {
    account
        .credentials
        .get("base_url")
        .and_then(serde_json::Value::as_str)
        .map(|base| format!("{}/{}", base.trim_end_matches('/'), wire.family))
        .unwrap_or_else(|| format!("https://api.invalid/{}", wire.family))
}

/// Pipes raw upstream SSE bytes through the family-to-family stream
/// translator, re-encoding each event before handing it to the response
/// body, and releases the held concurrency slots once the stream ends
/// (successfully or not) rather than when the function returns, since the
/// stream outlives this call.
fn translate_stream(
    mut rx: mpsc::Receiver<Bytes>,
    mut translator: StreamTranslator,
    on_done: impl FnOnce() + Send + 'static,
) -> impl futures_util::Stream<Item = Result<Bytes, std::io::Error>> + Send + Unpin {
    let (tx, out_rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(16);
    tokio::spawn(async move {
        let mut parser = SseParser::new();
        while let Some(chunk) = rx.recv().await {
            for item in parser.push_bytes(&chunk) {
                match item {
                    SseItem::Event(event) => {
                        for translated in translator.push(&event) {
                            let encoded = encode_event(&translated);
                            if tx.send(Ok(Bytes::from(encoded))).await.is_err() {
                                on_done();
                                return;
                            }
                        }
                    }
                    SseItem::Comment(_) => {
                        if tx
                            .send(Ok(Bytes::from(encode_ping_comment())))
                            .await
                            .is_err()
                        {
                            on_done();
                            return;
                        }
                    }
                }
            }
        }
        on_done();
    });
    ReceiverStream::new(out_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gate_common::UserId;

    #[test]
    fn platform_maps_to_its_native_family() {
        assert_eq!(platform_family(Platform::Anthropic), Family::ClaudeMessages);
        assert_eq!(
            platform_family(Platform::OpenAI),
            Family::OpenAiChatCompletions
        );
        assert_eq!(
            platform_family(Platform::Gemini),
            Family::GeminiGenerateContent
        );
    }

    #[test]
    fn session_hash_is_stable_for_the_same_messages() {
        let wire = WireRequest::new(
            Family::ClaudeMessages,
            serde_json::json!({"messages": [{"role": "user", "content": "hi"}]}),
        );
        assert_eq!(session_hash(&wire), session_hash(&wire));
    }

    #[test]
    fn session_hash_is_none_without_any_content() {
        let wire = WireRequest::new(Family::ClaudeMessages, serde_json::json!({}));
        assert!(session_hash(&wire).is_none());
    }

    struct FakeUpstreamClient {
        status: u16,
        body: serde_json::Value,
    }

    impl UpstreamClient for FakeUpstreamClient {
        fn send<'a>(
            &'a self,
            _req: UpstreamHttpRequest,
        ) -> std::pin::Pin<
            Box<
                dyn std::future::Future<Output = Result<gate_provider_core::UpstreamHttpResponse, UpstreamFailure>>
                    + Send
                    + 'a,
            >,
        > {
            let status = self.status;
            let body = Bytes::from(serde_json::to_vec(&self.body).unwrap());
            Box::pin(async move {
                Ok(gate_provider_core::UpstreamHttpResponse {
                    status,
                    headers: Vec::new(),
                    body: UpstreamBody::Bytes(body),
                })
            })
        }
    }

    fn sample_account(group_id: GroupId) -> gate_common::Account {
        let now = time::OffsetDateTime::UNIX_EPOCH;
        gate_common::Account {
            id: AccountId::new(),
            group_id,
            platform: Platform::Anthropic,
            account_type: gate_common::AccountType::OAuth,
            status: gate_common::AccountStatus::Active,
            schedulable: true,
            concurrency_cap: 2,
            credentials: serde_json::json!({"base_url": "https://api.example.test"}),
            rate_limit_reset_at: None,
            temp_unschedulable_until: None,
            last_used_at: None,
            session_window: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_group(platform: Platform) -> gate_common::Group {
        let now = time::OffsetDateTime::UNIX_EPOCH;
        gate_common::Group {
            id: GroupId::new(),
            name: "default".to_string(),
            platform,
            subscription_type: "pro".to_string(),
            status: gate_common::GroupStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    async fn build_engine(
        group: gate_common::Group,
        account: gate_common::Account,
        client: Arc<dyn UpstreamClient>,
    ) -> (Arc<ProxyEngine>, Arc<gate_storage::MemoryStorage>) {
        let tenant = gate_storage::TenantSnapshot {
            groups: vec![group],
            accounts: vec![account],
            ..Default::default()
        };
        let storage = Arc::new(gate_storage::MemoryStorage::new(tenant));
        let counters: Arc<dyn gate_storage::SharedCounterStore> =
            Arc::new(gate_storage::MemoryCounterStore::new());
        let state = Arc::new(
            AppState::bootstrap(counters.clone(), storage.clone(), gate_common::GlobalConfig::default())
                .await
                .unwrap(),
        );
        let concurrency = Arc::new(ConcurrencyController::new(counters, 60));
        let selector = AccountSelector::new(Duration::from_secs(60));
        let usage = UsageRecorder::spawn(storage.clone(), 8, 1);
        let engine = Arc::new(ProxyEngine::new(
            state,
            concurrency,
            selector,
            client,
            usage,
            3,
            Duration::from_secs(15),
        ));
        (engine, storage)
    }

    #[tokio::test]
    async fn end_to_end_json_request_is_forwarded_and_usage_is_recorded() {
        let group = sample_group(Platform::Anthropic);
        let account = sample_account(group.id);
        let upstream_body = serde_json::json!({
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "hi there"}],
            "usage": {"input_tokens": 3, "output_tokens": 5},
        });
        let client = Arc::new(FakeUpstreamClient { status: 200, body: upstream_body });
        let (engine, storage) = build_engine(group.clone(), account.clone(), client).await;

        let auth = AuthContext {
            user_id: Some(UserId::new()),
            api_key_id: Some(Uuid::new_v4()),
            group_id: Some(group.id),
            user_concurrency_cap: 4,
            api_key_concurrency_cap: None,
        };
        let classified = ClassifiedRequest {
            family: Family::ClaudeMessages,
            wire: WireRequest::new(
                Family::ClaudeMessages,
                serde_json::json!({"model": "claude-3", "messages": [{"role": "user", "content": "hi"}]}),
            ),
            is_stream: false,
            forced_platform: None,
        };

        let outcome = engine
            .handle(Uuid::new_v4(), auth, classified, None, None)
            .await
            .unwrap();

        let ProxyOutcome::Json(json) = outcome else {
            panic!("expected a json outcome for a non-streaming request");
        };
        assert_eq!(json.status, 200);
        let body: serde_json::Value = serde_json::from_slice(&json.body).unwrap();
        assert_eq!(body["content"][0]["text"], "hi there");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(storage.recorded_usage().len(), 1);
        assert_eq!(storage.recorded_usage()[0].forward_result.input_tokens, 3);
        assert_eq!(storage.recorded_usage()[0].forward_result.output_tokens, 5);
    }

    #[tokio::test]
    async fn upstream_failure_fails_over_until_switches_are_exhausted() {
        let group = sample_group(Platform::Anthropic);
        let a = sample_account(group.id);
        let b = sample_account(group.id);
        let failing_client = Arc::new(FakeUpstreamClient {
            status: 500,
            body: serde_json::json!({"error": {"message": "boom"}}),
        });
        let tenant = gate_storage::TenantSnapshot {
            groups: vec![group.clone()],
            accounts: vec![a.clone(), b.clone()],
            ..Default::default()
        };
        let storage = Arc::new(gate_storage::MemoryStorage::new(tenant));
        let counters: Arc<dyn gate_storage::SharedCounterStore> =
            Arc::new(gate_storage::MemoryCounterStore::new());
        let state = Arc::new(
            AppState::bootstrap(counters.clone(), storage.clone(), gate_common::GlobalConfig::default())
                .await
                .unwrap(),
        );
        let concurrency = Arc::new(ConcurrencyController::new(counters, 60));
        let selector = AccountSelector::new(Duration::from_secs(60));
        let usage = UsageRecorder::spawn(storage.clone(), 8, 1);
        let engine = ProxyEngine::new(
            state,
            concurrency,
            selector,
            failing_client,
            usage,
            2,
            Duration::from_secs(15),
        );

        let auth = AuthContext {
            user_id: Some(UserId::new()),
            api_key_id: Some(Uuid::new_v4()),
            group_id: Some(group.id),
            user_concurrency_cap: 4,
            api_key_concurrency_cap: None,
        };
        let classified = ClassifiedRequest {
            family: Family::ClaudeMessages,
            wire: WireRequest::new(
                Family::ClaudeMessages,
                serde_json::json!({"model": "claude-3", "messages": []}),
            ),
            is_stream: false,
            forced_platform: None,
        };

        let outcome = engine
            .handle(Uuid::new_v4(), auth, classified, None, None)
            .await
            .unwrap();

        let ProxyOutcome::Json(json) = outcome else {
            panic!("expected a json outcome once both accounts fail");
        };
        // Both accounts failed and the switch budget is exhausted: the raw
        // 500s are mapped onto the default status map, not relayed verbatim.
        assert_eq!(json.status, 502);
        let body: serde_json::Value = serde_json::from_slice(&json.body).unwrap();
        assert_eq!(body["error"]["type"], "upstream_error");
        assert_eq!(body["error"]["message"], "Upstream service temporarily unavailable");
    }
}
