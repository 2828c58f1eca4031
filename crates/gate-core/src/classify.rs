use bytes::Bytes;
use gate_common::{GatewayError, Platform};
use gate_protocol::{Family, WireRequest};
use http::Method;
use serde_json::Value;

use crate::error::ProxyError;

/// The outcome of the Ingress/Request Classifier stage: the wire family the
/// request arrived in, its parsed (and possibly namespace-stripped) body,
/// whether the caller asked for a streamed response, and any platform the
/// request named explicitly.
#[derive(Debug, Clone)]
pub struct ClassifiedRequest {
    pub family: Family,
    pub wire: WireRequest,
    pub is_stream: bool,
    /// Set when the request pinned a platform — via a `<platform>/v1/...`
    /// path prefix or a `<platform>/model` namespace prefix on the model
    /// field — so the Account Selector only considers accounts on it.
    pub forced_platform: Option<Platform>,
}

pub fn classify_request(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: Bytes,
    max_body_bytes: usize,
) -> Result<ClassifiedRequest, ProxyError> {
    if method != Method::POST {
        return Err(ProxyError::method_not_allowed("only POST is accepted on this path"));
    }

    if body.len() > max_body_bytes {
        return Err(ProxyError::from_gateway_error(&GatewayError::invalid_request(format!(
            "request body exceeds the {max_body_bytes}-byte limit"
        ))));
    }

    let trimmed = path.trim_start_matches('/');
    let mut segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

    let mut forced_platform = segments.first().copied().and_then(Platform::parse);
    if forced_platform.is_some() {
        segments.remove(0);
    }

    let family = match segments.as_slice() {
        ["v1", "messages"] => Family::ClaudeMessages,
        ["v1", "chat", "completions"] => Family::OpenAiChatCompletions,
        ["v1", "responses"] => Family::OpenAiResponses,
        ["v1beta", "models", rest] if rest.contains("generateContent") => {
            Family::GeminiGenerateContent
        }
        _ => return Err(ProxyError::not_found("unknown request path")),
    };

    let url_stream_hint = segments
        .last()
        .map(|s| s.contains("streamGenerateContent"))
        .filter(|_| family == Family::GeminiGenerateContent)
        .or_else(|| query.map(|q| q.split('&').any(|pair| pair == "alt=sse")));

    let mut value: Value = serde_json::from_slice(&body)
        .map_err(|_| ProxyError::bad_request("request body is not valid json"))?;

    if family == Family::GeminiGenerateContent {
        // Gemini carries its model in the URL, not the body; lift it in so
        // the rest of the pipeline can read `model()` the same way for
        // every family.
        if let Some(rest) = segments.last() {
            let model_name = rest.split(':').next().unwrap_or(rest);
            if let Value::Object(map) = &mut value {
                map.insert("model".to_string(), Value::String(model_name.to_string()));
            }
        }
    } else {
        let model = value
            .get("model")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ProxyError::bad_request("model is required"))?
            .to_string();

        if let Some((prefix, rest)) = model.split_once('/') {
            if let Some(platform) = Platform::parse(prefix) {
                if let Value::Object(map) = &mut value {
                    map.insert("model".to_string(), Value::String(rest.to_string()));
                }
                forced_platform = forced_platform.or(Some(platform));
            }
        }
    }

    let wire = WireRequest { family, body: value };
    if family == Family::OpenAiResponses {
        validate_function_call_outputs(&wire.body)?;
    }

    let is_stream = wire.wants_stream(url_stream_hint);

    Ok(ClassifiedRequest {
        family,
        wire,
        is_stream,
        forced_platform,
    })
}

/// Every `function_call_output` entry in a `/v1/responses` body must be
/// resolvable by the upstream: either the whole request carries a
/// `previous_response_id` to resume from, or each output names a
/// `call_id` that a `tool_call`/`function_call`/`item_reference` entry in
/// the same `input` array accounts for. Rejecting here, before scheduling,
/// avoids burning an upstream account slot on a request the upstream would
/// certainly reject anyway.
fn validate_function_call_outputs(body: &Value) -> Result<(), ProxyError> {
    let Some(input) = body.get("input").and_then(Value::as_array) else {
        return Ok(());
    };

    let has_previous_response_id = body
        .get("previous_response_id")
        .and_then(Value::as_str)
        .map(|s| !s.is_empty())
        .unwrap_or(false);
    if has_previous_response_id {
        return Ok(());
    }

    for item in input {
        if item.get("type").and_then(Value::as_str) != Some("function_call_output") {
            continue;
        }
        let Some(call_id) = item.get("call_id").and_then(Value::as_str) else {
            return Err(ProxyError::bad_request(
                "function_call_output is missing call_id",
            ));
        };

        let satisfied = input.iter().any(|other| {
            match other.get("type").and_then(Value::as_str) {
                Some("function_call") | Some("tool_call") => {
                    other.get("call_id").and_then(Value::as_str) == Some(call_id)
                }
                Some("item_reference") => other.get("id").and_then(Value::as_str) == Some(call_id),
                _ => false,
            }
        });
        if !satisfied {
            return Err(ProxyError::bad_request(
                "function_call_output has no matching tool_call/function_call or item_reference",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_BODY: usize = 10 * 1024 * 1024;

    #[test]
    fn claude_messages_path_classifies_as_claude_family() {
        let body = Bytes::from_static(br#"{"model":"claude-3","stream":true}"#);
        let classified =
            classify_request(&Method::POST, "/v1/messages", None, body, MAX_BODY).unwrap();
        assert_eq!(classified.family, Family::ClaudeMessages);
        assert!(classified.is_stream);
        assert!(classified.forced_platform.is_none());
    }

    #[test]
    fn gemini_stream_path_suffix_marks_the_request_as_streaming() {
        let body = Bytes::from_static(br#"{"contents":[]}"#);
        let classified = classify_request(
            &Method::POST,
            "/v1beta/models/gemini-pro:streamGenerateContent",
            None,
            body,
            MAX_BODY,
        )
        .unwrap();
        assert_eq!(classified.family, Family::GeminiGenerateContent);
        assert!(classified.is_stream);
        assert_eq!(classified.wire.model(), Some("gemini-pro"));
    }

    #[test]
    fn unknown_path_is_not_found() {
        let body = Bytes::from_static(b"{}");
        let err =
            classify_request(&Method::POST, "/v2/unknown", None, body, MAX_BODY).unwrap_err();
        assert_eq!(err.status, http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn non_post_method_is_rejected() {
        let body = Bytes::from_static(b"{}");
        let err =
            classify_request(&Method::GET, "/v1/messages", None, body, MAX_BODY).unwrap_err();
        assert_eq!(err.status, http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn body_larger_than_the_limit_is_rejected_before_parsing() {
        let body = Bytes::from(vec![b'a'; 16]);
        let err = classify_request(&Method::POST, "/v1/messages", None, body, 8).unwrap_err();
        assert_eq!(err.status, http::StatusCode::BAD_REQUEST);
        let parsed: serde_json::Value = serde_json::from_slice(&err.body).unwrap();
        assert_eq!(parsed["error"]["type"], "invalid_request_error");
        assert!(parsed["error"]["message"].as_str().unwrap().contains("8-byte"));
    }

    #[test]
    fn missing_model_is_rejected_as_invalid_request() {
        let body = Bytes::from_static(br#"{"messages":[]}"#);
        let err =
            classify_request(&Method::POST, "/v1/messages", None, body, MAX_BODY).unwrap_err();
        assert_eq!(err.status, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn namespaced_model_strips_the_platform_prefix_and_sets_forced_platform() {
        let body = Bytes::from_static(br#"{"model":"openai/gpt-5.2","messages":[]}"#);
        let classified = classify_request(
            &Method::POST,
            "/v1/chat/completions",
            None,
            body,
            MAX_BODY,
        )
        .unwrap();
        assert_eq!(classified.wire.model(), Some("gpt-5.2"));
        assert_eq!(classified.forced_platform, Some(Platform::OpenAI));
    }

    #[test]
    fn platform_prefixed_path_sets_forced_platform_without_touching_the_model() {
        let body = Bytes::from_static(br#"{"model":"claude-3","messages":[]}"#);
        let classified =
            classify_request(&Method::POST, "/anthropic/v1/messages", None, body, MAX_BODY)
                .unwrap();
        assert_eq!(classified.family, Family::ClaudeMessages);
        assert_eq!(classified.forced_platform, Some(Platform::Anthropic));
        assert_eq!(classified.wire.model(), Some("claude-3"));
    }

    #[test]
    fn responses_function_call_output_without_a_matching_call_is_rejected() {
        let body = Bytes::from_static(
            br#"{"model":"gpt-5.2","input":[{"type":"function_call_output","call_id":"c1","output":"42"}]}"#,
        );
        let err =
            classify_request(&Method::POST, "/v1/responses", None, body, MAX_BODY).unwrap_err();
        assert_eq!(err.status, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn responses_function_call_output_with_a_matching_tool_call_is_accepted() {
        let body = Bytes::from_static(
            br#"{"model":"gpt-5.2","input":[
                {"type":"function_call","call_id":"c1","name":"lookup"},
                {"type":"function_call_output","call_id":"c1","output":"42"}
            ]}"#,
        );
        let classified =
            classify_request(&Method::POST, "/v1/responses", None, body, MAX_BODY).unwrap();
        assert_eq!(classified.family, Family::OpenAiResponses);
    }

    #[test]
    fn responses_function_call_output_with_a_previous_response_id_is_accepted() {
        let body = Bytes::from_static(
            br#"{"model":"gpt-5.2","previous_response_id":"resp_1","input":[
                {"type":"function_call_output","call_id":"c1","output":"42"}
            ]}"#,
        );
        let classified =
            classify_request(&Method::POST, "/v1/responses", None, body, MAX_BODY).unwrap();
        assert_eq!(classified.family, Family::OpenAiResponses);
    }
}
