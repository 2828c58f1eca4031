use gate_protocol::{Family, WireRequest, WireResponse};
use serde_json::{Map, Value};

use crate::error::{TransformError, TransformResult};

/// A family-neutral view of a chat/completion request, used as the pivot
/// for translating between the four wire shapes instead of writing one
/// conversion function per ordered pair of families.
#[derive(Debug, Clone, Default)]
pub struct NeutralRequest {
    pub model: Option<String>,
    pub system: Option<String>,
    pub messages: Vec<NeutralMessage>,
    pub stream: bool,
    pub max_tokens: Option<u64>,
    pub temperature: Option<f64>,
    /// Fields this translation doesn't understand are kept so round-tripping
    /// through the same family is lossless, and so a target family that
    /// happens to accept the same field name still sees it.
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct NeutralMessage {
    pub role: String,
    pub text: String,
}

/// Translates one request body from `src`'s wire shape to `dst`'s.
/// A same-family request is returned unchanged.
pub fn translate_request(
    src: Family,
    dst: Family,
    request: &WireRequest,
) -> TransformResult<WireRequest> {
    if src == dst {
        return Ok(request.clone());
    }
    let neutral = to_neutral_request(src, request)?;
    let body = from_neutral_request(dst, &neutral);
    Ok(WireRequest::new(dst, body))
}

fn to_neutral_request(family: Family, request: &WireRequest) -> TransformResult<NeutralRequest> {
    let body = request.body.as_object().ok_or_else(|| TransformError::Malformed {
        family: family_name(family),
        message: "request body is not a JSON object".to_string(),
    })?;

    let mut neutral = NeutralRequest {
        model: body.get("model").and_then(Value::as_str).map(str::to_string),
        stream: body.get("stream").and_then(Value::as_bool).unwrap_or(false),
        max_tokens: body
            .get("max_tokens")
            .or_else(|| body.get("max_output_tokens"))
            .and_then(Value::as_u64),
        temperature: body.get("temperature").and_then(Value::as_f64),
        ..Default::default()
    };

    match family {
        Family::ClaudeMessages => {
            neutral.system = body.get("system").and_then(Value::as_str).map(str::to_string);
            neutral.messages = body
                .get("messages")
                .and_then(Value::as_array)
                .map(|msgs| msgs.iter().filter_map(message_from_claude).collect())
                .unwrap_or_default();
        }
        Family::OpenAiChatCompletions => {
            let all: Vec<NeutralMessage> = body
                .get("messages")
                .and_then(Value::as_array)
                .map(|msgs| msgs.iter().filter_map(message_from_openai_chat).collect())
                .unwrap_or_default();
            neutral.system = all
                .iter()
                .find(|m| m.role == "system")
                .map(|m| m.text.clone());
            neutral.messages = all.into_iter().filter(|m| m.role != "system").collect();
        }
        Family::OpenAiResponses => {
            neutral.system = body
                .get("instructions")
                .and_then(Value::as_str)
                .map(str::to_string);
            neutral.messages = body
                .get("input")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(message_from_openai_chat).collect())
                .unwrap_or_default();
        }
        Family::GeminiGenerateContent => {
            neutral.system = body
                .get("systemInstruction")
                .and_then(gemini_content_text);
            neutral.messages = body
                .get("contents")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(message_from_gemini).collect())
                .unwrap_or_default();
        }
    }

    for (key, value) in body {
        if !KNOWN_FIELDS.contains(&key.as_str()) {
            neutral.extra.insert(key.clone(), value.clone());
        }
    }
    Ok(neutral)
}

const KNOWN_FIELDS: &[&str] = &[
    "model", "stream", "max_tokens", "max_output_tokens", "temperature", "system", "messages",
    "input", "instructions", "systemInstruction", "contents",
];

fn from_neutral_request(family: Family, neutral: &NeutralRequest) -> Value {
    let mut body = Map::new();
    for (key, value) in &neutral.extra {
        body.insert(key.clone(), value.clone());
    }
    if let Some(model) = &neutral.model {
        body.insert("model".to_string(), Value::String(model.clone()));
    }
    if let Some(temperature) = neutral.temperature {
        body.insert("temperature".to_string(), serde_json::json!(temperature));
    }

    match family {
        Family::ClaudeMessages => {
            body.insert("stream".to_string(), Value::Bool(neutral.stream));
            if let Some(max_tokens) = neutral.max_tokens {
                body.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
            }
            if let Some(system) = &neutral.system {
                body.insert("system".to_string(), Value::String(system.clone()));
            }
            body.insert(
                "messages".to_string(),
                Value::Array(neutral.messages.iter().map(message_to_claude).collect()),
            );
        }
        Family::OpenAiChatCompletions => {
            body.insert("stream".to_string(), Value::Bool(neutral.stream));
            if let Some(max_tokens) = neutral.max_tokens {
                body.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
            }
            let mut messages = Vec::new();
            if let Some(system) = &neutral.system {
                messages.push(serde_json::json!({"role": "system", "content": system}));
            }
            messages.extend(neutral.messages.iter().map(message_to_openai_chat));
            body.insert("messages".to_string(), Value::Array(messages));
        }
        Family::OpenAiResponses => {
            if let Some(max_tokens) = neutral.max_tokens {
                body.insert("max_output_tokens".to_string(), serde_json::json!(max_tokens));
            }
            if let Some(system) = &neutral.system {
                body.insert("instructions".to_string(), Value::String(system.clone()));
            }
            body.insert(
                "input".to_string(),
                Value::Array(neutral.messages.iter().map(message_to_openai_chat).collect()),
            );
        }
        Family::GeminiGenerateContent => {
            if let Some(system) = &neutral.system {
                body.insert(
                    "systemInstruction".to_string(),
                    serde_json::json!({"parts": [{"text": system}]}),
                );
            }
            body.insert(
                "contents".to_string(),
                Value::Array(neutral.messages.iter().map(message_to_gemini).collect()),
            );
        }
    }
    Value::Object(body)
}

fn message_from_claude(value: &Value) -> Option<NeutralMessage> {
    let role = value.get("role")?.as_str()?.to_string();
    let text = flatten_content(value.get("content")?);
    Some(NeutralMessage { role, text })
}

fn message_from_openai_chat(value: &Value) -> Option<NeutralMessage> {
    let role = value.get("role")?.as_str()?.to_string();
    let text = match value.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(content) => flatten_content(content),
        None => String::new(),
    };
    Some(NeutralMessage { role, text })
}

fn message_from_gemini(value: &Value) -> Option<NeutralMessage> {
    let role = match value.get("role").and_then(Value::as_str) {
        Some("model") => "assistant",
        Some(other) => other,
        None => "user",
    }
    .to_string();
    let text = gemini_content_text(value).unwrap_or_default();
    Some(NeutralMessage { role, text })
}

fn gemini_content_text(value: &Value) -> Option<String> {
    let parts = value.get("parts")?.as_array()?;
    Some(
        parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
    )
}

fn flatten_content(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

fn message_to_claude(message: &NeutralMessage) -> Value {
    serde_json::json!({
        "role": message.role,
        "content": [{"type": "text", "text": message.text}],
    })
}

fn message_to_openai_chat(message: &NeutralMessage) -> Value {
    serde_json::json!({"role": message.role, "content": message.text})
}

fn message_to_gemini(message: &NeutralMessage) -> Value {
    let role = if message.role == "assistant" {
        "model"
    } else {
        "user"
    };
    serde_json::json!({"role": role, "parts": [{"text": message.text}]})
}

/// Translates one non-stream response body from `src` to `dst`. Only the
/// fields the Usage Recorder and caller actually need (text, usage) survive
/// the round trip; anything else is dropped rather than guessed at.
pub fn translate_response(
    src: Family,
    dst: Family,
    response: &WireResponse,
) -> TransformResult<WireResponse> {
    if src == dst {
        return Ok(response.clone());
    }
    let text = response_text(src, &response.body);
    let usage = response.usage_tokens();
    let body = build_response(dst, &text, usage);
    Ok(WireResponse::new(dst, body))
}

fn response_text(family: Family, body: &Value) -> String {
    match family {
        Family::ClaudeMessages => body
            .get("content")
            .map(flatten_content)
            .unwrap_or_default(),
        Family::OpenAiChatCompletions => body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Family::OpenAiResponses => body
            .get("output_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Family::GeminiGenerateContent => body
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(gemini_content_text)
            .unwrap_or_default(),
    }
}

fn build_response(family: Family, text: &str, usage: Option<(u64, u64)>) -> Value {
    let (input_tokens, output_tokens) = usage.unwrap_or((0, 0));
    match family {
        Family::ClaudeMessages => serde_json::json!({
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens},
        }),
        Family::OpenAiChatCompletions => serde_json::json!({
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
            "usage": {
                "prompt_tokens": input_tokens,
                "completion_tokens": output_tokens,
                "total_tokens": input_tokens + output_tokens,
            },
        }),
        Family::OpenAiResponses => serde_json::json!({
            "object": "response",
            "output_text": text,
            "usage": {
                "input_tokens": input_tokens,
                "output_tokens": output_tokens,
                "total_tokens": input_tokens + output_tokens,
            },
        }),
        Family::GeminiGenerateContent => serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}],
            "usageMetadata": {
                "promptTokenCount": input_tokens,
                "candidatesTokenCount": output_tokens,
                "totalTokenCount": input_tokens + output_tokens,
            },
        }),
    }
}

fn family_name(family: Family) -> &'static str {
    family.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_family_request_passes_through_unchanged() {
        let req = WireRequest::new(
            Family::ClaudeMessages,
            serde_json::json!({"model": "claude-3", "messages": []}),
        );
        let out = translate_request(Family::ClaudeMessages, Family::ClaudeMessages, &req).unwrap();
        assert_eq!(out.body, req.body);
    }

    #[test]
    fn claude_to_openai_chat_preserves_system_and_messages() {
        let req = WireRequest::new(
            Family::ClaudeMessages,
            serde_json::json!({
                "model": "claude-3",
                "system": "be terse",
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}],
                "stream": false,
            }),
        );
        let out = translate_request(Family::ClaudeMessages, Family::OpenAiChatCompletions, &req)
            .unwrap();
        let messages = out.body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "be terse");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "hi");
    }

    #[test]
    fn gemini_roundtrip_maps_assistant_to_model() {
        let req = WireRequest::new(
            Family::OpenAiChatCompletions,
            serde_json::json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                ],
            }),
        );
        let out = translate_request(Family::OpenAiChatCompletions, Family::GeminiGenerateContent, &req)
            .unwrap();
        let contents = out.body["contents"].as_array().unwrap();
        assert_eq!(contents[1]["role"], "model");
    }

    #[test]
    fn response_usage_is_renormalized_across_families() {
        let resp = WireResponse::new(
            Family::ClaudeMessages,
            serde_json::json!({
                "content": [{"type": "text", "text": "hi there"}],
                "usage": {"input_tokens": 3, "output_tokens": 2},
            }),
        );
        let out = translate_response(Family::ClaudeMessages, Family::OpenAiChatCompletions, &resp)
            .unwrap();
        assert_eq!(out.body["usage"]["prompt_tokens"], 3);
        assert_eq!(out.body["usage"]["completion_tokens"], 2);
        assert_eq!(out.body["choices"][0]["message"]["content"], "hi there");
    }
}
