use gate_protocol::{Family, SseEvent};
use serde_json::Value;

use crate::id_tracker::IdTracker;

/// One normalized increment extracted from a source family's stream event:
/// either a chunk of assistant text, a usage update, or stream completion.
/// Every family's stream shape reduces to this before being re-encoded in
/// the target family's shape.
enum StreamDelta {
    Text(String),
    Usage { input_tokens: u64, output_tokens: u64 },
    Done,
    /// An event carrying nothing translatable (ping, unrecognized type);
    /// passed through as a target-family comment-equivalent rather than
    /// silently dropped, so keep-alive cadence survives translation.
    Ignore,
}

/// Stateful per-request translator between two stream families. Not
/// `Clone`: `content_index`/the `IdTracker` are mutated incrementally as
/// events pass through, mirroring one stream's lifetime exactly.
pub struct StreamTranslator {
    src: Family,
    dst: Family,
    ids: IdTracker,
    content_index: u32,
    started: bool,
    done_sent: bool,
}

impl StreamTranslator {
    pub fn new(src: Family, dst: Family) -> Self {
        Self {
            src,
            dst,
            ids: IdTracker::new(),
            content_index: 0,
            started: false,
            done_sent: false,
        }
    }

    /// Feeds one upstream SSE event and returns zero or more downstream
    /// events. Same-family pairs are handled by the caller via passthrough
    /// before this is ever constructed.
    pub fn push(&mut self, event: &SseEvent) -> Vec<SseEvent> {
        let delta = self.extract(event);
        match delta {
            StreamDelta::Ignore => Vec::new(),
            StreamDelta::Text(text) => vec![self.encode_text(text)],
            StreamDelta::Usage {
                input_tokens,
                output_tokens,
            } => vec![self.encode_usage(input_tokens, output_tokens)],
            StreamDelta::Done => {
                if self.done_sent {
                    Vec::new()
                } else {
                    self.done_sent = true;
                    vec![self.encode_done()]
                }
            }
        }
    }

    fn extract(&mut self, event: &SseEvent) -> StreamDelta {
        let Ok(body) = serde_json::from_str::<Value>(&event.data) else {
            return StreamDelta::Ignore;
        };
        match self.src {
            Family::ClaudeMessages => match event.event.as_deref() {
                Some("content_block_delta") => body
                    .get("delta")
                    .and_then(|d| d.get("text"))
                    .and_then(Value::as_str)
                    .map(|t| StreamDelta::Text(t.to_string()))
                    .unwrap_or(StreamDelta::Ignore),
                Some("message_delta") => body
                    .get("usage")
                    .and_then(|u| {
                        let input = u.get("input_tokens")?.as_u64()?;
                        let output = u.get("output_tokens")?.as_u64()?;
                        Some(StreamDelta::Usage {
                            input_tokens: input,
                            output_tokens: output,
                        })
                    })
                    .unwrap_or(StreamDelta::Ignore),
                Some("message_stop") => StreamDelta::Done,
                _ => StreamDelta::Ignore,
            },
            Family::OpenAiChatCompletions => {
                if let Some(choice) = body.get("choices").and_then(|c| c.get(0)) {
                    if let Some(text) = choice
                        .get("delta")
                        .and_then(|d| d.get("content"))
                        .and_then(Value::as_str)
                    {
                        return StreamDelta::Text(text.to_string());
                    }
                    if choice.get("finish_reason").and_then(Value::as_str).is_some() {
                        return StreamDelta::Done;
                    }
                }
                if let Some(usage) = body.get("usage") {
                    if let (Some(input), Some(output)) = (
                        usage.get("prompt_tokens").and_then(Value::as_u64),
                        usage.get("completion_tokens").and_then(Value::as_u64),
                    ) {
                        return StreamDelta::Usage {
                            input_tokens: input,
                            output_tokens: output,
                        };
                    }
                }
                StreamDelta::Ignore
            }
            Family::OpenAiResponses => match event.event.as_deref() {
                Some("response.output_text.delta") => body
                    .get("delta")
                    .and_then(Value::as_str)
                    .map(|t| StreamDelta::Text(t.to_string()))
                    .unwrap_or(StreamDelta::Ignore),
                Some("response.completed") => body
                    .get("response")
                    .and_then(|r| r.get("usage"))
                    .and_then(|u| {
                        let input = u.get("input_tokens")?.as_u64()?;
                        let output = u.get("output_tokens")?.as_u64()?;
                        Some(StreamDelta::Usage {
                            input_tokens: input,
                            output_tokens: output,
                        })
                    })
                    .map(|delta| {
                        self.done_sent = false;
                        delta
                    })
                    .unwrap_or(StreamDelta::Done),
                _ => StreamDelta::Ignore,
            },
            Family::GeminiGenerateContent => {
                let text = body
                    .get("candidates")
                    .and_then(|c| c.get(0))
                    .and_then(|c| c.get("content"))
                    .and_then(|c| c.get("parts"))
                    .and_then(Value::as_array)
                    .and_then(|parts| parts.first())
                    .and_then(|p| p.get("text"))
                    .and_then(Value::as_str);
                if let Some(text) = text {
                    return StreamDelta::Text(text.to_string());
                }
                if let Some(usage) = body.get("usageMetadata") {
                    if let (Some(input), Some(output)) = (
                        usage.get("promptTokenCount").and_then(Value::as_u64),
                        usage.get("candidatesTokenCount").and_then(Value::as_u64),
                    ) {
                        return StreamDelta::Usage {
                            input_tokens: input,
                            output_tokens: output,
                        };
                    }
                }
                StreamDelta::Ignore
            }
        }
    }

    fn encode_text(&mut self, text: String) -> SseEvent {
        match self.dst {
            Family::ClaudeMessages => SseEvent {
                event: Some("content_block_delta".to_string()),
                id: None,
                data: serde_json::json!({
                    "type": "content_block_delta",
                    "index": self.content_index,
                    "delta": {"type": "text_delta", "text": text},
                })
                .to_string(),
            },
            Family::OpenAiChatCompletions => SseEvent {
                event: None,
                id: None,
                data: serde_json::json!({
                    "object": "chat.completion.chunk",
                    "choices": [{"index": 0, "delta": {"content": text}}],
                })
                .to_string(),
            },
            Family::OpenAiResponses => {
                let first = !self.started;
                self.started = true;
                let item_id = if first {
                    self.ids.assign(self.content_index)
                } else {
                    self.ids.resolve(self.content_index)
                };
                SseEvent {
                    event: Some("response.output_text.delta".to_string()),
                    id: None,
                    data: serde_json::json!({
                        "type": "response.output_text.delta",
                        "item_id": item_id,
                        "delta": text,
                    })
                    .to_string(),
                }
            }
            Family::GeminiGenerateContent => SseEvent {
                event: None,
                id: None,
                data: serde_json::json!({
                    "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}],
                })
                .to_string(),
            },
        }
    }

    fn encode_usage(&self, input_tokens: u64, output_tokens: u64) -> SseEvent {
        match self.dst {
            Family::ClaudeMessages => SseEvent {
                event: Some("message_delta".to_string()),
                id: None,
                data: serde_json::json!({
                    "type": "message_delta",
                    "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens},
                })
                .to_string(),
            },
            Family::OpenAiChatCompletions => SseEvent {
                event: None,
                id: None,
                data: serde_json::json!({
                    "object": "chat.completion.chunk",
                    "choices": [],
                    "usage": {
                        "prompt_tokens": input_tokens,
                        "completion_tokens": output_tokens,
                        "total_tokens": input_tokens + output_tokens,
                    },
                })
                .to_string(),
            },
            Family::OpenAiResponses => SseEvent {
                event: Some("response.completed".to_string()),
                id: None,
                data: serde_json::json!({
                    "type": "response.completed",
                    "response": {
                        "usage": {"input_tokens": input_tokens, "output_tokens": output_tokens},
                    },
                })
                .to_string(),
            },
            Family::GeminiGenerateContent => SseEvent {
                event: None,
                id: None,
                data: serde_json::json!({
                    "usageMetadata": {
                        "promptTokenCount": input_tokens,
                        "candidatesTokenCount": output_tokens,
                        "totalTokenCount": input_tokens + output_tokens,
                    },
                })
                .to_string(),
            },
        }
    }

    fn encode_done(&self) -> SseEvent {
        match self.dst {
            Family::ClaudeMessages => SseEvent {
                event: Some("message_stop".to_string()),
                id: None,
                data: serde_json::json!({"type": "message_stop"}).to_string(),
            },
            Family::OpenAiChatCompletions => SseEvent {
                event: None,
                id: None,
                data: "[DONE]".to_string(),
            },
            Family::OpenAiResponses => SseEvent {
                event: Some("response.completed".to_string()),
                id: None,
                data: serde_json::json!({"type": "response.completed", "response": {}}).to_string(),
            },
            Family::GeminiGenerateContent => SseEvent {
                event: None,
                id: None,
                data: serde_json::json!({"candidates": [{"finishReason": "STOP"}]}).to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claude_delta(text: &str) -> SseEvent {
        SseEvent {
            event: Some("content_block_delta".to_string()),
            id: None,
            data: serde_json::json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": {"type": "text_delta", "text": text},
            })
            .to_string(),
        }
    }

    #[test]
    fn claude_text_delta_becomes_openai_chat_chunk() {
        let mut translator = StreamTranslator::new(Family::ClaudeMessages, Family::OpenAiChatCompletions);
        let out = translator.push(&claude_delta("hi"));
        assert_eq!(out.len(), 1);
        let body: Value = serde_json::from_str(&out[0].data).unwrap();
        assert_eq!(body["choices"][0]["delta"]["content"], "hi");
    }

    #[test]
    fn claude_message_stop_becomes_openai_done_marker() {
        let mut translator = StreamTranslator::new(Family::ClaudeMessages, Family::OpenAiChatCompletions);
        let stop = SseEvent {
            event: Some("message_stop".to_string()),
            id: None,
            data: "{}".to_string(),
        };
        let out = translator.push(&stop);
        assert_eq!(out[0].data, "[DONE]");
    }

    #[test]
    fn done_is_emitted_only_once() {
        let mut translator = StreamTranslator::new(Family::ClaudeMessages, Family::OpenAiChatCompletions);
        let stop = SseEvent {
            event: Some("message_stop".to_string()),
            id: None,
            data: "{}".to_string(),
        };
        assert_eq!(translator.push(&stop).len(), 1);
        assert_eq!(translator.push(&stop).len(), 0);
    }

    #[test]
    fn openai_responses_text_deltas_reuse_the_same_item_id() {
        let mut translator = StreamTranslator::new(Family::ClaudeMessages, Family::OpenAiResponses);
        let first = translator.push(&claude_delta("a"));
        let second = translator.push(&claude_delta("b"));
        let first_body: Value = serde_json::from_str(&first[0].data).unwrap();
        let second_body: Value = serde_json::from_str(&second[0].data).unwrap();
        assert_eq!(first_body["item_id"], second_body["item_id"]);
    }
}
