use serde_json::Value;

use crate::family::Family;

/// A request body in its native wire shape, kept as JSON rather than a
/// fully-typed struct per operation: the Protocol Adapter only needs to
/// read/rewrite a handful of well-known fields and pass the rest through
/// untouched, and a generic document does that without a 1:1 struct per
/// platform/operation pair.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub family: Family,
    pub body: Value,
}

impl WireRequest {
    pub fn new(family: Family, body: Value) -> Self {
        Self { family, body }
    }

    /// The model identifier as the caller named it, before any account's
    /// model-mapping table is applied.
    pub fn model(&self) -> Option<&str> {
        self.body.get("model").and_then(Value::as_str)
    }

    pub fn set_model(&mut self, model: &str) {
        if let Value::Object(map) = &mut self.body {
            map.insert("model".to_string(), Value::String(model.to_string()));
        }
    }

    /// Whether the caller asked for a streamed response. Gemini encodes this
    /// in the URL (`:streamGenerateContent`) rather than the body, so ingress
    /// passes the URL-derived flag in separately for that family.
    pub fn wants_stream(&self, url_stream_hint: Option<bool>) -> bool {
        match self.family {
            Family::GeminiGenerateContent => url_stream_hint.unwrap_or(false),
            _ => self
                .body
                .get("stream")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    pub fn session_hash_seed(&self) -> String {
        match self.family {
            Family::ClaudeMessages | Family::OpenAiChatCompletions => self
                .body
                .get("messages")
                .map(|m| m.to_string())
                .unwrap_or_default(),
            Family::OpenAiResponses => self
                .body
                .get("input")
                .map(|m| m.to_string())
                .unwrap_or_default(),
            Family::GeminiGenerateContent => self
                .body
                .get("contents")
                .map(|m| m.to_string())
                .unwrap_or_default(),
        }
    }
}

/// A response body in its native wire shape, produced by the Protocol
/// Adapter on the way back out to the caller.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub family: Family,
    pub body: Value,
}

impl WireResponse {
    pub fn new(family: Family, body: Value) -> Self {
        Self { family, body }
    }

    pub fn usage_tokens(&self) -> Option<(u64, u64)> {
        match self.family {
            Family::ClaudeMessages => {
                let usage = self.body.get("usage")?;
                let input = usage.get("input_tokens")?.as_u64()?;
                let output = usage.get("output_tokens")?.as_u64()?;
                Some((input, output))
            }
            Family::OpenAiChatCompletions | Family::OpenAiResponses => {
                let usage = self.body.get("usage")?;
                let input = usage
                    .get("prompt_tokens")
                    .or_else(|| usage.get("input_tokens"))?
                    .as_u64()?;
                let output = usage
                    .get("completion_tokens")
                    .or_else(|| usage.get("output_tokens"))?
                    .as_u64()?;
                Some((input, output))
            }
            Family::GeminiGenerateContent => {
                let usage = self.body.get("usageMetadata")?;
                let input = usage.get("promptTokenCount")?.as_u64()?;
                let output = usage.get("candidatesTokenCount")?.as_u64()?;
                Some((input, output))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_and_stream_read_from_claude_body() {
        let req = WireRequest::new(
            Family::ClaudeMessages,
            serde_json::json!({"model": "claude-3", "stream": true, "messages": []}),
        );
        assert_eq!(req.model(), Some("claude-3"));
        assert!(req.wants_stream(None));
    }

    #[test]
    fn gemini_stream_comes_from_url_hint_not_body() {
        let req = WireRequest::new(
            Family::GeminiGenerateContent,
            serde_json::json!({"contents": []}),
        );
        assert!(!req.wants_stream(None));
        assert!(req.wants_stream(Some(true)));
    }

    #[test]
    fn set_model_rewrites_in_place() {
        let mut req = WireRequest::new(
            Family::OpenAiChatCompletions,
            serde_json::json!({"model": "gpt-4o", "messages": []}),
        );
        req.set_model("gpt-4o-mini");
        assert_eq!(req.model(), Some("gpt-4o-mini"));
    }

    #[test]
    fn usage_tokens_normalizes_claude_and_openai_field_names() {
        let claude = WireResponse::new(
            Family::ClaudeMessages,
            serde_json::json!({"usage": {"input_tokens": 10, "output_tokens": 5}}),
        );
        assert_eq!(claude.usage_tokens(), Some((10, 5)));

        let openai = WireResponse::new(
            Family::OpenAiChatCompletions,
            serde_json::json!({"usage": {"prompt_tokens": 10, "completion_tokens": 5}}),
        );
        assert_eq!(openai.usage_tokens(), Some((10, 5)));
    }
}
