use gate_common::Platform;
use serde_json::Value;

/// One entry of the static, embedded model catalog: the fallback `GET
/// .../models` serves from when there is no live upstream listing
/// endpoint wired up.
struct ModelCatalogEntry {
    platform: Platform,
    model: &'static str,
    owned_by: &'static str,
    context_window: u64,
    max_output_tokens: u64,
}

const STATIC_MODEL_CATALOG: &[ModelCatalogEntry] = &[
    ModelCatalogEntry {
        platform: Platform::Anthropic,
        model: "claude-opus-4",
        owned_by: "anthropic",
        context_window: 200_000,
        max_output_tokens: 32_000,
    },
    ModelCatalogEntry {
        platform: Platform::Anthropic,
        model: "claude-sonnet-4",
        owned_by: "anthropic",
        context_window: 200_000,
        max_output_tokens: 64_000,
    },
    ModelCatalogEntry {
        platform: Platform::OpenAI,
        model: "gpt-5.2",
        owned_by: "openai",
        context_window: 400_000,
        max_output_tokens: 128_000,
    },
    ModelCatalogEntry {
        platform: Platform::OpenAI,
        model: "gpt-5.2-mini",
        owned_by: "openai",
        context_window: 400_000,
        max_output_tokens: 128_000,
    },
    ModelCatalogEntry {
        platform: Platform::Copilot,
        model: "gpt-5.2",
        owned_by: "openai",
        context_window: 400_000,
        max_output_tokens: 128_000,
    },
    ModelCatalogEntry {
        platform: Platform::Gemini,
        model: "gemini-2.5-pro",
        owned_by: "google",
        context_window: 1_000_000,
        max_output_tokens: 65_536,
    },
    ModelCatalogEntry {
        platform: Platform::Gemini,
        model: "gemini-2.5-flash",
        owned_by: "google",
        context_window: 1_000_000,
        max_output_tokens: 65_536,
    },
];

/// Renders `GET .../models`'s `data` array, namespacing every id
/// `"<platform>/<model>"` and narrowing to `forced_platform` when the
/// caller addressed one via a path prefix.
pub fn list_models(forced_platform: Option<Platform>) -> Vec<Value> {
    STATIC_MODEL_CATALOG
        .iter()
        .filter(|entry| forced_platform.map(|p| p == entry.platform).unwrap_or(true))
        .map(|entry| {
            serde_json::json!({
                "id": format!("{}/{}", entry.platform, entry.model),
                "object": "model",
                "owned_by": entry.owned_by,
                "context_window": entry.context_window,
                "max_output_tokens": entry.max_output_tokens,
            })
        })
        .collect()
}

/// A local stand-in for the external token counter `count_tokens` is
/// documented as delegating to: roughly four characters per token, summed
/// over every string found in the request body. Good enough to unblock a
/// client budgeting a request; not a substitute for the real tokenizer.
pub fn estimate_tokens(body: &Value) -> u64 {
    let mut chars = 0u64;
    collect_chars(body, &mut chars);
    (chars / 4).max(if chars > 0 { 1 } else { 0 })
}

fn collect_chars(value: &Value, total: &mut u64) {
    match value {
        Value::String(s) => *total += s.chars().count() as u64,
        Value::Array(items) => items.iter().for_each(|v| collect_chars(v, total)),
        Value::Object(map) => map.values().for_each(|v| collect_chars(v, total)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_models_namespaces_ids_by_platform() {
        let all = list_models(None);
        assert!(all.iter().any(|m| m["id"] == "anthropic/claude-opus-4"));
        assert!(all.iter().any(|m| m["id"] == "openai/gpt-5.2"));
    }

    #[test]
    fn list_models_narrows_to_the_forced_platform() {
        let gemini_only = list_models(Some(Platform::Gemini));
        assert!(gemini_only.iter().all(|m| m["id"]
            .as_str()
            .unwrap()
            .starts_with("gemini/")));
        assert!(!gemini_only.is_empty());
    }

    #[test]
    fn estimate_tokens_scales_with_text_length() {
        let short = serde_json::json!({"messages": [{"role": "user", "content": "hi"}]});
        let long = serde_json::json!({"messages": [{"role": "user", "content": "hi".repeat(100)}]});
        assert!(estimate_tokens(&long) > estimate_tokens(&short));
    }

    #[test]
    fn estimate_tokens_of_empty_body_is_zero() {
        assert_eq!(estimate_tokens(&serde_json::json!({})), 0);
    }
}
