use serde::{Deserialize, Serialize};

/// The upstream provider family a group/account speaks.
///
/// `Copilot`, `Aggregator` and `Antigravity` are distinct billing/ops
/// postures but speak one of the two wire families at the protocol level
/// (handled by `gate-transform::Family`); this enum tracks the
/// operator-facing platform, not the wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Anthropic,
    OpenAI,
    Copilot,
    Aggregator,
    Gemini,
    Antigravity,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Anthropic => "anthropic",
            Platform::OpenAI => "openai",
            Platform::Copilot => "copilot",
            Platform::Aggregator => "aggregator",
            Platform::Gemini => "gemini",
            Platform::Antigravity => "antigravity",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "anthropic" => Some(Platform::Anthropic),
            "openai" => Some(Platform::OpenAI),
            "copilot" => Some(Platform::Copilot),
            "aggregator" => Some(Platform::Aggregator),
            "gemini" => Some(Platform::Gemini),
            "antigravity" => Some(Platform::Antigravity),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
