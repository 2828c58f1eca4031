use serde::{Deserialize, Serialize};

/// The wire shape a request or response is expressed in, independent of
/// which platform/account ultimately serves it. Anthropic and Gemini each
/// have one shape; OpenAI has two (`chat/completions` and `responses`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    ClaudeMessages,
    OpenAiChatCompletions,
    OpenAiResponses,
    GeminiGenerateContent,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::ClaudeMessages => "claude_messages",
            Family::OpenAiChatCompletions => "openai_chat_completions",
            Family::OpenAiResponses => "openai_responses",
            Family::GeminiGenerateContent => "gemini_generate_content",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
