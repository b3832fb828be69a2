//! Chat message history carried by a Worker.

use serde::{Deserialize, Serialize};

/// The role of a chat message's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The engine's system prompt.
    System,
    /// The environment message synthesized each iteration (bindings digest,
    /// stdout, query) and the caller's turn-starting message.
    User,
    /// The LLM's structured `{reasoning, code}` reply.
    Assistant,
}

/// One entry in a Worker's message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who said it.
    pub role: Role,
    /// The rendered text of the message.
    pub text: String,
}

impl Message {
    /// Construct a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, text: text.into() }
    }

    /// Construct a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    /// Construct an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}

/// Token usage reported by a single LLM call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: u64,
    /// Tokens in the completion.
    pub completion_tokens: u64,
    /// Tokens written to a prompt cache, if the vendor reports it.
    pub cache_creation_input_tokens: Option<u64>,
    /// Tokens read from a prompt cache, if the vendor reports it.
    pub cache_read_input_tokens: Option<u64>,
}

impl Usage {
    /// Sum of prompt and completion tokens.
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A structured `{reasoning, code}` reply parsed out of raw LLM text.
///
/// Per §9's "structured LLM replies" design note: a non-JSON reply is not a
/// hard failure, it is treated as `{reasoning: raw, code: ""}` so that the
/// turn still advances via the environment feedback loop on the next
/// iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmReply {
    /// The model's reasoning text, shown to the user and appended to history.
    pub reasoning: String,
    /// The code snippet to hand to the Evaluator. Empty if parsing failed
    /// or the model chose not to emit code this iteration.
    pub code: String,
}

impl LlmReply {
    /// Parse a raw LLM completion as `{"reasoning": ..., "code": ...}`.
    ///
    /// Never fails: a non-JSON or wrongly-shaped reply becomes
    /// `{reasoning: raw, code: ""}`.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<RawReply>(raw) {
            Ok(parsed) => Self { reasoning: parsed.reasoning, code: parsed.code },
            Err(_) => Self { reasoning: raw.to_string(), code: String::new() },
        }
    }
}

#[derive(Deserialize)]
struct RawReply {
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    code: String,
}
