//! The LLM adapter collaborator interface.
//!
//! Out of scope per §1: the HTTP client and wire format for any particular
//! vendor. In scope: the opaque `chat` contract every Worker calls through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::duration::DurationMs;
use crate::error::AdapterError;
use crate::message::{Message, Usage};

/// Which of the two configured models a call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSize {
    /// `config.model_large` — the root turn and, by default, sub-calls that
    /// don't explicitly ask for a smaller model.
    Large,
    /// `config.model_small` — cheaper sub-calls (e.g. leaf queries deep in
    /// a recursion tree).
    Small,
}

/// Per-call options that can override the adapter's defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Overrides `config.llm_timeout` for this call only.
    pub timeout: Option<DurationMs>,
}

/// Opaque interface to a vendor LLM: `chat(messages, model, opts) ->
/// (text, usage) | error`.
///
/// Implementations own retries, streaming, and wire-format concerns; the
/// engine only ever sees a finished text reply and a usage summary.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Send a chat completion request and await the full text reply.
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        opts: ChatOptions,
    ) -> Result<(String, Usage), AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn LlmAdapter) {}

    #[test]
    fn model_size_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&ModelSize::Large).unwrap(), "\"large\"");
        assert_eq!(serde_json::to_string(&ModelSize::Small).unwrap(), "\"small\"");
    }
}
