//! `RlmConfig` — the single layered configuration object every entry point
//! (the umbrella `Rlm` handle, the Run supervisor, each Worker) is built
//! from. Mirrors the teacher's "every field optional, caller overrides
//! defaults" convention: construct with [`RlmConfig::default`], then
//! override individual fields, or layer environment overrides on top with
//! [`RlmConfig::from_env`].

use serde::{Deserialize, Serialize};

use crate::duration::DurationMs;

/// Default per-turn iteration cap (§6).
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
/// Default sub-call nesting cap (§6).
pub const DEFAULT_MAX_DEPTH: u32 = 3;
/// Default in-flight children per Worker (§6).
pub const DEFAULT_MAX_CONCURRENT_SUBCALLS: u32 = 4;
/// Default per-iteration eval timeout, in milliseconds (§6).
pub const DEFAULT_EVAL_TIMEOUT_MS: u64 = 300_000;
/// Default per-LLM-call timeout, in milliseconds. The spec calls this
/// "vendor-dependent"; this repo picks a conservative finite default so a
/// hung adapter call cannot wedge a Worker forever.
pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 120_000;
/// Default stdout truncation limit, in bytes (§4.2's "Prompt digest
/// discipline").
pub const DEFAULT_STDOUT_LIMIT_BYTES: usize = 50_000;
/// Default per-binding preview length, in bytes, used when rendering the
/// bindings digest into a prompt.
pub const DEFAULT_BINDING_PREVIEW_BYTES: usize = 200;

/// Layered runtime configuration for the RLM engine.
///
/// Every field has a sensible default (see the `DEFAULT_*` constants in
/// this module); callers override only what they need.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RlmConfig {
    /// Model identifier used for "large" sub-calls and the root turn.
    pub model_large: String,
    /// Model identifier used for "small" sub-calls.
    pub model_small: String,
    /// Per-turn iteration cap.
    pub max_iterations: u32,
    /// Sub-call nesting cap. `depth` 0 is the root Worker.
    pub max_depth: u32,
    /// Maximum in-flight child sub-calls per Worker.
    pub max_concurrent_subcalls: u32,
    /// Per-iteration Evaluator timeout.
    pub eval_timeout: DurationMs,
    /// Per-LLM-call timeout.
    pub llm_timeout: DurationMs,
    /// Stdout truncation limit fed back into the next iteration's prompt.
    pub stdout_limit_bytes: usize,
    /// Per-binding preview length in the bindings digest.
    pub binding_preview_bytes: usize,
    /// Adapter credential. `None` means unset (the adapter may read its own
    /// environment variable, or reject the call).
    pub api_key: Option<String>,
    /// Adapter base URL override.
    pub api_base_url: Option<String>,
    /// Distributed-node packaging: this process's node name, if running as
    /// part of a cluster. Non-goal persistence/clustering aside, the engine
    /// still recognizes and carries the three env vars named in §6.
    pub node_name: Option<String>,
    /// Distributed-node packaging: the cluster cookie.
    pub cookie: Option<String>,
}

impl Default for RlmConfig {
    fn default() -> Self {
        Self {
            model_large: String::new(),
            model_small: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrent_subcalls: DEFAULT_MAX_CONCURRENT_SUBCALLS,
            eval_timeout: DurationMs::from_millis(DEFAULT_EVAL_TIMEOUT_MS),
            llm_timeout: DurationMs::from_millis(DEFAULT_LLM_TIMEOUT_MS),
            stdout_limit_bytes: DEFAULT_STDOUT_LIMIT_BYTES,
            binding_preview_bytes: DEFAULT_BINDING_PREVIEW_BYTES,
            api_key: None,
            api_base_url: None,
            node_name: None,
            cookie: None,
        }
    }
}

impl RlmConfig {
    /// Layer environment-variable overrides on top of `self`.
    ///
    /// Reads `NODE_NAME`, `COOKIE`, `API_KEY` per §6. An empty string is
    /// treated the same as an unset variable (the teacher's env-resolver
    /// convention), so `NODE_NAME=` does not clobber an already-set field
    /// with an empty string.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if let Some(v) = non_empty_env("NODE_NAME") {
            self.node_name = Some(v);
        }
        if let Some(v) = non_empty_env("COOKIE") {
            self.cookie = Some(v);
        }
        if let Some(v) = non_empty_env("API_KEY") {
            self.api_key = Some(v);
        }
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = RlmConfig::default();
        assert_eq!(cfg.max_iterations, 20);
        assert_eq!(cfg.max_depth, 3);
        assert_eq!(cfg.max_concurrent_subcalls, 4);
        assert_eq!(cfg.eval_timeout.0, 300_000);
    }

    #[test]
    fn from_env_treats_empty_as_unset() {
        // SAFETY: tests run single-threaded within this module's env mutation.
        unsafe {
            std::env::set_var("NODE_NAME", "");
            std::env::remove_var("COOKIE");
            std::env::remove_var("API_KEY");
        }
        let cfg = RlmConfig::default().from_env();
        assert_eq!(cfg.node_name, None);
        assert_eq!(cfg.cookie, None);
        assert_eq!(cfg.api_key, None);
    }

    #[test]
    fn from_env_picks_up_set_vars() {
        unsafe {
            std::env::set_var("API_KEY", "sk-test-123");
        }
        let cfg = RlmConfig::default().from_env();
        assert_eq!(cfg.api_key.as_deref(), Some("sk-test-123"));
        unsafe {
            std::env::remove_var("API_KEY");
        }
    }
}
