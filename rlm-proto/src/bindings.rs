//! The bindings map — the mutable variable store carried across iterations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The name of the distinguished binding whose presence terminates a turn.
pub const FINAL_ANSWER: &str = "final_answer";

/// An ordered mapping from variable name to an opaque JSON value.
///
/// Insertion order is preserved (not sorted) — the prompt digest iterates
/// bindings in the order they were first assigned, which is deterministic
/// without requiring a sort on every prompt build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bindings {
    order: Vec<String>,
    values: std::collections::HashMap<String, Value>,
}

impl Bindings {
    /// An empty bindings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a binding by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Set a binding, appending it to insertion order if new.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value);
    }

    /// Remove a binding, if present.
    pub fn remove(&mut self, name: &str) {
        if self.values.remove(name).is_some() {
            self.order.retain(|n| n != name);
        }
    }

    /// Whether `final_answer` is currently set.
    pub fn has_final_answer(&self) -> bool {
        self.values.contains_key(FINAL_ANSWER)
    }

    /// The value of `final_answer`, if set.
    pub fn final_answer(&self) -> Option<&Value> {
        self.get(FINAL_ANSWER)
    }

    /// Clear `final_answer`, as happens at the start of every turn.
    pub fn clear_final_answer(&mut self) {
        self.remove(FINAL_ANSWER);
    }

    /// Iterate bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order.iter().map(|name| (name.as_str(), &self.values[name]))
    }

    /// Number of bindings currently held.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no bindings are held.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Merge `other` over `self`: names in `other` overwrite (and, if new,
    /// append to) `self`'s ordering. Names untouched by `other` retain
    /// their prior position and value.
    pub fn merge_over(&mut self, other: Bindings) {
        for name in other.order {
            if let Some(value) = other.values.get(&name).cloned() {
                self.set(name, value);
            }
        }
    }

    /// A short, deterministic digest of every binding suitable for embedding
    /// in a prompt: name, JSON type name, approximate byte size, and a
    /// head-truncated textual preview.
    pub fn digest(&self, preview_limit: usize) -> Vec<BindingDigest> {
        self.iter()
            .map(|(name, value)| BindingDigest::of(name, value, preview_limit))
            .collect()
    }
}

/// One entry in a bindings digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingDigest {
    /// Variable name.
    pub name: String,
    /// JSON type name: "null", "bool", "number", "string", "array", "object".
    pub type_name: &'static str,
    /// Approximate serialized byte size of the value.
    pub byte_size: usize,
    /// Head-truncated textual preview of the value.
    pub preview: String,
}

impl BindingDigest {
    fn of(name: &str, value: &Value, preview_limit: usize) -> Self {
        let type_name = match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        };
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let byte_size = rendered.len();
        let preview = crate::truncate::truncate_head(&rendered, preview_limit);
        Self {
            name: name.to_string(),
            type_name,
            byte_size,
            preview,
        }
    }
}
