//! `glob` — find paths matching a glob pattern, capped at 500 results.

use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use rlm_proto::truncate::cap_count;
use serde::Deserialize;
use serde_json::json;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::traits::SandboxTool;

/// Maximum paths returned, per §4.5.
pub const MAX_MATCHES: usize = 500;

#[derive(Deserialize)]
struct Input {
    pattern: String,
    #[serde(default)]
    base: Option<String>,
}

/// Finds paths under `base` matching a glob `pattern` (supports `*`, `**`,
/// `?`).
pub struct Glob;

#[async_trait]
impl SandboxTool for Glob {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find file paths under a base directory matching a glob pattern (supports *, **, ?)."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string" },
                "base": { "type": "string" },
            },
            "required": ["pattern"],
        })
    }

    async fn call(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Input { pattern, base } = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let root = ctx.resolve(base.as_deref().unwrap_or("."));
        let matcher = glob_to_regex(&pattern);

        let mut matches = Vec::new();
        walk(&root, &root, &matcher, &mut matches);
        matches.sort();

        let total = matches.len();
        let (kept, truncated) = cap_count(matches, MAX_MATCHES);
        let mut out = kept.join("\n");
        if truncated {
            out.push_str(&format!("\n... [truncated, {total} paths total, {MAX_MATCHES} shown]"));
        }
        Ok(out)
    }
}

fn walk(root: &Path, dir: &Path, matcher: &Regex, out: &mut Vec<String>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, matcher, out);
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
        if matcher.is_match(&relative) {
            out.push(relative);
        }
    }
}

/// Translate a glob with `*`, `**`, `?` into an anchored regex.
/// `**` matches across path separators; `*` and `?` do not.
fn glob_to_regex(pattern: &str) -> Regex {
    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    re.push_str(".*");
                    if chars.peek() == Some(&'/') {
                        chars.next();
                    }
                } else {
                    re.push_str("[^/]*");
                }
            }
            '?' => re.push_str("[^/]"),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '\\' => {
                re.push('\\');
                re.push(c);
            }
            other => re.push(other),
        }
    }
    re.push('$');
    Regex::new(&re).unwrap_or_else(|_| Regex::new("$^").expect("empty-match fallback regex"))
}
