//! `grep` — search for a pattern, preferring a system `rg`/`grep` binary
//! and falling back to an in-process line scanner when neither is
//! available.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use regex::RegexBuilder;
use rlm_proto::truncate::cap_count;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::traits::SandboxTool;

/// Maximum matching lines returned, per §4.5.
pub const MAX_MATCHES: usize = 200;

#[derive(Deserialize)]
struct Input {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    glob: Option<String>,
    #[serde(default)]
    case_insensitive: bool,
}

/// Searches files for a pattern, one `file:line:text` entry per match.
pub struct Grep;

#[async_trait]
impl SandboxTool for Grep {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search for a regex pattern in files under a path, optionally filtered by glob."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string" },
                "path": { "type": "string" },
                "glob": { "type": "string" },
                "case_insensitive": { "type": "boolean" },
            },
            "required": ["pattern"],
        })
    }

    async fn call(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Input { pattern, path, glob, case_insensitive } = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let search_root = path.as_deref().unwrap_or(".");
        let resolved_root = ctx.resolve(search_root);

        let lines = match run_backend(&pattern, &resolved_root, glob.as_deref(), case_insensitive).await {
            Some(lines) => lines,
            None => scan_in_process(&pattern, &resolved_root, glob.as_deref(), case_insensitive)?,
        };

        let total = lines.len();
        let (kept, truncated) = cap_count(lines, MAX_MATCHES);
        let mut out = kept.join("\n");
        if truncated {
            out.push_str(&format!("\n... [truncated, {total} matches total, {MAX_MATCHES} shown]"));
        }
        Ok(out)
    }
}

/// Try `rg` then `grep`. Returns `None` (never an error) when neither binary
/// can be spawned, signalling the caller to fall back in-process — a
/// missing backend is not a grep failure.
async fn run_backend(
    pattern: &str,
    root: &Path,
    glob: Option<&str>,
    case_insensitive: bool,
) -> Option<Vec<String>> {
    for (bin, build) in [
        ("rg", rg_args as fn(&str, &Path, Option<&str>, bool) -> Vec<String>),
        ("grep", grep_args as fn(&str, &Path, Option<&str>, bool) -> Vec<String>),
    ] {
        let args = build(pattern, root, glob, case_insensitive);
        match Command::new(bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) => {
                let text = String::from_utf8_lossy(&output.stdout);
                return Some(text.lines().map(str::to_string).collect());
            }
            Err(_) => continue,
        }
    }
    None
}

fn rg_args(pattern: &str, root: &Path, glob: Option<&str>, case_insensitive: bool) -> Vec<String> {
    let mut args = vec!["--line-number".to_string(), "--with-filename".to_string()];
    if case_insensitive {
        args.push("--ignore-case".to_string());
    }
    if let Some(g) = glob {
        args.push("--glob".to_string());
        args.push(g.to_string());
    }
    args.push(pattern.to_string());
    args.push(root.display().to_string());
    args
}

fn grep_args(pattern: &str, root: &Path, glob: Option<&str>, case_insensitive: bool) -> Vec<String> {
    let mut args = vec!["-r".to_string(), "-n".to_string()];
    if case_insensitive {
        args.push("-i".to_string());
    }
    if let Some(g) = glob {
        args.push(format!("--include={g}"));
    }
    args.push(pattern.to_string());
    args.push(root.display().to_string());
    args
}

/// Pure-Rust fallback: walk `root` recursively, matching `glob` (a simple
/// `*`-suffix/prefix match, not a full glob engine) against file names and
/// `pattern` as a regex against each line.
fn scan_in_process(
    pattern: &str,
    root: &Path,
    glob: Option<&str>,
    case_insensitive: bool,
) -> Result<Vec<String>, ToolError> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| ToolError::InvalidInput(format!("invalid pattern: {e}")))?;

    let mut matches = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(g) = glob
                && !simple_glob_match(g, &path)
            {
                continue;
            }
            let Ok(contents) = std::fs::read_to_string(&path) else { continue };
            for (idx, line) in contents.lines().enumerate() {
                if re.is_match(line) {
                    matches.push(format!("{}:{}:{}", path.display(), idx + 1, line));
                }
            }
        }
    }
    Ok(matches)
}

fn simple_glob_match(pattern: &str, path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else { return false };
    match pattern.strip_prefix('*') {
        Some(suffix) => name.ends_with(suffix),
        None => match pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == pattern,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn finds_matches_in_process_fallback() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.rs"), "fn main() {}\nlet x = 1;").await.unwrap();
        let ctx = ToolContext::new(dir.path());

        let out = Grep
            .call(json!({ "pattern": "fn main" }), &ctx)
            .await
            .unwrap();
        assert!(out.contains("a.rs:1:fn main() {}"));
    }

    #[tokio::test]
    async fn case_insensitive_matches() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "Hello World").await.unwrap();
        let ctx = ToolContext::new(dir.path());

        let out = Grep
            .call(json!({ "pattern": "hello", "case_insensitive": true }), &ctx)
            .await
            .unwrap();
        assert!(out.contains("Hello World"));
    }

    #[test]
    fn simple_glob_matches_suffix_and_prefix() {
        assert!(simple_glob_match("*.rs", Path::new("a.rs")));
        assert!(!simple_glob_match("*.rs", Path::new("a.txt")));
        assert!(simple_glob_match("test_*", Path::new("test_foo")));
    }
}
