//! `read_file` — read a file's contents, head-truncated at 100 KB.

use async_trait::async_trait;
use rlm_proto::truncate::truncate_head;
use serde::Deserialize;
use serde_json::json;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::traits::SandboxTool;

/// Head-truncation limit for `read_file`, per §4.5.
pub const READ_FILE_LIMIT_BYTES: usize = 100_000;

#[derive(Deserialize)]
struct Input {
    path: String,
}

/// Reads a file's contents.
pub struct ReadFile;

#[async_trait]
impl SandboxTool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
            "required": ["path"],
        })
    }

    async fn call(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Input { path } = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let resolved = ctx.resolve(&path);
        let contents = tokio::fs::read_to_string(&resolved).await?;
        Ok(truncate_head(&contents, READ_FILE_LIMIT_BYTES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_a_file() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        tokio::fs::write(dir.path().join("a.txt"), "hello").await.unwrap();

        let out = ReadFile
            .call(json!({ "path": "a.txt" }), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let err = ReadFile.call(json!({ "path": "nope.txt" }), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::Io(_)));
    }

    #[tokio::test]
    async fn large_file_is_head_truncated() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let long = "x".repeat(READ_FILE_LIMIT_BYTES * 2);
        tokio::fs::write(dir.path().join("big.txt"), &long).await.unwrap();

        let out = ReadFile.call(json!({ "path": "big.txt" }), &ctx).await.unwrap();
        assert!(out.len() < long.len());
        assert!(out.contains("truncated"));
    }
}
