//! `write_file` — write a file, creating parent directories as needed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::traits::SandboxTool;

#[derive(Deserialize)]
struct Input {
    path: String,
    content: String,
}

/// Writes a file's contents, creating parent directories.
pub struct WriteFile;

#[async_trait]
impl SandboxTool for WriteFile {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file at the given path, creating parent directories if needed."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" },
            },
            "required": ["path", "content"],
        })
    }

    async fn call(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Input { path, content } = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let resolved = ctx.resolve(&path);
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&resolved, &content).await?;
        Ok(format!("wrote {} bytes to {}", content.len(), path))
    }
}
