//! `ls` — list directory entries, trailing `/` on directories, byte size on
//! regular files.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::traits::SandboxTool;

#[derive(Deserialize)]
struct Input {
    #[serde(default)]
    path: Option<String>,
}

/// Lists the entries of a directory.
pub struct Ls;

#[async_trait]
impl SandboxTool for Ls {
    fn name(&self) -> &str {
        "ls"
    }

    fn description(&self) -> &str {
        "List the entries of a directory. Directories are suffixed with '/'; \
         regular files show their byte size."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "path": { "type": "string" } },
        })
    }

    async fn call(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Input { path } = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let resolved = ctx.resolve(path.as_deref().unwrap_or("."));

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&resolved).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if metadata.is_dir() {
                entries.push(format!("{name}/"));
            } else {
                entries.push(format!("{name} ({} bytes)", metadata.len()));
            }
        }
        entries.sort();
        Ok(entries.join("\n"))
    }
}
