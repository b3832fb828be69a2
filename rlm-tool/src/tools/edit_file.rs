//! `edit_file` — replace a unique substring in a file, or prepend when
//! `old_string` is empty.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::traits::SandboxTool;

#[derive(Deserialize)]
struct Input {
    path: String,
    old_string: String,
    new_string: String,
}

/// Replaces a unique occurrence of `old_string` with `new_string` in a file.
pub struct EditFile;

#[async_trait]
impl SandboxTool for EditFile {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Replace a unique occurrence of old_string with new_string in a file. \
         An empty old_string prepends new_string to the file."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "old_string": { "type": "string" },
                "new_string": { "type": "string" },
            },
            "required": ["path", "old_string", "new_string"],
        })
    }

    async fn call(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let Input { path, old_string, new_string } = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let resolved = ctx.resolve(&path);
        let contents = tokio::fs::read_to_string(&resolved).await?;

        let updated = if old_string.is_empty() {
            format!("{new_string}{contents}")
        } else {
            let count = contents.matches(old_string.as_str()).count();
            match count {
                0 => return Err(ToolError::InvalidInput(format!("old_string not found in {path}"))),
                1 => contents.replacen(&old_string, &new_string, 1),
                n => return Err(ToolError::NotUnique { count: n }),
            }
        };

        tokio::fs::write(&resolved, &updated).await?;
        Ok(format!("replaced 1 occurrence in {path}"))
    }
}
