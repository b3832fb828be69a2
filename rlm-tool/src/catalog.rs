//! The fixed tool catalog built once at Run-supervisor construction and
//! shared read-only by every Worker in the Run.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::traits::SandboxTool;
use crate::tools::{Bash, EditFile, Glob, Grep, Ls, ReadFile, WriteFile};

/// A registry of [`SandboxTool`]s keyed by name.
pub struct ToolCatalog {
    tools: HashMap<String, Arc<dyn SandboxTool>>,
}

impl ToolCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// The catalog with the fixed built-in set from §4.5: `read_file`,
    /// `write_file`, `edit_file`, `bash`, `grep`, `glob`, `ls`.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(ReadFile));
        catalog.register(Arc::new(WriteFile));
        catalog.register(Arc::new(EditFile));
        catalog.register(Arc::new(Bash));
        catalog.register(Arc::new(Grep));
        catalog.register(Arc::new(Glob));
        catalog.register(Arc::new(Ls));
        catalog
    }

    /// Register a tool, overwriting any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn SandboxTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn SandboxTool>> {
        self.tools.get(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SandboxTool>> {
        self.tools.values()
    }

    /// Dispatch a call by name. Used by the Worker when it services a
    /// tool-shim request that arrived through the eval bridge.
    #[tracing::instrument(skip(self, input, ctx), fields(tool = %name))]
    pub async fn call(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.call(input, ctx).await
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn builtins_registers_all_seven_tools() {
        let catalog = ToolCatalog::with_builtins();
        for name in ["read_file", "write_file", "edit_file", "bash", "grep", "glob", "ls"] {
            assert!(catalog.get(name).is_some(), "missing tool {name}");
        }
        assert_eq!(catalog.len(), 7);
    }

    #[tokio::test]
    async fn call_dispatches_by_name() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let catalog = ToolCatalog::with_builtins();

        catalog
            .call("write_file", json!({ "path": "a.txt", "content": "hi" }), &ctx)
            .await
            .unwrap();
        let out = catalog.call("read_file", json!({ "path": "a.txt" }), &ctx).await.unwrap();
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn call_unknown_tool_is_not_found() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new(dir.path());
        let catalog = ToolCatalog::with_builtins();
        let err = catalog.call("nonexistent", json!({}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
