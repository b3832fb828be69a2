//! The object-safe tool trait every sandbox capability implements.

use async_trait::async_trait;

use crate::context::ToolContext;
use crate::error::ToolError;

/// A named capability exposed to sandboxed code (§3's "Tool").
///
/// Implementations are stored as `Arc<dyn SandboxTool>` in a
/// [`crate::ToolCatalog`] built once at Run-supervisor construction and
/// shared read-only by every Worker in the Run.
#[async_trait]
pub trait SandboxTool: Send + Sync {
    /// The tool's unique, stable name (e.g. `"read_file"`).
    fn name(&self) -> &str;

    /// Human-readable description surfaced to the LLM in the prompt.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input shape.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool. Returns the rendered output string on success, or
    /// a [`ToolError`] describing the failure — never both.
    async fn call(&self, input: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError>;
}
