//! Errors from tool operations.

use thiserror::Error;

/// Errors a [`crate::SandboxTool`] or [`crate::ToolCatalog`] can produce.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool name is not registered in the catalog.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// The tool's input did not match its expected shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem or process I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// `edit_file`'s `old_string` was not unique in the target file.
    #[error("old_string matched {count} times, expected exactly 1")]
    NotUnique {
        /// How many times `old_string` actually matched.
        count: usize,
    },

    /// A `bash` invocation exceeded its timeout.
    #[error("command timed out after {0}ms")]
    Timeout(u64),

    /// A `bash` invocation exited non-zero.
    #[error("command exited with status {status}: {output}")]
    NonZeroExit {
        /// The process exit status, if the OS reported one.
        status: i32,
        /// Combined stdout+stderr captured before the process exited.
        output: String,
    },

    /// Catch-all for errors not covered above.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ToolError {
    /// Whether retrying the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
