#![deny(missing_docs)]
//! Sandbox filesystem/shell tool catalog for the RLM engine (§4.5).
//!
//! Tools are `Arc<dyn SandboxTool>` trait objects held in a [`ToolCatalog`]
//! built once at Run-supervisor construction and shared read-only by every
//! Worker in the Run. Truncation is implemented by the single shared
//! `rlm_proto::truncate` helpers reused by every tool here and by the
//! Worker's own stdout/bindings-digest truncation, so the "truncation
//! style everywhere" contract in §4.5 is enforced by construction.

pub mod catalog;
pub mod context;
pub mod error;
pub mod tools;
pub mod traits;

pub use catalog::ToolCatalog;
pub use context::ToolContext;
pub use error::ToolError;
pub use traits::SandboxTool;
