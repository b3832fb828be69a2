#![deny(missing_docs)]
//! Core protocol types for the RLM engine.
//!
//! This crate has no dependency on any other crate in this workspace: it
//! defines the ids, wire-stable value types, and the object-safe
//! `LlmAdapter` / `EventSink` / `WorkerFacing` traits that let `rlm-eval`,
//! `rlm-worker`, and `rlm-run` talk to each other and to collaborators
//! outside this repo's scope without depending on each other's internals.

pub mod adapter;
pub mod bindings;
pub mod config;
pub mod duration;
pub mod error;
pub mod event;
pub mod id;
pub mod message;
pub mod protocol;
pub mod sink;
pub mod spawner;
pub mod truncate;
pub mod worker_facing;

pub use adapter::{ChatOptions, LlmAdapter, ModelSize};
pub use bindings::{Bindings, BindingDigest, FINAL_ANSWER};
pub use config::RlmConfig;
pub use duration::DurationMs;
pub use error::AdapterError;
pub use event::{Event, EventKind};
pub use id::{ParentSpanId, RunId, SessionId, SpanId};
pub use message::{LlmReply, Message, Role, Usage};
pub use protocol::{
    DirectQueryOutcome, DirectQueryRequest, SubcallOutcome, SubcallRequest, ToolOutcome, ToolRequest,
};
pub use sink::EventSink;
pub use spawner::SubcallSpawner;
pub use worker_facing::WorkerFacing;
