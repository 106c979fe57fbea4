//! # Salespilot Core
//!
//! Domain types, traits, and error definitions for the Salespilot POS
//! assistant. This crate has **zero I/O dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The two network seams — the LLM backend and the POS data API — are
//! defined as traits here (`Provider`, `PosApi`). Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing of the agent loop with scripted mocks
//! - Clean dependency graph (all crates depend inward on core)

pub mod answer;
pub mod catalog;
pub mod error;
pub mod message;
pub mod pos;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use answer::{AgentAnswer, AppliedFilters, ResultDocument, ResultItem, ResultSet, ToolCallRecord};
pub use catalog::ToolName;
pub use error::{Error, PosError, ProviderError, Result, ToolError};
pub use message::{Message, MessageToolCall, Role};
pub use pos::{DocumentFull, DocumentShort, Item, PosApi, SalesMetrics, Store};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
