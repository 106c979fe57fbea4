//! The tool-calling agent for Salespilot.
//!
//! A bounded loop around an LLM provider: the model answers directly or
//! requests tool calls against the POS facade, tool results are folded
//! back into the conversation, and the loop re-prompts until the model
//! produces text or the round limit is hit. A deterministic metrics
//! fallback answers period queries when no provider is configured.

pub mod dispatcher;
pub mod fallback;
pub mod history;
pub mod loop_runner;
pub mod period;
pub mod prompt;

pub use dispatcher::{DispatchOutcome, ToolDispatcher};
pub use fallback::MetricsFallback;
pub use history::SessionHistory;
pub use loop_runner::{AgentLoop, MAX_TOOL_ROUNDS};
pub use period::PeriodRange;

#[cfg(test)]
pub(crate) mod testing;
