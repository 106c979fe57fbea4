//! LLM provider implementations for Salespilot.
//!
//! All providers implement the `salespilot_core::Provider` trait. The CLI
//! builds the one configured provider at startup; the agent loop never
//! learns which backend it is talking to.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
