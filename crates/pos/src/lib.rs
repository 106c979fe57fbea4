//! Evotor Cloud API client for Salespilot.
//!
//! Implements the `salespilot_core::PosApi` facade over the Evotor REST
//! API: cursor pagination, retry, and status mapping live here so the
//! agent only ever sees whole result sets or typed `PosError`s.

pub mod client;

pub use client::PosClient;
