//! Error types for the Salespilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Salespilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- POS data facade errors ---
    #[error("POS error: {0}")]
    Pos(#[from] PosError),

    // --- Tool dispatch errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error with a plain message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("provider is not configured: {0}")]
    NotConfigured(String),

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("network error: {0}")]
    Network(String),
}

/// Errors from the POS data facade.
///
/// The typed variants are the contract the agent relies on to produce
/// friendly user-facing messages; everything else surfaces as `Api`.
#[derive(Debug, Clone, Error)]
pub enum PosError {
    #[error("pos api token is required")]
    MissingToken,

    #[error("store id is required")]
    MissingStoreId,

    #[error("pos api unauthorized: {0}")]
    Unauthorized(String),

    #[error("pos api rate limited: {0}")]
    RateLimited(String),

    #[error("pos api error: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("search query is empty")]
    EmptyQuery,

    #[error("document id is required")]
    MissingDocumentId,

    #[error("pos request failed: {0}")]
    Network(String),

    #[error("failed to decode pos response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid tool args: {0}")]
    InvalidArguments(String),

    #[error("missing {0}")]
    MissingArgument(String),

    #[error("invalid {key}: {reason}")]
    InvalidArgument { key: String, reason: String },

    #[error(transparent)]
    Pos(#[from] PosError),

    #[error("failed to encode tool result: {0}")]
    Encode(String),
}

impl ToolError {
    /// Whether this error aborts the remaining calls in a batch.
    ///
    /// Argument errors stay local to one call (the model sees an error
    /// payload and the turn continues); an unknown tool name signals a
    /// schema mismatch and facade failures mean the backing API is
    /// unusable, so both abort the batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ToolError::UnknownTool(_) | ToolError::Pos(_) | ToolError::Encode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_error_displays_status_and_body() {
        let err = Error::Pos(PosError::Api {
            status: 502,
            body: "Bad Gateway".into(),
        });
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn argument_errors_are_local() {
        assert!(!ToolError::MissingArgument("from".into()).is_fatal());
        assert!(
            !ToolError::InvalidArgument {
                key: "to".into(),
                reason: "not a date".into()
            }
            .is_fatal()
        );
        assert!(!ToolError::InvalidArguments("bad json".into()).is_fatal());
    }

    #[test]
    fn schema_and_facade_errors_are_fatal() {
        assert!(ToolError::UnknownTool("DropTables".into()).is_fatal());
        assert!(ToolError::Pos(PosError::MissingToken).is_fatal());
        assert!(ToolError::Encode("loop".into()).is_fatal());
    }
}
