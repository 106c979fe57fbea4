//! Chat message domain types.
//!
//! These are the value objects that flow through the agent loop:
//! the user asks a question → the model answers or requests tool calls →
//! tool results are folded back in as `tool` messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
    /// Tool execution result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        };
        write!(f, "{s}")
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Extra text parts for multi-part content. Empty for plain messages;
    /// only consulted when `content` itself is empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<String>,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            parts: Vec::new(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a tool result message addressed to a tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    /// The first non-empty text of this message: `content`, else the first
    /// non-blank extra part.
    pub fn text(&self) -> &str {
        if !self.content.is_empty() {
            return &self.content;
        }
        self.parts
            .iter()
            .map(String::as_str)
            .find(|p| !p.trim().is_empty())
            .unwrap_or("")
    }

    /// Approximate token count of this message.
    ///
    /// Whitespace-delimited word count over the text parts — a cheap proxy
    /// for budget enforcement, not a real tokenizer.
    pub fn estimated_tokens(&self) -> usize {
        if !self.content.is_empty() {
            return self.content.split_whitespace().count();
        }
        self.parts
            .iter()
            .map(|p| p.split_whitespace().count())
            .sum()
    }
}

/// A tool call embedded in an assistant message.
///
/// Produced by the model, consumed by the dispatcher exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call (unique within one assistant turn)
    pub id: String,

    /// Name of the function to invoke
    pub name: String,

    /// Arguments as a raw JSON string
    pub arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("сколько чеков за вчера?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "сколько чеков за вчера?");
        assert!(msg.tool_calls.is_empty());
        assert!(msg.tool_call_id.is_none());
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = Message::tool_result("call_1", r#"{"count":3}"#);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn estimated_tokens_counts_words() {
        let msg = Message::user("one two  three\nfour");
        assert_eq!(msg.estimated_tokens(), 4);
    }

    #[test]
    fn estimated_tokens_falls_back_to_parts() {
        let mut msg = Message::assistant("");
        msg.parts = vec!["alpha beta".into(), "gamma".into()];
        assert_eq!(msg.estimated_tokens(), 3);
    }

    #[test]
    fn content_wins_over_parts() {
        let mut msg = Message::assistant("primary text");
        msg.parts = vec!["ignored part".into()];
        assert_eq!(msg.estimated_tokens(), 2);
        assert_eq!(msg.text(), "primary text");
    }

    #[test]
    fn text_skips_blank_parts() {
        let mut msg = Message::assistant("");
        msg.parts = vec!["   ".into(), "hello".into()];
        assert_eq!(msg.text(), "hello");
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Test message");
        assert_eq!(deserialized.role, Role::User);
    }
}
