//! Bounded in-memory conversation history.
//!
//! Every append re-enforces two limits: a message count cap that always
//! keeps a leading system message, and a token budget that evicts the
//! oldest non-system messages until the estimate fits.

use salespilot_core::message::{Message, Role};
use tracing::info;

pub const DEFAULT_MAX_MESSAGES: usize = 20;
pub const DEFAULT_MAX_TOKENS: usize = 2000;

/// The conversation history for one interactive session.
#[derive(Debug)]
pub struct SessionHistory {
    messages: Vec<Message>,
    max_messages: usize,
    max_tokens: usize,
}

impl SessionHistory {
    /// Create a history with the given limits. Zero means "use default".
    pub fn new(max_messages: usize, max_tokens: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: if max_messages == 0 {
                DEFAULT_MAX_MESSAGES
            } else {
                max_messages
            },
            max_tokens: if max_tokens == 0 {
                DEFAULT_MAX_TOKENS
            } else {
                max_tokens
            },
        }
    }

    /// Append a message and re-enforce both limits.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.enforce_limits();
    }

    /// A copy of the current messages, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Estimated token total across all messages.
    pub fn token_count(&self) -> usize {
        self.messages.iter().map(Message::estimated_tokens).sum()
    }

    fn enforce_limits(&mut self) {
        let mut trimmed = false;

        if self.messages.len() > self.max_messages {
            self.trim_by_count();
            trimmed = true;
        }

        while self.messages.len() > 1 && self.token_count() > self.max_tokens {
            self.trim_oldest_non_system();
            trimmed = true;
        }

        if trimmed {
            info!(
                messages = self.messages.len(),
                tokens = self.token_count(),
                "session history trimmed"
            );
        }
    }

    /// Cut down to `max_messages`, keeping a leading system message and
    /// the newest of the rest.
    fn trim_by_count(&mut self) {
        let max = self.max_messages;
        if self.messages.len() <= max {
            return;
        }
        if self.messages[0].role == Role::System {
            let keep = max.saturating_sub(1);
            if keep == 0 {
                self.messages.truncate(1);
                return;
            }
            let start = self.messages.len().saturating_sub(keep).max(1);
            let mut trimmed = Vec::with_capacity(max);
            trimmed.push(self.messages[0].clone());
            trimmed.extend(self.messages.split_off(start));
            self.messages = trimmed;
        } else {
            let start = self.messages.len() - max;
            self.messages.drain(..start);
        }
    }

    /// Drop the oldest message that is not a leading system message.
    fn trim_oldest_non_system(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        if self.messages[0].role == Role::System {
            if self.messages.len() > 1 {
                self.messages.remove(1);
            }
        } else {
            self.messages.remove(0);
        }
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES, DEFAULT_MAX_TOKENS)
    }
}
