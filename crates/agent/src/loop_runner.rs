//! The bounded tool-calling loop.
//!
//! Per round: send the history plus the tool catalog to the provider; a
//! plain text reply ends the turn, tool calls are dispatched and their
//! results folded back in. A fatal dispatch error ends the turn with a
//! friendly message instead of an Err; exhausting the round limit ends
//! it with a fixed step-limit message.

use crate::dispatcher::{DispatchOutcome, ToolDispatcher};
use crate::history::SessionHistory;
use crate::prompt::system_prompt;
use salespilot_core::answer::{AgentAnswer, ToolCallRecord};
use salespilot_core::catalog;
use salespilot_core::error::{Error, PosError, ProviderError, ToolError};
use salespilot_core::message::Message;
use salespilot_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MAX_TOOL_ROUNDS: usize = 4;

const STEP_LIMIT_TEXT: &str = "Не удалось завершить запрос: превышен лимит шагов.";
const STEP_LIMIT_HINT: &str = "Уточните запрос или сузьте период/магазин.";

/// The agent loop: one provider, one dispatcher, bounded rounds.
pub struct AgentLoop {
    provider: Option<Arc<dyn Provider>>,
    model: String,
    dispatcher: ToolDispatcher,
}

impl AgentLoop {
    pub fn new(
        provider: Option<Arc<dyn Provider>>,
        model: impl Into<String>,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            dispatcher,
        }
    }

    /// Answer one user query, mutating the shared history.
    ///
    /// The history is seeded with the system prompt on first use; the
    /// user message is appended before the first round.
    pub async fn run(
        &self,
        history: &mut SessionHistory,
        query: &str,
        interactive: bool,
    ) -> Result<AgentAnswer, Error> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("no llm model or api key".into()))?;

        if history.is_empty() {
            history.append(Message::system(system_prompt(interactive)));
        }
        history.append(Message::user(query));

        let tools = catalog::definitions();
        let mut records: Vec<ToolCallRecord> = Vec::new();

        for round in 0..MAX_TOOL_ROUNDS {
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: history.snapshot(),
                tools: tools.clone(),
            };

            let response = provider.complete(request).await?;
            if let Some(usage) = &response.usage {
                info!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    total_tokens = usage.total_tokens,
                    "llm usage"
                );
            }

            let message = response.message;
            debug!(
                round,
                content = %message.text(),
                tool_calls = message.tool_calls.len(),
                "llm response"
            );

            if message.tool_calls.is_empty() {
                let answer_text = message.text().trim().to_string();
                history.append(message);
                return Ok(AgentAnswer {
                    query: query.to_string(),
                    answer_text,
                    tool_calls: records,
                    ..AgentAnswer::default()
                });
            }

            let calls = message.tool_calls.clone();
            history.append(message);

            let DispatchOutcome {
                messages,
                records: round_records,
                error,
            } = self.dispatcher.execute(&calls).await;

            records.extend(round_records);
            for tool_message in messages {
                history.append(tool_message);
            }

            if let Some(err) = error {
                warn!(error = %err, "tool dispatch aborted");
                return Ok(AgentAnswer {
                    query: query.to_string(),
                    answer_text: friendly_error(&err),
                    tool_calls: records,
                    ..AgentAnswer::default()
                });
            }
        }

        Ok(AgentAnswer {
            query: query.to_string(),
            answer_text: STEP_LIMIT_TEXT.to_string(),
            tool_calls: records,
            next_step: STEP_LIMIT_HINT.to_string(),
            ..AgentAnswer::default()
        })
    }
}

/// Map an aborting tool error to a user-facing Russian message.
pub fn friendly_error(err: &ToolError) -> String {
    match err {
        ToolError::Pos(PosError::MissingToken) => {
            "Нет доступа: неверный или отсутствующий токен.".into()
        }
        ToolError::Pos(PosError::MissingStoreId) => {
            "Нужен store_id: укажите --store-id или EVOTOR_STORE_ID.".into()
        }
        ToolError::Pos(PosError::Unauthorized(_)) => {
            "Нет доступа: неверный токен или недостаточно прав.".into()
        }
        ToolError::Pos(PosError::RateLimited(_)) => {
            "Слишком много запросов. Попробуйте позже.".into()
        }
        other => other.to_string(),
    }
}

/// The same mapping for raw facade errors (used by the fallback path).
pub fn friendly_pos_error(err: &PosError) -> String {
    match err {
        PosError::MissingToken => "Нет доступа: неверный или отсутствующий токен.".into(),
        PosError::MissingStoreId => {
            "Нужен store_id: укажите --store-id или EVOTOR_STORE_ID.".into()
        }
        PosError::Unauthorized(_) => "Нет доступа: неверный токен или недостаточно прав.".into(),
        PosError::RateLimited(_) => "Слишком много запросов. Попробуйте позже.".into(),
        other => other.to_string(),
    }
}
