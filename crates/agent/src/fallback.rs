//! Deterministic answers without an LLM.
//!
//! When no provider is configured, period-style queries are still
//! answerable: infer the period from the query text, run one metrics
//! call (or a document search when the query names an item), and format
//! the numbers directly.

use crate::dispatcher::{document_has_item, DEFAULT_ITEM_LIMIT, DEFAULT_DOC_LIMIT};
use crate::loop_runner::friendly_pos_error;
use crate::period::{self, PeriodRange};
use salespilot_core::answer::{
    AgentAnswer, AppliedFilters, ResultDocument, ResultSet, ToolCallRecord,
};
use salespilot_core::error::Error;
use salespilot_core::pos::PosApi;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// The no-LLM answer path.
pub struct MetricsFallback {
    pos: Arc<dyn PosApi>,
    default_store_id: Option<String>,
}

impl MetricsFallback {
    pub fn new(pos: Arc<dyn PosApi>, default_store_id: Option<String>) -> Self {
        Self {
            pos,
            default_store_id: default_store_id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    /// Answer one query deterministically.
    pub async fn run(
        &self,
        query: &str,
        from_flag: Option<&str>,
        to_flag: Option<&str>,
    ) -> Result<AgentAnswer, Error> {
        let (range, hint) = period::resolve(query, from_flag, to_flag, Local::now())?;

        let item_query = extract_item_query(query);
        if !item_query.is_empty() {
            return Ok(self.answer_documents(query, range, &item_query, hint).await);
        }
        Ok(self.answer_metrics(query, range, hint).await)
    }

    async fn answer_metrics(
        &self,
        query: &str,
        range: PeriodRange,
        hint: Option<String>,
    ) -> AgentAnswer {
        let from = range.from.with_timezone(&Utc);
        let to = range.to.with_timezone(&Utc);
        let mut args = Map::new();
        args.insert("from".into(), Value::String(rfc3339(range.from)));
        args.insert("to".into(), Value::String(rfc3339(range.to)));
        args.insert("document_type".into(), Value::String("SELL".into()));

        let start = Instant::now();
        let result = self
            .pos
            .sales_metrics(from, to, self.default_store_id.as_deref(), Some("SELL"))
            .await;
        let ms = start.elapsed().as_millis() as i64;

        match result {
            Ok(metrics) => {
                let record = ToolCallRecord::success("GetSalesMetrics", args, ms);
                log_record(&record);
                AgentAnswer {
                    query: query.to_string(),
                    answer_text: format!(
                        "Чеков: {}, сумма: {:.2}.",
                        metrics.count, metrics.total_sum
                    ),
                    applied_filters: self.filters(range),
                    tool_calls: vec![record],
                    next_step: hint.unwrap_or_default(),
                    ..AgentAnswer::default()
                }
            }
            Err(err) => {
                let record =
                    ToolCallRecord::failure("GetSalesMetrics", args, ms, err.to_string());
                log_record(&record);
                AgentAnswer {
                    query: query.to_string(),
                    answer_text: friendly_pos_error(&err),
                    applied_filters: self.filters(range),
                    tool_calls: vec![record],
                    ..AgentAnswer::default()
                }
            }
        }
    }

    async fn answer_documents(
        &self,
        query: &str,
        range: PeriodRange,
        item_query: &str,
        hint: Option<String>,
    ) -> AgentAnswer {
        let from = range.from.with_timezone(&Utc);
        let to = range.to.with_timezone(&Utc);
        let store_id = self.default_store_id.as_deref();
        let mut args = Map::new();
        args.insert("from".into(), Value::String(rfc3339(range.from)));
        args.insert("to".into(), Value::String(rfc3339(range.to)));
        args.insert("item_query".into(), Value::String(item_query.to_string()));

        let start = Instant::now();
        let result = self
            .pos
            .search_documents(from, to, store_id, DEFAULT_DOC_LIMIT, 0)
            .await;
        let ms = start.elapsed().as_millis() as i64;

        let documents = match result {
            Ok(docs) => docs,
            Err(err) => {
                let record =
                    ToolCallRecord::failure("SearchDocuments", args, ms, err.to_string());
                log_record(&record);
                return AgentAnswer {
                    query: query.to_string(),
                    answer_text: friendly_pos_error(&err),
                    applied_filters: self.filters(range),
                    tool_calls: vec![record],
                    ..AgentAnswer::default()
                };
            }
        };

        let record = ToolCallRecord::success("SearchDocuments", args, ms);
        log_record(&record);

        let needle = item_query.trim().to_lowercase();
        let mut matches = Vec::new();
        for doc in &documents {
            let full = match self.pos.get_document(&doc.id, store_id).await {
                Ok(full) => full,
                Err(err) => {
                    return AgentAnswer {
                        query: query.to_string(),
                        answer_text: friendly_pos_error(&err),
                        applied_filters: self.filters(range),
                        tool_calls: vec![record.clone()],
                        ..AgentAnswer::default()
                    };
                }
            };
            if document_has_item(&full, &needle) {
                matches.push(ResultDocument {
                    doc_id: full.id,
                    timestamp: full.close_date,
                    total: full.body.effective_total(),
                    store_id: full.store_id,
                    device_id: full.device_id,
                });
                if matches.len() >= DEFAULT_ITEM_LIMIT {
                    break;
                }
            }
        }

        AgentAnswer {
            query: query.to_string(),
            answer_text: format!("Найдено документов: {}.", matches.len()),
            applied_filters: self.filters(range),
            results: Some(ResultSet::Documents(matches)),
            tool_calls: vec![record],
            next_step: hint.unwrap_or_default(),
            ..AgentAnswer::default()
        }
    }

    fn filters(&self, range: PeriodRange) -> AppliedFilters {
        AppliedFilters {
            date_from: Some(rfc3339(range.from)),
            date_to: Some(rfc3339(range.to)),
            store_id: self.default_store_id.clone(),
        }
    }
}

fn rfc3339(dt: DateTime<Local>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn log_record(record: &ToolCallRecord) {
    info!(
        name = %record.name,
        ms = record.ms,
        ok = record.ok,
        err = record.err.as_deref().unwrap_or(""),
        "tool call"
    );
}

/// Pull an item query out of the text: quoted phrases first, then the
/// tail after "товар"/"позици" keywords. The keyword tail comes back
/// lowercased; matching against it is case-insensitive anyway.
pub fn extract_item_query(query: &str) -> String {
    let quoted = extract_quoted(query);
    if !quoted.is_empty() {
        return quoted;
    }

    // Search and slice within the same lowercased copy: to_lowercase can
    // change byte lengths ('İ' grows from 2 to 3 bytes), so indexes found
    // here must never be applied to the original string.
    let lower = query.to_lowercase();
    for key in ["позици", "товар"] {
        let Some(idx) = lower.find(key) else {
            continue;
        };
        let rest = lower[idx + key.len()..].trim();
        let rest = rest.trim_matches(|c: char| " .,:;!?".contains(c));
        if !rest.is_empty() {
            return rest.to_string();
        }
    }

    String::new()
}

/// The first phrase wrapped in «...», "..." or “...”.
fn extract_quoted(query: &str) -> String {
    const PAIRS: [(char, char); 3] = [('«', '»'), ('"', '"'), ('“', '”')];
    for (open, close) in PAIRS {
        let Some(start) = query.find(open) else {
            continue;
        };
        let after = &query[start + open.len_utf8()..];
        let Some(end) = after.find(close) else {
            continue;
        };
        let inner = after[..end].trim();
        if !inner.is_empty() {
            return inner.to_string();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPos;
    use salespilot_core::pos::{DocumentBody, DocumentPosition};

    fn body_with(name: &str, sum: f64) -> DocumentBody {
        DocumentBody {
            positions: vec![DocumentPosition {
                name: name.into(),
                ..DocumentPosition::default()
            }],
            sum,
            total: 0.0,
        }
    }

    #[test]
    fn quoted_item_extraction() {
        assert_eq!(extract_item_query("чеки с «Кофе латте» за вчера"), "Кофе латте");
        assert_eq!(extract_item_query(r#"документы с "чаем""#), "чаем");
    }

    #[test]
    fn keyword_tail_extraction() {
        assert_eq!(extract_item_query("найди документы с товаром кофе"), "ом кофе");
    }

    #[test]
    fn keyword_tail_survives_length_changing_lowercase() {
        // 'İ' lowercases to two code points and grows by a byte, shifting
        // every index after it.
        assert_eq!(extract_item_query("İтовары кофе"), "ы кофе");
        assert_eq!(extract_item_query("İ позиция «Кофе латте»"), "Кофе латте");
    }

    #[test]
    fn no_item_query_in_plain_period_question() {
        assert_eq!(extract_item_query("сколько чеков за вчера?"), "");
    }

    #[tokio::test]
    async fn metrics_answer_counts_sells() {
        let pos = RecordingPos::default()
            .with_document("d1", "SELL", body_with("Чай", 100.0))
            .with_document("d2", "RETURN", body_with("Чай", 40.0));
        let fallback = MetricsFallback::new(Arc::new(pos), Some("store-1".into()));

        let answer = fallback.run("продажи за вчера", None, None).await.unwrap();
        assert_eq!(answer.answer_text, "Чеков: 1, сумма: 100.00.");
        assert_eq!(answer.tool_calls.len(), 1);
        assert_eq!(answer.tool_calls[0].name, "GetSalesMetrics");
        assert_eq!(answer.applied_filters.store_id.as_deref(), Some("store-1"));
        assert!(answer.applied_filters.date_from.is_some());
    }

    #[tokio::test]
    async fn default_period_hint_becomes_next_step() {
        let pos = RecordingPos::default();
        let fallback = MetricsFallback::new(Arc::new(pos), Some("store-1".into()));

        let answer = fallback.run("сколько чеков?", None, None).await.unwrap();
        assert_eq!(
            answer.next_step,
            "Период не указан, использованы последние 7 дней."
        );
    }

    #[tokio::test]
    async fn item_query_switches_to_documents() {
        let pos = RecordingPos::default()
            .with_document("d1", "SELL", body_with("Кофе американо", 150.0))
            .with_document("d2", "SELL", body_with("Чай", 50.0));
        let fallback = MetricsFallback::new(Arc::new(pos.clone()), Some("store-1".into()));

        let answer = fallback
            .run("чеки с «кофе» за вчера", None, None)
            .await
            .unwrap();
        assert_eq!(answer.answer_text, "Найдено документов: 1.");
        match answer.results {
            Some(ResultSet::Documents(docs)) => {
                assert_eq!(docs.len(), 1);
                assert_eq!(docs[0].doc_id, "d1");
                assert_eq!(docs[0].total, 150.0);
            }
            other => panic!("expected documents, got {other:?}"),
        }
        assert_eq!(pos.get_document_calls(), 2);
    }

    #[tokio::test]
    async fn facade_error_becomes_friendly_text() {
        let pos = RecordingPos::default()
            .failing(salespilot_core::error::PosError::MissingToken);
        let fallback = MetricsFallback::new(Arc::new(pos), None);

        let answer = fallback.run("продажи за вчера", None, None).await.unwrap();
        assert_eq!(
            answer.answer_text,
            "Нет доступа: неверный или отсутствующий токен."
        );
        assert!(!answer.tool_calls[0].ok);
    }

    #[tokio::test]
    async fn flag_errors_propagate() {
        let fallback = MetricsFallback::new(Arc::new(RecordingPos::default()), None);
        let err = fallback
            .run("q", Some("2025-09-10"), Some("2025-09-01"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--to must be after --from"));
    }
}
