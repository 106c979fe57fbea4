//! The structured answer the agent hands back to the rendering layer.
//!
//! `AgentAnswer` is the single output type for both the one-shot and the
//! interactive paths; the CLI decides whether to print it as text or JSON.

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// A record of one tool invocation, kept for transparency in the final
/// answer. Exactly one of `ok`/`err` is meaningful: `ok == err.is_none()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub args: Map<String, serde_json::Value>,

    /// Wall-clock duration of the facade call, in milliseconds.
    pub ms: i64,

    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl ToolCallRecord {
    pub fn success(name: impl Into<String>, args: Map<String, serde_json::Value>, ms: i64) -> Self {
        Self {
            name: name.into(),
            args,
            ms,
            ok: true,
            err: None,
        }
    }

    pub fn failure(
        name: impl Into<String>,
        args: Map<String, serde_json::Value>,
        ms: i64,
        err: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            args,
            ms,
            ok: false,
            err: Some(err.into()),
        }
    }
}

/// Filters that were actually applied while answering, echoed back so the
/// user can see what period and store the numbers refer to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppliedFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

impl AppliedFilters {
    pub fn is_empty(&self) -> bool {
        self.date_from.is_none() && self.date_to.is_none() && self.store_id.is_none()
    }
}

/// An item row in the answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultItem {
    pub item_id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub price: f64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub barcodes: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub article_number: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub measure_name: String,
}

/// A document row in the answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultDocument {
    pub doc_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub total: f64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub store_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
}

/// The result rows of an answer. An answer carries at most one kind of
/// row; mixing items and documents in one answer is not representable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultSet {
    Items(Vec<ResultItem>),
    Documents(Vec<ResultDocument>),
}

impl ResultSet {
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Items(items) => items.len(),
            ResultSet::Documents(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The complete answer to one user query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentAnswer {
    /// The original user query, echoed back.
    pub query: String,

    /// The natural-language answer text.
    pub answer_text: String,

    #[serde(default, skip_serializing_if = "AppliedFilters::is_empty")]
    pub applied_filters: AppliedFilters,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultSet>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,

    /// A suggested follow-up for the user, when there is one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_step: String,
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_record_has_no_err() {
        let rec = ToolCallRecord::success("ListStores", Map::new(), 12);
        assert!(rec.ok);
        assert!(rec.err.is_none());
    }

    #[test]
    fn failure_record_carries_err() {
        let rec = ToolCallRecord::failure("GetDocument", Map::new(), 0, "missing doc_id");
        assert!(!rec.ok);
        assert_eq!(rec.err.as_deref(), Some("missing doc_id"));
    }

    #[test]
    fn empty_answer_serializes_lean() {
        let answer = AgentAnswer {
            query: "q".into(),
            answer_text: "a".into(),
            ..AgentAnswer::default()
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert!(json.get("applied_filters").is_none());
        assert!(json.get("results").is_none());
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("next_step").is_none());
    }

    #[test]
    fn result_set_serializes_as_plain_array() {
        let set = ResultSet::Documents(vec![ResultDocument {
            doc_id: "d1".into(),
            total: 99.0,
            ..ResultDocument::default()
        }]);
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value, json!([{"doc_id": "d1", "total": 99.0}]));
    }

    #[test]
    fn answer_json_includes_filters_when_set() {
        let answer = AgentAnswer {
            query: "продажи за вчера".into(),
            answer_text: "Чеков: 3.".into(),
            applied_filters: AppliedFilters {
                date_from: Some("2025-08-24T00:00:00+03:00".into()),
                date_to: Some("2025-08-24T23:59:59+03:00".into()),
                store_id: None,
            },
            ..AgentAnswer::default()
        };
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(
            json["applied_filters"]["date_from"],
            json!("2025-08-24T00:00:00+03:00")
        );
        assert!(json["applied_filters"].get("store_id").is_none());
    }
}
