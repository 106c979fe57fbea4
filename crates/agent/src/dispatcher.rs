//! Sequential tool dispatch against the POS facade.
//!
//! Each assistant turn delivers a batch of tool calls. Calls run in
//! order; argument problems stay local to one call (the model sees an
//! `{"error": ...}` payload and the batch continues), while an unknown
//! tool name or a facade failure aborts the rest of the batch.

use salespilot_core::answer::ToolCallRecord;
use salespilot_core::catalog::ToolName;
use salespilot_core::error::ToolError;
use salespilot_core::message::{Message, MessageToolCall};
use salespilot_core::pos::{DocumentFull, DocumentShort, PosApi};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub const DEFAULT_ITEM_LIMIT: usize = 10;
pub const DEFAULT_DOC_LIMIT: usize = 50;

/// The result of dispatching one batch of tool calls.
pub struct DispatchOutcome {
    /// Tool result messages, one per attempted call, in call order.
    pub messages: Vec<Message>,

    /// Records for the final answer, one per attempted call.
    pub records: Vec<ToolCallRecord>,

    /// Set when the batch was aborted; calls after the failing one were
    /// not attempted.
    pub error: Option<ToolError>,
}

/// Executes model-requested tool calls against the POS facade.
pub struct ToolDispatcher {
    pos: Arc<dyn PosApi>,
    default_store_id: Option<String>,
}

impl ToolDispatcher {
    pub fn new(pos: Arc<dyn PosApi>, default_store_id: Option<String>) -> Self {
        Self {
            pos,
            default_store_id: default_store_id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    /// Run a batch of tool calls sequentially.
    pub async fn execute(&self, calls: &[MessageToolCall]) -> DispatchOutcome {
        let mut messages = Vec::with_capacity(calls.len());
        let mut records = Vec::with_capacity(calls.len());

        for call in calls {
            let args = match parse_args(&call.arguments) {
                Ok(args) => args,
                Err(err) => {
                    let record =
                        ToolCallRecord::failure(&call.name, Map::new(), 0, err.to_string());
                    log_record(&record);
                    messages.push(Message::tool_result(&call.id, error_payload(&err)));
                    records.push(record);
                    continue;
                }
            };

            let Some(tool) = ToolName::parse(&call.name) else {
                let err = ToolError::UnknownTool(call.name.clone());
                let record = ToolCallRecord::failure(&call.name, args, 0, err.to_string());
                log_record(&record);
                messages.push(Message::tool_result(&call.id, error_payload(&err)));
                records.push(record);
                return DispatchOutcome {
                    messages,
                    records,
                    error: Some(err),
                };
            };

            match self.dispatch_one(tool, &args).await {
                Ok((payload, record)) => {
                    log_record(&record);
                    messages.push(Message::tool_result(&call.id, payload));
                    records.push(record);
                }
                Err((err, record)) => {
                    log_record(&record);
                    messages.push(Message::tool_result(&call.id, error_payload(&err)));
                    records.push(record);
                    if err.is_fatal() {
                        return DispatchOutcome {
                            messages,
                            records,
                            error: Some(err),
                        };
                    }
                }
            }
        }

        DispatchOutcome {
            messages,
            records,
            error: None,
        }
    }

    /// Execute one parsed tool call. Returns the JSON payload for the
    /// model plus the record; on error, the record describes the failure.
    async fn dispatch_one(
        &self,
        tool: ToolName,
        args: &Map<String, Value>,
    ) -> Result<(String, ToolCallRecord), (ToolError, ToolCallRecord)> {
        let name = tool.as_str();
        let fail = |err: ToolError| {
            let record = ToolCallRecord::failure(name, args.clone(), 0, err.to_string());
            (err, record)
        };

        match tool {
            ToolName::GetSalesMetrics => {
                let from = time_arg(args, "from").map_err(fail)?;
                let to = time_arg(args, "to").map_err(fail)?;
                let document_type = string_arg(args, "document_type");
                let store_id = self.store_arg(args);

                let start = Instant::now();
                let result = self
                    .pos
                    .sales_metrics(from, to, store_id.as_deref(), document_type.as_deref())
                    .await;
                self.finish(name, args, start, result)
            }
            ToolName::ListStores => {
                let start = Instant::now();
                let result = self.pos.list_stores().await;
                self.finish(name, args, start, result)
            }
            ToolName::SearchItems => {
                let query = string_arg(args, "query").unwrap_or_default();
                let limit = int_arg(args, "limit", DEFAULT_ITEM_LIMIT);
                let store_id = self.store_arg(args);

                let start = Instant::now();
                let result = self
                    .pos
                    .search_items(&query, limit, store_id.as_deref())
                    .await;
                self.finish(name, args, start, result)
            }
            ToolName::SearchDocuments => {
                let from = time_arg(args, "from").map_err(fail)?;
                let to = time_arg(args, "to").map_err(fail)?;
                let limit = int_arg(args, "limit", DEFAULT_DOC_LIMIT);
                let offset = int_arg(args, "offset", 0);
                let store_id = self.store_arg(args);
                let item_query = string_arg(args, "item_query").unwrap_or_default();

                let start = Instant::now();
                let result = self
                    .pos
                    .search_documents(from, to, store_id.as_deref(), limit, offset)
                    .await;

                if item_query.trim().is_empty() {
                    return self.finish(name, args, start, result);
                }

                let (payload, record) = self.finish(name, args, start, result)?;
                match self
                    .filter_documents_by_item(store_id.as_deref(), payload, &item_query)
                    .await
                {
                    Ok(filtered_payload) => Ok((filtered_payload, record)),
                    Err(err) => Err((err, record)),
                }
            }
            ToolName::GetDocument => {
                let doc_id = string_arg(args, "doc_id").unwrap_or_default();
                let store_id = self.store_arg(args);

                let start = Instant::now();
                let result = self.pos.get_document(&doc_id, store_id.as_deref()).await;
                self.finish(name, args, start, result)
            }
        }
    }

    /// Turn a facade result into a payload + record pair.
    fn finish<T: Serialize>(
        &self,
        name: &str,
        args: &Map<String, Value>,
        start: Instant,
        result: Result<T, salespilot_core::error::PosError>,
    ) -> Result<(String, ToolCallRecord), (ToolError, ToolCallRecord)> {
        let ms = start.elapsed().as_millis() as i64;
        match result {
            Ok(value) => match serde_json::to_string(&value) {
                Ok(payload) => Ok((payload, ToolCallRecord::success(name, args.clone(), ms))),
                Err(e) => {
                    let err = ToolError::Encode(e.to_string());
                    let record =
                        ToolCallRecord::failure(name, args.clone(), ms, err.to_string());
                    Err((err, record))
                }
            },
            Err(e) => {
                let err = ToolError::Pos(e);
                let record = ToolCallRecord::failure(name, args.clone(), ms, err.to_string());
                Err((err, record))
            }
        }
    }

    fn store_arg(&self, args: &Map<String, Value>) -> Option<String> {
        string_arg(args, "store_id")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.default_store_id.clone())
    }

    /// Re-fetch full documents and keep those whose positions match the
    /// item query. The extra `GetDocument` fetches are logged but not
    /// recorded in the answer.
    async fn filter_documents_by_item(
        &self,
        store_id: Option<&str>,
        documents_payload: String,
        item_query: &str,
    ) -> Result<String, ToolError> {
        let needle = item_query.trim().to_lowercase();
        let documents: Vec<DocumentShort> = serde_json::from_str(&documents_payload)
            .map_err(|e| ToolError::Encode(e.to_string()))?;

        let mut matches = Vec::new();
        for doc in &documents {
            let start = Instant::now();
            let result = self.pos.get_document(&doc.id, store_id).await;
            info!(
                name = "GetDocument",
                doc_id = %doc.id,
                ms = start.elapsed().as_millis() as i64,
                ok = result.is_ok(),
                "tool call"
            );
            let full = result.map_err(ToolError::Pos)?;

            if document_has_item(&full, &needle) {
                let total = full.body.effective_total();
                matches.push(DocumentShort {
                    id: full.id,
                    r#type: full.r#type,
                    close_date: full.close_date,
                    device_id: full.device_id,
                    store_id: full.store_id,
                    body: full.body,
                    total,
                });
                if matches.len() >= DEFAULT_ITEM_LIMIT {
                    break;
                }
            }
        }

        serde_json::to_string(&matches).map_err(|e| ToolError::Encode(e.to_string()))
    }
}

/// Parse the raw arguments JSON. Empty means "no arguments".
fn parse_args(raw: &str) -> Result<Map<String, Value>, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// A string argument; non-string scalars are stringified.
fn string_arg(args: &Map<String, Value>, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// An integer argument with a fallback for missing or unusable values.
fn int_arg(args: &Map<String, Value>, key: &str, fallback: usize) -> usize {
    match args.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|v| v as i64))
            .filter(|v| *v >= 0)
            .map(|v| v as usize)
            .unwrap_or(fallback),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(fallback),
        _ => fallback,
    }
}

/// A required RFC3339 timestamp argument, normalized to UTC.
fn time_arg(
    args: &Map<String, Value>,
    key: &str,
) -> Result<chrono::DateTime<chrono::Utc>, ToolError> {
    let value = string_arg(args, key).unwrap_or_default();
    if value.is_empty() {
        return Err(ToolError::MissingArgument(key.to_string()));
    }
    chrono::DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| ToolError::InvalidArgument {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

fn error_payload(err: &ToolError) -> String {
    serde_json::json!({ "error": err.to_string() }).to_string()
}

pub(crate) fn document_has_item(doc: &DocumentFull, needle: &str) -> bool {
    doc.body.positions.iter().any(|pos| {
        let name = pos.name.trim().to_lowercase();
        let product_name = pos.product_name.trim().to_lowercase();
        (!name.is_empty() && name.contains(needle))
            || (!product_name.is_empty() && product_name.contains(needle))
    })
}

fn log_record(record: &ToolCallRecord) {
    // Inside the macro's field position a bare `Value` resolves to the
    // `tracing::field::Value` trait, so the path stays fully qualified.
    info!(
        name = %record.name,
        args = %serde_json::Value::Object(record.args.clone()),
        ms = record.ms,
        ok = record.ok,
        err = record.err.as_deref().unwrap_or(""),
        "tool call"
    );
}
