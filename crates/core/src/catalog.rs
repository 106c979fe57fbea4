//! The tool schema catalog — the five read-only data operations the model
//! may request.
//!
//! The closed [`ToolName`] enumeration and the JSON schemas are extended
//! together; dispatch never routes on a bare string beyond the initial
//! parse, so the catalog and the dispatcher cannot drift apart silently.

use crate::provider::ToolDefinition;
use serde_json::json;

/// The closed set of functions exposed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    GetSalesMetrics,
    ListStores,
    SearchItems,
    SearchDocuments,
    GetDocument,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::GetSalesMetrics,
        ToolName::ListStores,
        ToolName::SearchItems,
        ToolName::SearchDocuments,
        ToolName::GetDocument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::GetSalesMetrics => "GetSalesMetrics",
            ToolName::ListStores => "ListStores",
            ToolName::SearchItems => "SearchItems",
            ToolName::SearchDocuments => "SearchDocuments",
            ToolName::GetDocument => "GetDocument",
        }
    }

    /// Parse a model-requested function name. `None` means a schema
    /// mismatch between the model and the catalog.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// The definition sent to the model for this function.
    pub fn definition(&self) -> ToolDefinition {
        match self {
            ToolName::GetSalesMetrics => ToolDefinition {
                name: self.as_str().into(),
                description: "Get sales count and total sum for a period. Returns count, \
                              total_sum, store_id, period (from/to), and document_types with \
                              counts. Use this for 'how many receipts' or 'sum for period' \
                              queries. Much faster than SearchDocuments + aggregation. \
                              Default: counts only SELL documents (sales)."
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "from": {
                            "type": "string",
                            "format": "date-time",
                            "description": "Start date in RFC3339 format (e.g., 2025-01-01T00:00:00Z). If not specified, use 7 days ago."
                        },
                        "to": {
                            "type": "string",
                            "format": "date-time",
                            "description": "End date in RFC3339 format (e.g., 2025-01-31T23:59:59Z). If not specified, use now."
                        },
                        "document_type": {
                            "type": "string",
                            "description": "Document type to count. Use 'SELL' for sales only (default). Use 'ALL' to include all types (SELL, RETURN, REFUND)."
                        },
                        "store_id": {
                            "type": "string",
                            "description": "Optional store ID. Use when the user selected a specific store; otherwise omit to use the default store."
                        }
                    },
                    "required": ["from", "to"],
                    "additionalProperties": false
                }),
            },
            ToolName::ListStores => ToolDefinition {
                name: self.as_str().into(),
                description: "List all available stores for the current token. Returns stores \
                              with id and name. Use this to help user select which store to \
                              query if not specified."
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {},
                    "additionalProperties": false
                }),
            },
            ToolName::SearchItems => ToolDefinition {
                name: self.as_str().into(),
                description: "Find items by free-text query. Returns items with id, name, \
                              price, code, barcodes, article_number, measure_name. Search is \
                              case-insensitive and matches substrings in item names. Default \
                              limit: 10."
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Text to search for in item names (case-insensitive substring match)."
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of items to return (default: 10, max: 50)."
                        },
                        "store_id": {
                            "type": "string",
                            "description": "Optional store ID. Use when the user selected a specific store; otherwise omit to use the default store."
                        }
                    },
                    "required": ["query"],
                    "additionalProperties": false
                }),
            },
            ToolName::SearchDocuments => ToolDefinition {
                name: self.as_str().into(),
                description: "List documents for a period and store. Returns documents with \
                              id, timestamp, total, type, store_id, device_id. Types include \
                              SELL (sale), RETURN (return), REFUND (refund). Use item_query to \
                              filter documents that contain a specific item name in positions \
                              (this will fetch full documents and check positions locally). \
                              Default limit: 50."
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "from": {
                            "type": "string",
                            "format": "date-time",
                            "description": "Start date in RFC3339 format (e.g., 2025-01-01T00:00:00Z). If not specified, use 7 days ago."
                        },
                        "to": {
                            "type": "string",
                            "format": "date-time",
                            "description": "End date in RFC3339 format (e.g., 2025-01-31T23:59:59Z). If not specified, use now."
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of documents to return (default: 50, max: 200)."
                        },
                        "offset": {
                            "type": "integer",
                            "description": "Number of documents to skip (for pagination)."
                        },
                        "item_query": {
                            "type": "string",
                            "description": "Optional text to search for in document positions. If provided, fetches full documents and filters locally to find items matching this query (case-insensitive)."
                        },
                        "store_id": {
                            "type": "string",
                            "description": "Optional store ID. Use when the user selected a specific store; otherwise omit to use the default store."
                        }
                    },
                    "required": ["from", "to"],
                    "additionalProperties": false
                }),
            },
            ToolName::GetDocument => ToolDefinition {
                name: self.as_str().into(),
                description: "Fetch a single document with all positions. Returns document id, \
                              type (SELL/RETURN/REFUND), close_date, total, store_id, \
                              device_id, and positions with product_id, name, quantity, price, \
                              sum. Use for detailed inspection of specific documents."
                    .into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "doc_id": {
                            "type": "string",
                            "description": "Document ID to fetch."
                        },
                        "store_id": {
                            "type": "string",
                            "description": "Optional store ID. Use when the user selected a specific store; otherwise omit to use the default store."
                        }
                    },
                    "required": ["doc_id"],
                    "additionalProperties": false
                }),
            },
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// All tool definitions, in catalog order (sent to the model every round).
pub fn definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(|t| t.definition()).collect()
}
