//! POS domain types and the data-access facade trait.
//!
//! The facade exposes a small set of named, typed read operations over the
//! backing POS store. Implementations own cursor pagination and the
//! timeout/retry policy; callers only see whole result sets or typed errors.

use crate::error::PosError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A store (outlet) visible to the current token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
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

/// One line item (position) inside a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPosition {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product_name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub sum: f64,
}

/// The body of a document: positions plus two competing total fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<DocumentPosition>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub sum: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub total: f64,
}

impl DocumentBody {
    /// The document total: `total` when present, else `sum`.
    pub fn effective_total(&self) -> f64 {
        if self.total != 0.0 { self.total } else { self.sum }
    }
}

/// A document summary as returned by list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentShort {
    pub id: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub close_date: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub body: DocumentBody,
    /// Resolved from the body after fetch; not part of the wire format.
    #[serde(skip)]
    pub total: f64,
}

/// A full document with all positions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFull {
    pub id: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub close_date: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub store_id: String,
    #[serde(default)]
    pub body: DocumentBody,
    #[serde(skip)]
    pub total: f64,
}

/// Aggregate sales metrics for a period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesMetrics {
    pub count: usize,
    pub total_sum: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub store_id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub document_types: std::collections::BTreeMap<String, usize>,
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

/// The data-access facade over the backing POS API.
///
/// Every operation takes effect within the caller's async cancellation
/// scope; list operations transparently walk cursor pagination until
/// exhausted or the caller-supplied limit is reached.
#[async_trait]
pub trait PosApi: Send + Sync {
    /// List all stores visible to the current token.
    async fn list_stores(&self) -> Result<Vec<Store>, PosError>;

    /// Case-insensitive substring search over item names.
    async fn search_items(
        &self,
        query: &str,
        limit: usize,
        store_id: Option<&str>,
    ) -> Result<Vec<Item>, PosError>;

    /// List document summaries for a period.
    async fn search_documents(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        store_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DocumentShort>, PosError>;

    /// Fetch one document with all positions.
    async fn get_document(
        &self,
        doc_id: &str,
        store_id: Option<&str>,
    ) -> Result<DocumentFull, PosError>;

    /// Aggregate sales count and total sum for a period.
    async fn sales_metrics(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        store_id: Option<&str>,
        document_type: Option<&str>,
    ) -> Result<SalesMetrics, PosError>;
}
