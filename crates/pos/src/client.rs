//! The Evotor REST client.
//!
//! All endpoints are GETs under `https://api.evotor.ru` with the
//! `application/vnd.evotor.v2+json` media type and Bearer auth. List
//! endpoints return `{items, paging: {next_cursor}}` pages; the client
//! walks cursors until exhausted or the caller's limit is satisfied.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use salespilot_core::error::PosError;
use salespilot_core::pos::{
    DocumentFull, DocumentShort, Item, PosApi, SalesMetrics, Store,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.evotor.ru";
const API_MEDIA_TYPE: &str = "application/vnd.evotor.v2+json";
const ITEM_FIELDS: &str = "id,name,price,code,barcodes,article_number,measure_name";
const RETRY_WAIT: Duration = Duration::from_secs(1);

/// One page of a cursor-paginated list endpoint.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    paging: Paging,
}

#[derive(Debug, Default, Deserialize)]
struct Paging {
    #[serde(default)]
    next_cursor: String,
}

/// The Evotor Cloud API client.
pub struct PosClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    default_store_id: Option<String>,
}

impl PosClient {
    /// Create a client for the production Evotor API.
    pub fn new(
        token: impl Into<String>,
        default_store_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PosError> {
        Self::with_base_url(DEFAULT_BASE_URL, token, default_store_id, timeout)
    }

    /// Create a client against a custom base URL (staging, test server).
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        default_store_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PosError> {
        let token = token.into();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_MEDIA_TYPE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(API_MEDIA_TYPE));
        if !token.trim().is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| PosError::Network(e.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| PosError::Network(e.to_string()))?;

        let default_store_id = default_store_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            default_store_id,
        })
    }

    fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    fn resolve_store_id(&self, store_id: Option<&str>) -> Result<String, PosError> {
        if let Some(id) = store_id {
            let id = id.trim();
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }
        self.default_store_id
            .clone()
            .ok_or(PosError::MissingStoreId)
    }

    /// GET with one retry on a network failure or 429.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PosError> {
        let url = format!("{}{path}", self.base_url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.get_once(&url, query).await {
                Ok(body) => return body,
                Err(err) if attempt == 1 && should_retry(&err) => {
                    warn!(%url, error = %err, "retrying pos request");
                    tokio::time::sleep(RETRY_WAIT).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One request attempt. The outer `Result` is the retry decision
    /// (transport/429); the inner carries terminal outcomes.
    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Result<T, PosError>, PosError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| PosError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(PosError::RateLimited(body));
        }
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Ok(Err(map_status(status, body)));
        }

        let parsed = response
            .json::<T>()
            .await
            .map_err(|e| PosError::Decode(e.to_string()));
        Ok(parsed)
    }

    /// Walk the pages of a document listing for the period. A non-zero
    /// `cap` stops the walk as soon as that many documents are buffered;
    /// zero walks every page.
    async fn fetch_documents(
        &self,
        store_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cap: usize,
    ) -> Result<Vec<DocumentShort>, PosError> {
        let path = format!("/stores/{store_id}/documents");
        let mut documents = Vec::new();
        let mut cursor = String::new();
        let mut first_page = true;

        loop {
            let mut query: Vec<(&str, String)> = Vec::new();
            // The API carries the period forward inside the cursor.
            if first_page {
                query.push(("since", from.timestamp_millis().to_string()));
                query.push(("until", to.timestamp_millis().to_string()));
                first_page = false;
            }
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }

            let page: Page<DocumentShort> = self.get(&path, &query).await?;
            for mut doc in page.items {
                doc.total = doc.body.effective_total();
                documents.push(doc);
                if cap > 0 && documents.len() >= cap {
                    return Ok(documents);
                }
            }

            if page.paging.next_cursor.is_empty() {
                break;
            }
            cursor = page.paging.next_cursor;
        }

        Ok(documents)
    }
}

/// How many documents a windowed listing needs to buffer before the
/// cursor walk can stop. Zero means unlimited.
fn fetch_cap(limit: usize, offset: usize) -> usize {
    if limit == 0 {
        0
    } else {
        offset.saturating_add(limit)
    }
}

fn should_retry(err: &PosError) -> bool {
    matches!(err, PosError::Network(_) | PosError::RateLimited(_))
}

fn map_status(status: u16, body: String) -> PosError {
    match status {
        401 | 403 => PosError::Unauthorized(body),
        429 => PosError::RateLimited(body),
        _ => PosError::Api { status, body },
    }
}

/// Aggregate documents into sales metrics.
///
/// `document_type = None` and `Some("ALL")` both count every document;
/// anything else filters by type (case-insensitive). Blank types are
/// normalized to `UNKNOWN` before filtering and counting.
fn aggregate_metrics(
    documents: &[DocumentShort],
    document_type: Option<&str>,
) -> (usize, f64, BTreeMap<String, usize>) {
    let mut count = 0;
    let mut total_sum = 0.0;
    let mut document_types: BTreeMap<String, usize> = BTreeMap::new();

    for doc in documents {
        let doc_type = {
            let t = doc.r#type.trim();
            if t.is_empty() { "UNKNOWN" } else { t }
        };

        if let Some(wanted) = document_type {
            let wanted = wanted.to_uppercase();
            if wanted != "ALL" && doc_type.to_uppercase() != wanted {
                continue;
            }
        }

        count += 1;
        total_sum += doc.body.effective_total();
        *document_types.entry(doc_type.to_string()).or_insert(0) += 1;
    }

    (count, total_sum, document_types)
}

#[async_trait]
impl PosApi for PosClient {
    async fn list_stores(&self) -> Result<Vec<Store>, PosError> {
        if !self.has_token() {
            return Err(PosError::MissingToken);
        }

        let mut stores = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut query: Vec<(&str, String)> = Vec::new();
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            let page: Page<Store> = self.get("/stores", &query).await?;
            stores.extend(page.items);
            if page.paging.next_cursor.is_empty() {
                break;
            }
            cursor = page.paging.next_cursor;
        }

        debug!(count = stores.len(), "listed stores");
        Ok(stores)
    }

    async fn search_items(
        &self,
        query: &str,
        limit: usize,
        store_id: Option<&str>,
    ) -> Result<Vec<Item>, PosError> {
        if !self.has_token() {
            return Err(PosError::MissingToken);
        }
        if query.trim().is_empty() {
            return Err(PosError::EmptyQuery);
        }
        let store_id = self.resolve_store_id(store_id)?;

        let needle = query.trim().to_lowercase();
        let path = format!("/stores/{store_id}/products");
        let mut matches = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut params: Vec<(&str, String)> = vec![("fields", ITEM_FIELDS.to_string())];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.clone()));
            }

            let page: Page<Item> = self.get(&path, &params).await?;
            for item in page.items {
                if item.name.to_lowercase().contains(&needle) {
                    matches.push(item);
                    if limit > 0 && matches.len() >= limit {
                        return Ok(matches);
                    }
                }
            }

            if page.paging.next_cursor.is_empty() {
                break;
            }
            cursor = page.paging.next_cursor;
        }

        Ok(matches)
    }

    async fn search_documents(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        store_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DocumentShort>, PosError> {
        if !self.has_token() {
            return Err(PosError::MissingToken);
        }
        let store_id = self.resolve_store_id(store_id)?;

        let documents = self
            .fetch_documents(&store_id, from, to, fetch_cap(limit, offset))
            .await?;
        let window: Vec<DocumentShort> = documents
            .into_iter()
            .skip(offset)
            .take(if limit > 0 { limit } else { usize::MAX })
            .collect();

        debug!(count = window.len(), %store_id, "searched documents");
        Ok(window)
    }

    async fn get_document(
        &self,
        doc_id: &str,
        store_id: Option<&str>,
    ) -> Result<DocumentFull, PosError> {
        if !self.has_token() {
            return Err(PosError::MissingToken);
        }
        if doc_id.trim().is_empty() {
            return Err(PosError::MissingDocumentId);
        }
        let store_id = self.resolve_store_id(store_id)?;

        let path = format!("/stores/{store_id}/documents/{doc_id}");
        let mut doc: DocumentFull = self.get(&path, &[]).await?;
        doc.total = doc.body.effective_total();
        Ok(doc)
    }

    async fn sales_metrics(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        store_id: Option<&str>,
        document_type: Option<&str>,
    ) -> Result<SalesMetrics, PosError> {
        if !self.has_token() {
            return Err(PosError::MissingToken);
        }
        let store_id = self.resolve_store_id(store_id)?;

        let documents = self.fetch_documents(&store_id, from, to, 0).await?;
        let (count, total_sum, document_types) =
            aggregate_metrics(&documents, document_type);

        debug!(count, total_sum, %store_id, "aggregated sales metrics");
        Ok(SalesMetrics {
            count,
            total_sum,
            store_id,
            from: from.to_rfc3339_opts(SecondsFormat::Secs, true),
            to: to.to_rfc3339_opts(SecondsFormat::Secs, true),
            document_types,
        })
    }
}
