//! Shared test doubles for the agent crate.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use salespilot_core::error::{PosError, ProviderError};
use salespilot_core::message::Message;
use salespilot_core::pos::{
    DocumentBody, DocumentFull, DocumentShort, Item, PosApi, SalesMetrics, Store,
};
use salespilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A provider that replays a fixed script of responses.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Message>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Message>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        Self {
            responses: Mutex::new(reversed),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let message = self
            .responses
            .lock()
            .unwrap()
            .pop()
            .ok_or(ProviderError::EmptyResponse)?;
        Ok(ProviderResponse {
            message,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "test-model".into(),
        })
    }
}

#[derive(Default)]
struct RecordingState {
    stores: Vec<Store>,
    items: Vec<Item>,
    documents: Vec<(String, String, DocumentBody)>,
    error: Option<PosError>,
    get_document_calls: usize,
    last_store_id: Option<String>,
}

/// A POS facade that serves canned data and records calls.
#[derive(Clone, Default)]
pub struct RecordingPos {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingPos {
    pub fn with_store(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().stores.push(Store {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_item(self, id: &str, name: &str, price: f64) -> Self {
        self.state.lock().unwrap().items.push(Item {
            id: id.into(),
            name: name.into(),
            price,
            code: String::new(),
            barcodes: Vec::new(),
            article_number: String::new(),
            measure_name: String::new(),
        });
        self
    }

    pub fn with_document(self, id: &str, doc_type: &str, body: DocumentBody) -> Self {
        self.state
            .lock()
            .unwrap()
            .documents
            .push((id.into(), doc_type.into(), body));
        self
    }

    pub fn failing(self, error: PosError) -> Self {
        self.state.lock().unwrap().error = Some(error);
        self
    }

    pub fn get_document_calls(&self) -> usize {
        self.state.lock().unwrap().get_document_calls
    }

    pub fn last_store_id(&self) -> Option<String> {
        self.state.lock().unwrap().last_store_id.clone()
    }

    fn check_error(&self) -> Result<(), PosError> {
        match &self.state.lock().unwrap().error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn note_store_id(&self, store_id: Option<&str>) {
        self.state.lock().unwrap().last_store_id = store_id.map(String::from);
    }
}

#[async_trait]
impl PosApi for RecordingPos {
    async fn list_stores(&self) -> Result<Vec<Store>, PosError> {
        self.check_error()?;
        Ok(self.state.lock().unwrap().stores.clone())
    }

    async fn search_items(
        &self,
        query: &str,
        limit: usize,
        store_id: Option<&str>,
    ) -> Result<Vec<Item>, PosError> {
        self.check_error()?;
        self.note_store_id(store_id);
        let needle = query.trim().to_lowercase();
        Ok(self
            .state
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn search_documents(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        store_id: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DocumentShort>, PosError> {
        self.check_error()?;
        self.note_store_id(store_id);
        Ok(self
            .state
            .lock()
            .unwrap()
            .documents
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(id, doc_type, body)| DocumentShort {
                id: id.clone(),
                r#type: doc_type.clone(),
                body: body.clone(),
                total: body.effective_total(),
                ..DocumentShort::default()
            })
            .collect())
    }

    async fn get_document(
        &self,
        doc_id: &str,
        store_id: Option<&str>,
    ) -> Result<DocumentFull, PosError> {
        self.check_error()?;
        {
            let mut state = self.state.lock().unwrap();
            state.get_document_calls += 1;
            state.last_store_id = store_id.map(String::from);
        }
        let state = self.state.lock().unwrap();
        let (id, doc_type, body) = state
            .documents
            .iter()
            .find(|(id, _, _)| id == doc_id)
            .cloned()
            .ok_or(PosError::Api {
                status: 404,
                body: "not found".into(),
            })?;
        Ok(DocumentFull {
            id,
            r#type: doc_type,
            total: body.effective_total(),
            body,
            ..DocumentFull::default()
        })
    }

    async fn sales_metrics(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        store_id: Option<&str>,
        document_type: Option<&str>,
    ) -> Result<SalesMetrics, PosError> {
        self.check_error()?;
        self.note_store_id(store_id);
        let state = self.state.lock().unwrap();
        let mut count = 0;
        let mut total_sum = 0.0;
        let mut document_types: BTreeMap<String, usize> = BTreeMap::new();
        for (_, doc_type, body) in &state.documents {
            if let Some(wanted) = document_type {
                let wanted = wanted.to_uppercase();
                if wanted != "ALL" && doc_type.to_uppercase() != wanted {
                    continue;
                }
            }
            count += 1;
            total_sum += body.effective_total();
            *document_types.entry(doc_type.clone()).or_insert(0) += 1;
        }
        Ok(SalesMetrics {
            count,
            total_sum,
            store_id: store_id.unwrap_or_default().to_string(),
            from: from.to_rfc3339_opts(SecondsFormat::Secs, true),
            to: to.to_rfc3339_opts(SecondsFormat::Secs, true),
            document_types,
        })
    }
}
