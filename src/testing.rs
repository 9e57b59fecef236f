//! In-memory fakes for the embedding API and product store

use crate::embeddings::{EmbeddingApi, EmbeddingError, EmbeddingRequest, EmbeddingResponse};
use crate::product::{ProductRecord, ProductRow};
use crate::supabase::{ProductStore, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

type Responder =
    Box<dyn Fn(&EmbeddingRequest) -> Result<EmbeddingResponse, EmbeddingError> + Send + Sync>;

/// Records every request and answers through a closure
pub struct MockEmbeddingApi {
    calls: Mutex<Vec<EmbeddingRequest>>,
    respond: Responder,
}

impl MockEmbeddingApi {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&EmbeddingRequest) -> Result<EmbeddingResponse, EmbeddingError> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Always returns one vector of `dimensions` values
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self::new(move |_| Ok(EmbeddingResponse::from_vectors(vec![vec![0.1; dimensions]])))
    }

    /// Always fails with the given HTTP status
    pub fn failing(status: u16) -> Self {
        Self::new(move |_| {
            Err(EmbeddingError::Api {
                status,
                body: "OpenAI API Down".to_string(),
            })
        })
    }

    pub fn calls(&self) -> Vec<EmbeddingRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingApi for MockEmbeddingApi {
    async fn create(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, EmbeddingError> {
        let result = (self.respond)(&request);
        self.calls.lock().unwrap().push(request);
        result
    }
}

/// Product store backed by a vector of rows
#[derive(Default)]
pub struct MemoryProductStore {
    rows: Vec<ProductRow>,
    already_embedded: HashSet<String>,
    reject_updates: HashSet<String>,
    fail_fetch_at: Option<usize>,
    max_rows_per_page: Option<usize>,
    pub updates: Mutex<HashMap<String, Vec<f32>>>,
    pub page_requests: Mutex<Vec<(usize, usize)>>,
}

impl MemoryProductStore {
    pub fn with_rows(rows: Vec<ProductRow>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Mark ids as already carrying an embedding
    pub fn already_embedded(mut self, ids: &[&str]) -> Self {
        self.already_embedded = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Make updates for these ids fail
    pub fn reject_updates(mut self, ids: &[&str]) -> Self {
        self.reject_updates = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Fail the page fetch starting at `offset`
    pub fn fail_fetch_at(mut self, offset: usize) -> Self {
        self.fail_fetch_at = Some(offset);
        self
    }

    /// Return at most `max` rows per page, like PostgREST `max-rows`
    pub fn max_rows_per_page(mut self, max: usize) -> Self {
        self.max_rows_per_page = Some(max);
        self
    }

    pub fn updated_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.updates.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

pub fn row(id: &str, data: serde_json::Value) -> ProductRow {
    let product_data: Option<ProductRecord> = if data.is_null() {
        None
    } else {
        Some(serde_json::from_value(data).unwrap())
    };
    ProductRow {
        product_id: id.to_string(),
        product_data,
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn fetch_product(&self, product_id: &str) -> Result<Option<ProductRow>, StoreError> {
        Ok(self.rows.iter().find(|r| r.product_id == product_id).cloned())
    }

    async fn fetch_products(&self, offset: usize, limit: usize) -> Result<Vec<ProductRow>, StoreError> {
        self.page_requests.lock().unwrap().push((offset, limit));
        if self.fail_fetch_at == Some(offset) {
            return Err(StoreError::Api {
                status: 500,
                body: "connection reset".to_string(),
            });
        }
        let limit = self.max_rows_per_page.map_or(limit, |max| limit.min(max));
        Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn ids_missing_embedding(&self, ids: &[String]) -> Result<Vec<String>, StoreError> {
        Ok(ids
            .iter()
            .filter(|id| !self.already_embedded.contains(*id))
            .cloned()
            .collect())
    }

    async fn update_embedding(&self, product_id: &str, embedding: &[f32]) -> Result<(), StoreError> {
        if self.reject_updates.contains(product_id) {
            return Err(StoreError::Api {
                status: 400,
                body: "invalid input syntax for type vector".to_string(),
            });
        }
        self.updates
            .lock()
            .unwrap()
            .insert(product_id.to_string(), embedding.to_vec());
        Ok(())
    }
}
