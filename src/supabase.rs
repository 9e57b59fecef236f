//! Supabase Product Store
//!
//! Minimal PostgREST client for reading flat product records and writing
//! embeddings back to the products table.

use crate::product::ProductRow;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Supabase error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Where product records are read from and embeddings written to
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Look up a single product row by id
    async fn fetch_product(&self, product_id: &str) -> Result<Option<ProductRow>, StoreError>;

    /// Page through product rows ordered by id
    async fn fetch_products(&self, offset: usize, limit: usize) -> Result<Vec<ProductRow>, StoreError>;

    /// Subset of `ids` whose stored embedding is null
    async fn ids_missing_embedding(&self, ids: &[String]) -> Result<Vec<String>, StoreError>;

    /// Store an embedding for one product
    async fn update_embedding(&self, product_id: &str, embedding: &[f32]) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: ProductStore + ?Sized> ProductStore for Arc<T> {
    async fn fetch_product(&self, product_id: &str) -> Result<Option<ProductRow>, StoreError> {
        (**self).fetch_product(product_id).await
    }

    async fn fetch_products(&self, offset: usize, limit: usize) -> Result<Vec<ProductRow>, StoreError> {
        (**self).fetch_products(offset, limit).await
    }

    async fn ids_missing_embedding(&self, ids: &[String]) -> Result<Vec<String>, StoreError> {
        (**self).ids_missing_embedding(ids).await
    }

    async fn update_embedding(&self, product_id: &str, embedding: &[f32]) -> Result<(), StoreError> {
        (**self).update_embedding(product_id, embedding).await
    }
}

#[derive(Debug, Deserialize)]
struct IdRow {
    #[serde(deserialize_with = "crate::product::id_from_string_or_number")]
    id: String,
}

/// Supabase REST client using the service-role key
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    rest_url: String,
    source_table: String,
    products_table: String,
}

impl SupabaseClient {
    pub fn new(url: &str, service_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        if url.trim().is_empty() {
            return Err(StoreError::Config("missing Supabase URL".to_string()));
        }

        let invalid_key = || StoreError::Config("invalid Supabase service key".to_string());
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(service_key).map_err(|_| invalid_key())?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", service_key)).map_err(|_| invalid_key())?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            source_table: "chatbot_products_flat".to_string(),
            products_table: "products".to_string(),
        })
    }

    /// Override the table names
    pub fn with_tables(mut self, source_table: impl Into<String>, products_table: impl Into<String>) -> Self {
        self.source_table = source_table.into();
        self.products_table = products_table.into();
        self
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// PostgREST `in.(...)` list; values are double-quoted so commas survive
pub(crate) fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl ProductStore for SupabaseClient {
    async fn fetch_product(&self, product_id: &str) -> Result<Option<ProductRow>, StoreError> {
        let eq = format!("eq.{}", product_id);
        let response = self
            .client
            .get(self.table_url(&self.source_table))
            .query(&[
                ("select", "product_id,product_data"),
                ("product_id", eq.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let mut rows: Vec<ProductRow> = Self::check(response).await?.json().await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn fetch_products(&self, offset: usize, limit: usize) -> Result<Vec<ProductRow>, StoreError> {
        let offset = offset.to_string();
        let limit = limit.to_string();
        let response = self
            .client
            .get(self.table_url(&self.source_table))
            .query(&[
                ("select", "product_id,product_data"),
                ("order", "product_id.asc"),
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let rows: Vec<ProductRow> = Self::check(response).await?.json().await?;
        debug!("Fetched {} product rows at offset {}", rows.len(), offset);
        Ok(rows)
    }

    async fn ids_missing_embedding(&self, ids: &[String]) -> Result<Vec<String>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let filter = in_filter(ids);
        let response = self
            .client
            .get(self.table_url(&self.products_table))
            .query(&[
                ("select", "id"),
                ("id", filter.as_str()),
                ("embedding", "is.null"),
            ])
            .send()
            .await?;

        let rows: Vec<IdRow> = Self::check(response).await?.json().await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn update_embedding(&self, product_id: &str, embedding: &[f32]) -> Result<(), StoreError> {
        let eq = format!("eq.{}", product_id);
        let response = self
            .client
            .patch(self.table_url(&self.products_table))
            .query(&[("id", eq.as_str())])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "embedding": embedding }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}
