//! Embedding Backfill
//!
//! Pages through flat product records, renders each into embedding text,
//! embeds it and writes the vector back. Per-product failures are counted
//! and skipped; only a failed page fetch stops the run.

use crate::config::Config;
use crate::embeddings::{EmbeddingApi, Embedder};
use crate::product::{generate_text_for_embedding, ProductRow};
use crate::supabase::{ProductStore, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Backfill run options
#[derive(Debug, Clone)]
pub struct BackfillOptions {
    /// Rows fetched per page
    pub batch_size: usize,
    /// Stop after scanning this many rows
    pub limit: Option<usize>,
    /// Embed but do not write
    pub dry_run: bool,
    /// Only embed products whose stored embedding is null
    pub missing_only: bool,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            limit: None,
            dry_run: false,
            missing_only: false,
        }
    }
}

impl BackfillOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            ..Self::default()
        }
    }
}

/// Summary of a backfill run
#[derive(Debug, Clone, Serialize)]
pub struct BackfillReport {
    pub scanned: usize,
    pub already_embedded: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failed_ids: Vec<String>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BackfillReport {
    fn start(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            scanned: 0,
            already_embedded: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            failed_ids: Vec::new(),
            dry_run,
            started_at: now,
            finished_at: now,
        }
    }

    /// True when no product failed
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

impl fmt::Display for BackfillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}scanned={}, updated={}, skipped={}, failed={}, already_embedded={} ({}ms)",
            if self.dry_run { "[dry run] " } else { "" },
            self.scanned,
            self.updated,
            self.skipped,
            self.failed,
            self.already_embedded,
            self.elapsed_ms()
        )
    }
}

/// Single-product errors
#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("Product {0} not found")]
    NotFound(String),

    #[error("Could not generate text for embedding for product {0}")]
    NoText(String),

    #[error("Failed to generate embedding for product {0}")]
    EmbeddingFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of embedding one product
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOutcome {
    pub product_id: String,
    pub embedding_length: usize,
    pub text_length: usize,
}

enum RowOutcome {
    Updated,
    Skipped,
    Failed,
}

/// Backfill driver
pub struct Backfill<S, A> {
    store: S,
    embedder: Embedder<A>,
}

impl<S: ProductStore, A: EmbeddingApi> Backfill<S, A> {
    pub fn new(store: S, embedder: Embedder<A>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Embed every product row, page by page
    pub async fn run(&self, options: &BackfillOptions) -> Result<BackfillReport, StoreError> {
        let batch_size = options.batch_size.max(1);
        let mut report = BackfillReport::start(options.dry_run);
        let mut offset = 0usize;

        info!(
            "Starting backfill: model={}, batch_size={}, limit={:?}, dry_run={}, missing_only={}",
            self.embedder.model(),
            batch_size,
            options.limit,
            options.dry_run,
            options.missing_only
        );

        loop {
            let want = match options.limit {
                Some(limit) => batch_size.min(limit.saturating_sub(offset)),
                None => batch_size,
            };
            if want == 0 {
                break;
            }

            // Servers may cap page size below `want`; only an empty page ends the scan
            let rows = self.store.fetch_products(offset, want).await?;
            let fetched = rows.len();
            if fetched == 0 {
                break;
            }
            offset += fetched;
            report.scanned += fetched;

            let rows = if options.missing_only {
                self.filter_missing(rows, &mut report).await?
            } else {
                rows
            };

            for row in &rows {
                match self.process_row(row, options.dry_run).await {
                    RowOutcome::Updated => report.updated += 1,
                    RowOutcome::Skipped => report.skipped += 1,
                    RowOutcome::Failed => {
                        report.failed += 1;
                        report.failed_ids.push(row.product_id.clone());
                    }
                }
            }

            debug!("Processed page ending at offset {}", offset);
        }

        report.finished_at = Utc::now();
        info!("Backfill finished: {}", report);
        Ok(report)
    }

    async fn filter_missing(
        &self,
        rows: Vec<ProductRow>,
        report: &mut BackfillReport,
    ) -> Result<Vec<ProductRow>, StoreError> {
        let ids: Vec<String> = rows.iter().map(|r| r.product_id.clone()).collect();
        let missing: HashSet<String> = self
            .store
            .ids_missing_embedding(&ids)
            .await?
            .into_iter()
            .collect();

        let before = rows.len();
        let rows: Vec<ProductRow> = rows
            .into_iter()
            .filter(|r| missing.contains(&r.product_id))
            .collect();
        report.already_embedded += before - rows.len();
        Ok(rows)
    }

    async fn process_row(&self, row: &ProductRow, dry_run: bool) -> RowOutcome {
        let text = generate_text_for_embedding(row.product_data.as_ref());
        if text.is_empty() {
            warn!("No embeddable text for product {}, skipping", row.product_id);
            return RowOutcome::Skipped;
        }

        let embedding = match self.embedder.get_embedding(&text).await {
            Some(embedding) => embedding,
            None => {
                warn!("Failed to generate embedding for product {}", row.product_id);
                return RowOutcome::Failed;
            }
        };

        if dry_run {
            debug!(
                "[dry run] product {}: {} dims from {} chars",
                row.product_id,
                embedding.len(),
                text.len()
            );
            return RowOutcome::Updated;
        }

        match self.store.update_embedding(&row.product_id, &embedding).await {
            Ok(()) => {
                debug!("Stored embedding for product {}", row.product_id);
                RowOutcome::Updated
            }
            Err(e) => {
                warn!("Failed to store embedding for product {}: {}", row.product_id, e);
                RowOutcome::Failed
            }
        }
    }

    /// Embed and store a single product
    pub async fn embed_product(&self, product_id: &str) -> Result<ProductOutcome, BackfillError> {
        let row = self
            .store
            .fetch_product(product_id)
            .await?
            .ok_or_else(|| BackfillError::NotFound(product_id.to_string()))?;

        let text = generate_text_for_embedding(row.product_data.as_ref());
        if text.is_empty() {
            return Err(BackfillError::NoText(product_id.to_string()));
        }
        debug!("Generated text for embedding: {}", text.chars().take(100).collect::<String>());

        let embedding = self
            .embedder
            .get_embedding(&text)
            .await
            .ok_or_else(|| BackfillError::EmbeddingFailed(product_id.to_string()))?;

        self.store.update_embedding(&row.product_id, &embedding).await?;

        info!(
            "Stored embedding for product {} ({} dims)",
            row.product_id,
            embedding.len()
        );

        Ok(ProductOutcome {
            product_id: row.product_id,
            embedding_length: embedding.len(),
            text_length: text.len(),
        })
    }
}
