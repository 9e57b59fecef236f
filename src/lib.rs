//! Product Embeddings
//!
//! Backfills semantic embeddings for catalogue products stored in Supabase.
//!
//! # Features
//!
//! - **Embedding Text**: deterministic rendering of product records into model input
//! - **OpenAI Embeddings**: single-call embedder that fails soft on errors and dimension mismatch
//! - **Supabase Store**: PostgREST reads from the flat product view, writes to `products.embedding`
//! - **Backfill**: paged batch run with dry-run, missing-only and limit controls
//!
//! # Architecture
//!
//! ```text
//! chatbot_products_flat ──► ProductRecord ──► text ──► OpenAI /embeddings
//!        (PostgREST)                                        │
//!                                                           ▼
//!                         products.embedding ◄── Backfill ◄─ Vec<f32>
//! ```

pub mod backfill;
pub mod clients;
pub mod config;
pub mod embeddings;
pub mod product;
pub mod supabase;

#[cfg(test)]
mod testing;

pub use backfill::{Backfill, BackfillError, BackfillOptions, BackfillReport, ProductOutcome};
pub use clients::{init_clients, ClientFactory, Clients, HttpClientFactory};
pub use config::Config;
pub use embeddings::{
    Embedder, EmbeddingApi, EmbeddingError, EmbeddingRequest, EmbeddingResponse, OpenAiClient,
    DEFAULT_EMBEDDING_MODEL, EMBEDDING_DIMENSIONS,
};
pub use product::{generate_text_for_embedding, ProductRecord, ProductRow, MAX_EMBEDDING_CHARS};
pub use supabase::{ProductStore, StoreError, SupabaseClient};
