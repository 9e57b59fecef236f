//! Configuration management

use crate::embeddings::{DEFAULT_EMBEDDING_MODEL, DEFAULT_OPENAI_BASE_URL, EMBEDDING_DIMENSIONS};
use std::path::Path;
use std::time::Duration;

/// Backfill configuration
///
/// Built once at startup and passed to whatever needs it. The three
/// credential fields are optional here; [`crate::clients::init_clients`]
/// decides whether they are sufficient.
#[derive(Debug, Clone)]
pub struct Config {
    /// Supabase project URL (e.g. `https://xyz.supabase.co`)
    pub supabase_url: Option<String>,

    /// Supabase service-role key
    pub supabase_service_key: Option<String>,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API root
    pub openai_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Expected embedding length
    pub embedding_dimensions: usize,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Rows fetched per backfill page
    pub batch_size: usize,

    /// View holding `product_id` + `product_data`
    pub source_table: String,

    /// Table holding the `embedding` column
    pub products_table: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_service_key: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: EMBEDDING_DIMENSIONS,
            request_timeout: Duration::from_secs(30),
            batch_size: 50,
            source_table: "chatbot_products_flat".to_string(),
            products_table: "products".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let supabase_service_key =
            get("SUPABASE_SERVICE_KEY").or_else(|| get("SUPABASE_SERVICE_ROLE_KEY"));

        let embedding_dimensions = get("EMBEDDING_DIMENSIONS")
            .and_then(|v| v.parse().ok())
            .filter(|d: &usize| *d > 0)
            .unwrap_or(defaults.embedding_dimensions);

        let request_timeout = get("EMBEDDING_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|s: &u64| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let batch_size = get("BACKFILL_BATCH_SIZE")
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.batch_size);

        Self {
            supabase_url: get("SUPABASE_URL"),
            supabase_service_key,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimensions,
            request_timeout,
            batch_size,
            source_table: get("PRODUCTS_SOURCE_TABLE").unwrap_or(defaults.source_table),
            products_table: get("PRODUCTS_TABLE").unwrap_or(defaults.products_table),
        }
    }

    /// Load `.env.local` then `.env` into the process environment.
    ///
    /// Variables already set are left alone; missing files are ignored.
    pub fn load_dotenv() {
        Self::load_dotenv_from(Path::new("."));
    }

    /// Same as [`Config::load_dotenv`], reading the files from `dir`
    pub fn load_dotenv_from(dir: &Path) {
        for file in [".env.local", ".env"] {
            let path = dir.join(file);
            if path.exists() {
                if let Err(e) = dotenvy::from_path(&path) {
                    tracing::warn!("Failed to load {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Names of required variables that are not set
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.supabase_url.is_none() {
            missing.push("SUPABASE_URL");
        }
        if self.supabase_service_key.is_none() {
            missing.push("SUPABASE_SERVICE_KEY");
        }
        if self.openai_api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        missing
    }
}
