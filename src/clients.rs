//! External Client Initialisation
//!
//! Validates credentials in [`Config`] before constructing the Supabase and
//! OpenAI clients. Constructors go through [`ClientFactory`] so they can be
//! replaced in tests.

use crate::config::Config;
use crate::embeddings::{EmbeddingApi, EmbeddingError, OpenAiClient};
use crate::supabase::{ProductStore, StoreError, SupabaseClient};
use tracing::{error, info};

/// Constructs the two external clients
pub trait ClientFactory {
    type Store: ProductStore;
    type Api: EmbeddingApi;

    fn supabase(&self, url: &str, service_key: &str) -> Result<Self::Store, StoreError>;

    fn openai(&self, api_key: &str) -> Result<Self::Api, EmbeddingError>;
}

/// Initialised clients
pub struct Clients<S, A> {
    pub store: S,
    pub embeddings: A,
}

/// Build both clients, or `None` if any required credential is missing.
///
/// When a credential is missing neither constructor is called.
pub fn init_clients<F: ClientFactory>(
    config: &Config,
    factory: &F,
) -> Option<Clients<F::Store, F::Api>> {
    let (url, service_key, api_key) = match (
        config.supabase_url.as_deref(),
        config.supabase_service_key.as_deref(),
        config.openai_api_key.as_deref(),
    ) {
        (Some(url), Some(key), Some(api_key)) => (url, key, api_key),
        _ => {
            error!(
                "Missing required environment variables: {}",
                config.missing_required().join(", ")
            );
            return None;
        }
    };

    let store = match factory.supabase(url, service_key) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create Supabase client: {}", e);
            return None;
        }
    };

    let embeddings = match factory.openai(api_key) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to create OpenAI client: {}", e);
            return None;
        }
    };

    info!("Supabase and OpenAI clients initialised");
    Some(Clients { store, embeddings })
}

/// Real HTTP clients, using base URLs, tables and timeout from config
pub struct HttpClientFactory<'a> {
    config: &'a Config,
}

impl<'a> HttpClientFactory<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }
}

impl ClientFactory for HttpClientFactory<'_> {
    type Store = SupabaseClient;
    type Api = OpenAiClient;

    fn supabase(&self, url: &str, service_key: &str) -> Result<SupabaseClient, StoreError> {
        Ok(SupabaseClient::new(url, service_key, self.config.request_timeout)?
            .with_tables(&self.config.source_table, &self.config.products_table))
    }

    fn openai(&self, api_key: &str) -> Result<OpenAiClient, EmbeddingError> {
        OpenAiClient::new(api_key, &self.config.openai_base_url, self.config.request_timeout)
    }
}
