//! Mock OpenAI + PostgREST server for integration tests

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const DIMS: usize = 1536;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: &'static str,
    pub params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

#[derive(Default)]
pub struct MockState {
    pub rows: Vec<Value>,
    pub embedded: HashSet<String>,
    pub requests: Vec<Recorded>,
}

pub type Shared = Arc<Mutex<MockState>>;

impl MockState {
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}

fn row_id(row: &Value) -> String {
    match &row["product_id"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn record(
    state: &Shared,
    method: &'static str,
    path: &'static str,
    params: HashMap<String, String>,
    headers: &HeaderMap,
    body: Value,
) {
    state.lock().unwrap().requests.push(Recorded {
        method,
        path,
        params,
        headers: header_map(headers),
        body,
    });
}

async fn embeddings(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "POST", "/v1/embeddings", HashMap::new(), &headers, body.clone());

    let text = body["input"][0].as_str().unwrap_or_default();
    if text.contains("Broken") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"message": "The server had an error"}})),
        );
    }
    let dims = if text.contains("Short") { DIMS - 1 } else { DIMS };
    let vector = vec![0.5f32; dims];
    let model = body["model"].clone();

    (
        StatusCode::OK,
        Json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": vector}],
            "model": model,
            "usage": {"prompt_tokens": 8, "total_tokens": 8}
        })),
    )
}

async fn flat_products(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "GET", "/rest/v1/chatbot_products_flat", params.clone(), &headers, Value::Null);

    let guard = state.lock().unwrap();
    if let Some(id) = params.get("product_id").and_then(|v| v.strip_prefix("eq.")) {
        let rows: Vec<Value> = guard.rows.iter().filter(|r| row_id(r) == id).cloned().collect();
        return Json(Value::Array(rows));
    }

    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(usize::MAX);
    let rows: Vec<Value> = guard.rows.iter().skip(offset).take(limit).cloned().collect();
    Json(Value::Array(rows))
}

async fn products_missing(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "GET", "/rest/v1/products", params.clone(), &headers, Value::Null);

    let list = params
        .get("id")
        .and_then(|v| v.strip_prefix("in.("))
        .and_then(|v| v.strip_suffix(')'))
        .unwrap_or_default();
    let guard = state.lock().unwrap();
    let rows: Vec<Value> = list
        .split(',')
        .map(|id| id.trim_matches('"').to_string())
        .filter(|id| !id.is_empty() && !guard.embedded.contains(id))
        .map(|id| json!({"id": id}))
        .collect();
    Json(Value::Array(rows))
}

async fn products_update(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    record(&state, "PATCH", "/rest/v1/products", params.clone(), &headers, body);

    match params.get("id").and_then(|v| v.strip_prefix("eq.")) {
        Some(id) => {
            state.lock().unwrap().embedded.insert(id.to_string());
            StatusCode::NO_CONTENT
        }
        None => StatusCode::BAD_REQUEST,
    }
}

/// Start the mock server; returns its base URL and shared state
pub async fn spawn(rows: Vec<Value>, embedded: &[&str]) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockState {
        rows,
        embedded: embedded.iter().map(|s| s.to_string()).collect(),
        requests: Vec::new(),
    }));

    let router = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/rest/v1/chatbot_products_flat", get(flat_products))
        .route("/rest/v1/products", get(products_missing).patch(products_update))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

pub fn catalogue() -> Vec<Value> {
    vec![
        json!({
            "product_id": "1001",
            "product_data": {
                "product_info": {
                    "name": "Deluxe Fruit Basket",
                    "description": "A wonderful assortment of fresh fruits."
                },
                "categories": [
                    {"name": "Gifts", "type": "occasion"},
                    {"name": "Healthy", "type": "dietary"}
                ],
                "ingredients": ["apple", "banana", "orange"],
                "options": [
                    {"option_name": "Large", "description": "Serves 5-7 people"},
                    {"option_name": "Small", "description": "Serves 2-3 people"}
                ]
            }
        }),
        json!({"product_id": "1002", "product_data": {"product_info": {"name": "Basic Apple"}}}),
        json!({"product_id": "1003", "product_data": null}),
        json!({"product_id": 1004, "product_data": {"product_info": {"name": "Broken Basket"}}}),
    ]
}
