//! Product Records and Embedding Text
//!
//! Structured product data as stored in the flat catalogue view, and the
//! deterministic text rendering that is fed to the embedding model.

use serde::{Deserialize, Deserializer, Serialize};

/// Heuristic character cap for embedding input (~4 chars per token, model limit ~8k tokens)
pub const MAX_EMBEDDING_CHARS: usize = 20_000;

/// Name and description block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Category tag (e.g. "Gifts" of type "occasion")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Purchasable variant of a product
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    #[serde(default)]
    pub option_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Product record as found in `product_data`.
///
/// Every field is optional; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub product_info: Option<ProductInfo>,
    #[serde(default)]
    pub categories: Option<Vec<Category>>,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub options: Option<Vec<ProductOption>>,
}

/// One row of the flat catalogue view
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductRow {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub product_id: String,
    #[serde(default)]
    pub product_data: Option<ProductRecord>,
}

/// Ids come back as JSON strings or numbers depending on the column type
pub(crate) fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Render a product record into the text used for its embedding.
///
/// Clauses appear in a fixed order (name, description, categories,
/// ingredients, options), each only when its data is present, joined by
/// `". "`. The last clause never carries a trailing period. Returns an empty
/// string when there is nothing to render.
pub fn generate_text_for_embedding(record: Option<&ProductRecord>) -> String {
    let record = match record {
        Some(r) => r,
        None => return String::new(),
    };

    let mut parts: Vec<String> = Vec::new();

    if let Some(info) = &record.product_info {
        if let Some(name) = present(&info.name) {
            parts.push(format!("Product Name: {}", name));
        }
        if let Some(description) = present(&info.description) {
            let description = description.strip_suffix('.').unwrap_or(description);
            parts.push(format!("Description: {}", description));
        }
    }

    if let Some(categories) = &record.categories {
        let names: Vec<&str> = categories.iter().filter_map(|c| present(&c.name)).collect();
        if !names.is_empty() {
            parts.push(format!("Categories: {}", names.join(", ")));
        }
    }

    if let Some(ingredients) = &record.ingredients {
        let items: Vec<&str> = ingredients
            .iter()
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
            .collect();
        if !items.is_empty() {
            parts.push(format!("Key Ingredients: {}", items.join(", ")));
        }
    }

    if let Some(options) = &record.options {
        let rendered: Vec<String> = options
            .iter()
            .filter_map(|opt| {
                let name = present(&opt.option_name)?;
                Some(match present(&opt.description) {
                    Some(desc) => format!("Option: {} ({})", name, desc),
                    None => format!("Option: {}", name),
                })
            })
            .collect();
        if !rendered.is_empty() {
            parts.push(format!("Available Options: {}", rendered.join(", ")));
        }
    }

    parts.join(". ")
}

/// Cap text at [`MAX_EMBEDDING_CHARS`] characters, on a char boundary
pub fn truncate_for_embedding(text: &str) -> &str {
    match text.char_indices().nth(MAX_EMBEDDING_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
