use crate::model::ProductRecord;
use crate::vector::{page_document_id, product_document_id, VectorDocument};
use chrono::Utc;
use serde_json::{json, Map, Value};

/// Searchable projection of a product
pub fn product_document(site_id: i64, product: &ProductRecord) -> VectorDocument {
    let categories: Vec<&str> = product.categories.iter().map(|c| c.name.as_str()).collect();

    let text = [
        format!("Product: {}", product.name),
        format!("SKU: {}", product.sku),
        format!("Price: {}", product.price),
        format!("Description: {}", product.description),
        format!("Short Description: {}", product.short_description),
        format!("Categories: {}", categories.join(", ")),
        format!("Tags: {}", product.tags.join(", ")),
        format!("Attributes: {}", product.attributes),
    ]
    .join("\n");

    let mut metadata = Map::new();
    metadata.insert("site_id".to_string(), json!(site_id.to_string()));
    metadata.insert(
        "product_id".to_string(),
        json!(product.remote_id.to_string()),
    );
    metadata.insert("name".to_string(), json!(product.name));
    metadata.insert("sku".to_string(), json!(product.sku));
    metadata.insert("price".to_string(), json!(product.price));
    metadata.insert("permalink".to_string(), json!(product.permalink));
    metadata.insert("in_stock".to_string(), Value::Bool(product.in_stock()));
    metadata.insert("type".to_string(), json!("product"));

    VectorDocument {
        id: product_document_id(site_id, product.remote_id),
        text,
        metadata,
    }
}

/// Page text keyed by a hash of its URL
pub fn page_document(site_id: i64, url: &str, content: &str, page_type: &str) -> VectorDocument {
    let mut metadata = Map::new();
    metadata.insert("site_id".to_string(), json!(site_id.to_string()));
    metadata.insert("url".to_string(), json!(url));
    metadata.insert("type".to_string(), json!(page_type));
    metadata.insert("crawled_at".to_string(), json!(Utc::now().to_rfc3339()));

    VectorDocument {
        id: page_document_id(site_id, url),
        text: content.to_string(),
        metadata,
    }
}
