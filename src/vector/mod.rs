//! Vector index for semantic search over catalog text
//!
//! Documents live in named collections and are keyed by deterministic ids so
//! that re-indexing the same entity replaces its text, metadata and embedding.

mod document;
mod embed;
mod sqlite_index;

pub use document::{page_document, product_document};
pub use embed::{Embedder, HashingEmbedder};
pub use sqlite_index::SqliteVectorIndex;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Base name of the product collection
pub const PRODUCTS_COLLECTION: &str = "products";

/// Base name of the page collection
pub const PAGES_COLLECTION: &str = "pages";

/// File holding the index inside the persist directory
pub const INDEX_FILE_NAME: &str = "index.sqlite3";

/// Errors raised by vector index backends
#[derive(Debug, Error)]
pub enum VectorError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid stored embedding: {0}")]
    InvalidEmbedding(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

/// A text document with flat metadata
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDocument {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

/// A query match, best first
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
    pub score: f64,
}

/// Trait for vector index backends
pub trait VectorIndex {
    /// Inserts the document or replaces the one with the same id
    fn upsert(&mut self, collection: &str, document: &VectorDocument) -> VectorResult<()>;

    fn get(&self, collection: &str, id: &str) -> VectorResult<Option<VectorDocument>>;

    fn count(&self, collection: &str) -> VectorResult<u64>;

    /// Nearest documents to `text` by cosine similarity
    fn query(&self, collection: &str, text: &str, limit: usize) -> VectorResult<Vec<VectorHit>>;
}

/// `site:<site_id>:product:<remote_id>`
pub fn product_document_id(site_id: i64, remote_id: i64) -> String {
    format!("site:{}:product:{}", site_id, remote_id)
}

/// `site:<site_id>:page:<first 16 hex chars of sha256(url)>`
pub fn page_document_id(site_id: i64, url: &str) -> String {
    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("site:{}:page:{}", site_id, &digest[..16])
}

/// Collection name, optionally partitioned per site
pub fn collection_name(base: &str, site_id: i64, per_site: bool) -> String {
    if per_site {
        format!("{}_site_{}", base, site_id)
    } else {
        base.to_string()
    }
}
