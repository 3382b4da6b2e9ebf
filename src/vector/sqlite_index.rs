//! File-backed vector index stored in a single SQLite database

use crate::vector::{
    Embedder, VectorDocument, VectorError, VectorHit, VectorIndex, VectorResult, INDEX_FILE_NAME,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS vector_documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    document TEXT NOT NULL,
    metadata TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);
"#;

/// Persistent vector index with brute-force cosine search
pub struct SqliteVectorIndex {
    conn: Connection,
    embedder: Box<dyn Embedder>,
}

impl SqliteVectorIndex {
    /// Opens or creates the index file inside `persist_directory`
    pub fn open(persist_directory: &Path, embedder: Box<dyn Embedder>) -> VectorResult<Self> {
        std::fs::create_dir_all(persist_directory)?;
        let conn = Connection::open(persist_directory.join(INDEX_FILE_NAME))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn, embedder })
    }

    pub fn open_in_memory(embedder: Box<dyn Embedder>) -> VectorResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn, embedder })
    }

    /// Names of all collections holding at least one document
    pub fn collections(&self) -> VectorResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT collection FROM vector_documents ORDER BY collection")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn upsert(&mut self, collection: &str, document: &VectorDocument) -> VectorResult<()> {
        let embedding = self.embedder.embed(&document.text);
        if embedding.len() != self.embedder.dimension() {
            return Err(VectorError::DimensionMismatch {
                expected: self.embedder.dimension(),
                actual: embedding.len(),
            });
        }
        let metadata = serde_json::to_string(&document.metadata)?;

        self.conn.execute(
            "INSERT INTO vector_documents (collection, id, document, metadata, dimension, embedding, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(collection, id) DO UPDATE SET
                document = excluded.document,
                metadata = excluded.metadata,
                dimension = excluded.dimension,
                embedding = excluded.embedding,
                updated_at = excluded.updated_at",
            params![
                collection,
                document.id,
                document.text,
                metadata,
                embedding.len() as i64,
                encode_embedding(&embedding),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> VectorResult<Option<VectorDocument>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT document, metadata FROM vector_documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(text, metadata)| -> VectorResult<VectorDocument> {
            Ok(VectorDocument {
                id: id.to_string(),
                text,
                metadata: parse_metadata(&metadata)?,
            })
        })
        .transpose()
    }

    fn count(&self, collection: &str) -> VectorResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM vector_documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn query(&self, collection: &str, text: &str, limit: usize) -> VectorResult<Vec<VectorHit>> {
        let probe = self.embedder.embed(text);

        let mut stmt = self.conn.prepare(
            "SELECT id, document, metadata, dimension, embedding
             FROM vector_documents WHERE collection = ?1",
        )?;
        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut hits = Vec::with_capacity(rows.len());
        for (id, text, metadata, dimension, blob) in rows {
            let embedding = decode_embedding(&blob, dimension.max(0) as usize)?;
            let Some(score) = cosine_similarity(&probe, &embedding) else {
                continue;
            };
            hits.push(VectorHit {
                id,
                text,
                metadata: parse_metadata(&metadata)?,
                score,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

fn parse_metadata(raw: &str) -> VectorResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of_val(vector));
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_embedding(blob: &[u8], dimension: usize) -> VectorResult<Vec<f32>> {
    let expected_len = dimension * std::mem::size_of::<f32>();
    if blob.len() != expected_len {
        return Err(VectorError::InvalidEmbedding(format!(
            "expected {} bytes, got {}",
            expected_len,
            blob.len()
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// `None` for mismatched lengths or zero vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
