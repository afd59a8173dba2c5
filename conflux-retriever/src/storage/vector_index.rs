//! SQLite-backed vector index.
//!
//! ## Database Schema
//!
//! ```sql
//! -- Documents table: full page records for fallback search and citations
//! CREATE TABLE documents (
//!     id TEXT PRIMARY KEY,             -- stable page identifier
//!     space_key TEXT,                  -- Confluence space key
//!     title TEXT,
//!     content TEXT,                    -- raw page text
//!     url TEXT,
//!     last_updated TEXT,
//!     ...
//! );
//!
//! -- Chunks table: embedded segments, the unit of similarity search
//! CREATE TABLE chunks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     document_id TEXT REFERENCES documents(id),
//!     chunk_index INTEGER,             -- position within the document
//!     title TEXT,                      -- denormalized: map a hit back to
//!     url TEXT,                        --   its document without a lookup
//!     content TEXT,                    -- chunk text
//!     embedding BLOB                   -- f32 embedding vector
//! );
//! ```
//!
//! ## Invariants
//!
//! - `(document_id, chunk_index)` is unique: re-indexing a document replaces
//!   its chunks instead of duplicating them
//! - every embedding in the index has the same dimensionality, registered in
//!   `index_meta` on first insert and enforced on every write and query
//! - queries are deterministic: ties in similarity are broken by insertion
//!   order (rowid ascending)
//!
//! ## SQLite Configuration
//!
//! WAL mode for concurrent reads during writes, a large page size for the
//! embedding blobs, and foreign keys so deleting a document drops its chunks.

use crate::document::Document;
use crate::error::{Result, RetrievalError};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

const DB_FILE_NAME: &str = "conflux-index.db";
const DIMENSION_KEY: &str = "embedding_dimension";

/// One persisted (chunk text, embedding, citation metadata) tuple.
///
/// Carries the owning document's identifier, title, and URL so a matched
/// chunk maps back to its document without a separate lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Identifier of the owning document.
    pub document_id: String,
    /// Position of this chunk within the document (0-indexed).
    pub chunk_index: usize,
    /// Owning document's title.
    pub title: String,
    /// Owning document's URL.
    pub url: String,
    /// The chunk text.
    pub text: String,
    /// Embedding vector for the chunk text.
    pub embedding: Vec<f32>,
}

/// Corpus counts for diagnostics and monitoring.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    /// Number of indexed documents.
    pub documents: usize,
    /// Number of indexed chunks.
    pub chunks: usize,
    /// Documents per space, ordered by space key.
    pub spaces: Vec<(String, usize)>,
}

/// SQLite-backed persistent store of documents and embedded chunks.
///
/// Process-wide state: open it once at startup and share it by cloning (the
/// underlying connection pool is cheap to clone). An empty or absent store is
/// a valid state; queries against it return no results rather than failing.
#[derive(Clone, Debug)]
pub struct VectorIndex {
    pool: SqlitePool,
}

impl VectorIndex {
    /// Open (or create) the index under the given root directory.
    ///
    /// The directory and database file are created if absent, so a first run
    /// against a fresh path starts with an empty index rather than an error.
    pub async fn open(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(sqlx::Error::Io)?;
        let db_path = root.join(DB_FILE_NAME);

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .page_size(1 << 16)
                .optimize_on_close(true, 1 << 10),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Open an in-memory index for testing.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                space_key TEXT NOT NULL,
                space_name TEXT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                url TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                author TEXT,
                labels TEXT NOT NULL DEFAULT '[]',
                indexed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                CONSTRAINT unique_chunk UNIQUE(document_id, chunk_index),
                FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_space ON documents(space_key)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Dimensionality of the embeddings held by the index, if any were
    /// inserted yet.
    pub async fn dimension(&self) -> Result<Option<usize>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?1")
                .bind(DIMENSION_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// Register `actual` as the index dimension, or reject it if the index
    /// already holds embeddings of a different dimensionality.
    async fn ensure_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension().await? {
            Some(expected) if expected != actual => {
                Err(RetrievalError::DimensionMismatch { expected, actual })
            }
            Some(_) => Ok(()),
            None => {
                sqlx::query(
                    "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                )
                .bind(DIMENSION_KEY)
                .bind(actual.to_string())
                .execute(&self.pool)
                .await?;
                Ok(())
            }
        }
    }

    /// Insert or update a document record.
    pub async fn upsert_document(&self, document: &Document) -> Result<()> {
        let labels = serde_json::to_string(&document.labels).unwrap_or_else(|_| "[]".to_string());
        sqlx::query(
            r#"
            INSERT INTO documents (id, space_key, space_name, title, content, url, last_updated, author, labels, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                space_key = excluded.space_key,
                space_name = excluded.space_name,
                title = excluded.title,
                content = excluded.content,
                url = excluded.url,
                last_updated = excluded.last_updated,
                author = excluded.author,
                labels = excluded.labels,
                indexed_at = datetime('now')
            "#,
        )
        .bind(&document.id)
        .bind(&document.space_key)
        .bind(&document.space_name)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.url)
        .bind(&document.last_updated)
        .bind(&document.author)
        .bind(labels)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or update a single index entry, keyed on
    /// `(document_id, chunk_index)`.
    pub async fn upsert(&self, entry: &IndexEntry) -> Result<()> {
        self.upsert_many(std::slice::from_ref(entry)).await
    }

    /// Insert or update a batch of index entries in one transaction.
    ///
    /// Idempotent: re-upserting the same `(document_id, chunk_index)` keys
    /// replaces the prior rows instead of duplicating them.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::DimensionMismatch`] if any entry's embedding
    /// does not match the dimensionality the index already holds.
    pub async fn upsert_many(&self, entries: &[IndexEntry]) -> Result<()> {
        let Some(first) = entries.first() else {
            return Ok(());
        };
        let dim = first.embedding.len();
        for entry in entries {
            if entry.embedding.len() != dim {
                return Err(RetrievalError::DimensionMismatch {
                    expected: dim,
                    actual: entry.embedding.len(),
                });
            }
        }
        self.ensure_dimension(dim).await?;

        let mut tx = self.pool.begin().await?;
        for entry in entries {
            let embedding_bytes = bytemuck::cast_slice::<f32, u8>(&entry.embedding);
            sqlx::query(
                r#"
                INSERT INTO chunks (document_id, chunk_index, title, url, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(document_id, chunk_index) DO UPDATE SET
                    title = excluded.title,
                    url = excluded.url,
                    content = excluded.content,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&entry.document_id)
            .bind(entry.chunk_index as i64)
            .bind(&entry.title)
            .bind(&entry.url)
            .bind(&entry.text)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Replace a document and all of its chunks in one transaction.
    ///
    /// Unlike a plain upsert, this drops stale chunks left over when a
    /// document shrinks to fewer chunks than its previous indexing run. The
    /// document row and its chunks commit together: a failure anywhere rolls
    /// the whole replacement back, so readers never see new document content
    /// paired with the previous run's chunks.
    pub async fn replace_document(&self, document: &Document, entries: &[IndexEntry]) -> Result<()> {
        if let Some(first) = entries.first() {
            let dim = first.embedding.len();
            for entry in entries {
                if entry.embedding.len() != dim {
                    return Err(RetrievalError::DimensionMismatch {
                        expected: dim,
                        actual: entry.embedding.len(),
                    });
                }
            }
            self.ensure_dimension(dim).await?;
        }

        let labels = serde_json::to_string(&document.labels).unwrap_or_else(|_| "[]".to_string());
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO documents (id, space_key, space_name, title, content, url, last_updated, author, labels, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                space_key = excluded.space_key,
                space_name = excluded.space_name,
                title = excluded.title,
                content = excluded.content,
                url = excluded.url,
                last_updated = excluded.last_updated,
                author = excluded.author,
                labels = excluded.labels,
                indexed_at = datetime('now')
            "#,
        )
        .bind(&document.id)
        .bind(&document.space_key)
        .bind(&document.space_name)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.url)
        .bind(&document.last_updated)
        .bind(&document.author)
        .bind(labels)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?1")
            .bind(&document.id)
            .execute(&mut *tx)
            .await?;
        for entry in entries {
            let embedding_bytes = bytemuck::cast_slice::<f32, u8>(&entry.embedding);
            sqlx::query(
                "INSERT INTO chunks (document_id, chunk_index, title, url, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&entry.document_id)
            .bind(entry.chunk_index as i64)
            .bind(&entry.title)
            .bind(&entry.url)
            .bind(&entry.text)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Nearest-neighbor query by cosine similarity.
    ///
    /// Returns up to `k` entries ordered by similarity descending; ties are
    /// broken by insertion order so repeated identical queries return
    /// identical results. `k` larger than the index returns everything. An
    /// empty index returns an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::DimensionMismatch`] if the query vector's
    /// dimensionality differs from what the index holds.
    pub async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(IndexEntry, f32)>> {
        match self.dimension().await? {
            None => return Ok(Vec::new()),
            Some(expected) if expected != vector.len() => {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            Some(_) => {}
        }

        let rows = sqlx::query(
            "SELECT document_id, chunk_index, title, url, content, embedding
             FROM chunks ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(IndexEntry, f32)> = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = Self::entry_from_row(&row);
            let similarity = cosine_similarity(vector, &entry.embedding);
            scored.push((entry, similarity));
        }

        // Stable sort preserves the rowid-ascending fetch order for ties.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> IndexEntry {
        let chunk_index: i64 = row.get("chunk_index");
        let embedding_bytes: Vec<u8> = row.get("embedding");
        IndexEntry {
            document_id: row.get("document_id"),
            chunk_index: chunk_index as usize,
            title: row.get("title"),
            url: row.get("url"),
            text: row.get("content"),
            // pod_collect_to_vec copies, so the blob's alignment is irrelevant.
            embedding: bytemuck::pod_collect_to_vec::<u8, f32>(&embedding_bytes),
        }
    }

    fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Document {
        let labels_json: String = row.get("labels");
        Document {
            id: row.get("id"),
            space_key: row.get("space_key"),
            space_name: row.get("space_name"),
            title: row.get("title"),
            content: row.get("content"),
            url: row.get("url"),
            last_updated: row.get("last_updated"),
            author: row.get("author"),
            labels: serde_json::from_str(&labels_json).unwrap_or_default(),
        }
    }

    /// All indexed documents, ordered by identifier.
    pub async fn documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::document_from_row).collect())
    }

    /// Fetch one document by identifier.
    pub async fn document_by_id(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::document_from_row))
    }

    /// All documents belonging to one space, ordered by identifier.
    pub async fn documents_by_space(&self, space_key: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM documents WHERE space_key = ?1 ORDER BY id ASC")
            .bind(space_key)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::document_from_row).collect())
    }

    /// Number of chunk entries currently held.
    pub async fn entry_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    /// Corpus counts for diagnostics.
    pub async fn stats(&self) -> Result<IndexStats> {
        let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT space_key, COUNT(*) AS n FROM documents GROUP BY space_key ORDER BY space_key",
        )
        .fetch_all(&self.pool)
        .await?;
        let spaces = rows
            .iter()
            .map(|row| {
                let n: i64 = row.get("n");
                (row.get::<String, _>("space_key"), n as usize)
            })
            .collect();
        Ok(IndexStats {
            documents: documents as usize,
            chunks: chunks as usize,
            spaces,
        })
    }

    /// Discard every document, chunk, and the dimension registration.
    ///
    /// After a rebuild the index behaves exactly like a fresh one, including
    /// accepting embeddings of a new dimensionality.
    pub async fn rebuild(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM index_meta")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!("vector index rebuilt: all entries discarded");
        Ok(())
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0 for mismatched lengths or zero-norm inputs.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot_product += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_document(id: &str) -> Document {
        Document {
            id: id.to_string(),
            space_key: "ENG".to_string(),
            space_name: Some("Engineering".to_string()),
            title: format!("Page {id}"),
            content: format!("Content of page {id}"),
            url: format!("https://wiki.example.com/{id}"),
            last_updated: "2024-01-01".to_string(),
            author: Some("alice".to_string()),
            labels: vec!["docs".to_string()],
        }
    }

    fn test_entry(document_id: &str, chunk_index: usize, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            document_id: document_id.to_string(),
            chunk_index,
            title: format!("Page {document_id}"),
            url: format!("https://wiki.example.com/{document_id}"),
            text: format!("chunk {chunk_index} of {document_id}"),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_on_key() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        index.upsert_document(&test_document("a")).await?;

        index.upsert(&test_entry("a", 0, vec![1.0, 0.0])).await?;
        index.upsert(&test_entry("a", 0, vec![0.0, 1.0])).await?;

        assert_eq!(index.entry_count().await?, 1);

        // The second write won.
        let results = index.query(&[0.0, 1.0], 10).await?;
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        index.upsert_document(&test_document("a")).await?;

        index
            .upsert_many(&[
                test_entry("a", 0, vec![0.0, 1.0]),
                test_entry("a", 1, vec![1.0, 0.0]),
                test_entry("a", 2, vec![0.7, 0.7]),
            ])
            .await?;

        let results = index.query(&[1.0, 0.0], 10).await?;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0.chunk_index, 1);
        assert_eq!(results[1].0.chunk_index, 2);
        assert_eq!(results[2].0.chunk_index, 0);
        assert!(results[0].1 > results[1].1);
        assert!(results[1].1 > results[2].1);
        Ok(())
    }

    #[tokio::test]
    async fn test_ties_break_by_insertion_order() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        index.upsert_document(&test_document("a")).await?;
        index.upsert_document(&test_document("b")).await?;

        // Identical embeddings: similarity ties across both documents.
        index.upsert(&test_entry("b", 0, vec![1.0, 0.0])).await?;
        index.upsert(&test_entry("a", 0, vec![1.0, 0.0])).await?;

        let first = index.query(&[1.0, 0.0], 10).await?;
        let second = index.query(&[1.0, 0.0], 10).await?;

        // "b" was inserted first, so it stays first; and the order is stable
        // across repeated identical queries.
        assert_eq!(first[0].0.document_id, "b");
        assert_eq!(first[1].0.document_id, "a");
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn test_k_larger_than_index_returns_all() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        index.upsert_document(&test_document("a")).await?;
        index
            .upsert_many(&[
                test_entry("a", 0, vec![1.0, 0.0]),
                test_entry("a", 1, vec![0.0, 1.0]),
            ])
            .await?;

        let results = index.query(&[1.0, 0.0], 100).await?;
        assert_eq!(results.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_index_returns_no_results() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        let results = index.query(&[1.0, 0.0], 5).await?;
        assert!(results.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        index.upsert_document(&test_document("a")).await?;
        index.upsert(&test_entry("a", 0, vec![1.0, 0.0])).await?;

        let err = index
            .upsert(&test_entry("a", 1, vec![1.0, 0.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::DimensionMismatch { .. }));

        let err = index.query(&[1.0, 0.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_rebuild_discards_everything() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        index.upsert_document(&test_document("a")).await?;
        index.upsert(&test_entry("a", 0, vec![1.0, 0.0])).await?;

        index.rebuild().await?;

        assert_eq!(index.entry_count().await?, 0);
        assert!(index.documents().await?.is_empty());
        assert_eq!(index.dimension().await?, None);

        // A new dimensionality is acceptable after a rebuild.
        index.upsert_document(&test_document("a")).await?;
        index
            .upsert(&test_entry("a", 0, vec![1.0, 0.0, 0.0]))
            .await?;
        assert_eq!(index.dimension().await?, Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_document_drops_stale_chunks() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        let doc = test_document("a");
        index
            .replace_document(
                &doc,
                &[
                    test_entry("a", 0, vec![1.0, 0.0]),
                    test_entry("a", 1, vec![0.0, 1.0]),
                    test_entry("a", 2, vec![0.5, 0.5]),
                ],
            )
            .await?;
        assert_eq!(index.entry_count().await?, 3);

        // The document shrank to two chunks; chunk 2 must disappear.
        index
            .replace_document(
                &doc,
                &[
                    test_entry("a", 0, vec![1.0, 0.0]),
                    test_entry("a", 1, vec![0.0, 1.0]),
                ],
            )
            .await?;
        assert_eq!(index.entry_count().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_replace_rolls_back_document_row() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;

        let mut doc = test_document("a");
        doc.content = "old content".to_string();
        let mut old_entry = test_entry("a", 0, vec![1.0, 0.0]);
        old_entry.text = "old chunk".to_string();
        index.replace_document(&doc, &[old_entry]).await?;

        // A duplicate (document_id, chunk_index) in the batch aborts the
        // insert partway through; the whole replacement must roll back.
        doc.content = "new content".to_string();
        let mut new_entry = test_entry("a", 0, vec![0.0, 1.0]);
        new_entry.text = "new chunk".to_string();
        let err = index
            .replace_document(&doc, &[new_entry.clone(), new_entry])
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Index { .. }));

        // The document row still matches the chunks being served.
        let stored = index.document_by_id("a").await?.unwrap();
        assert_eq!(stored.content, "old content");
        let results = index.query(&[1.0, 0.0], 10).await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.text, "old chunk");
        Ok(())
    }

    #[tokio::test]
    async fn test_document_lookups_and_stats() -> anyhow::Result<()> {
        let index = VectorIndex::open_memory().await?;
        index.upsert_document(&test_document("a")).await?;
        index.upsert_document(&test_document("b")).await?;
        let mut other = test_document("c");
        other.space_key = "OPS".to_string();
        index.upsert_document(&other).await?;

        let fetched = index.document_by_id("a").await?.unwrap();
        assert_eq!(fetched, test_document("a"));
        assert!(index.document_by_id("zzz").await?.is_none());

        let eng = index.documents_by_space("ENG").await?;
        assert_eq!(eng.len(), 2);

        let stats = index.stats().await?;
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.chunks, 0);
        assert_eq!(
            stats.spaces,
            vec![("ENG".to_string(), 2), ("OPS".to_string(), 1)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;

        {
            let index = VectorIndex::open(temp_dir.path()).await?;
            index.upsert_document(&test_document("a")).await?;
            index.upsert(&test_entry("a", 0, vec![1.0, 0.0])).await?;
        }

        let reopened = VectorIndex::open(temp_dir.path()).await?;
        assert_eq!(reopened.entry_count().await?, 1);
        assert_eq!(reopened.dimension().await?, Some(2));
        Ok(())
    }

    #[test]
    fn test_cosine_similarity() {
        // Identical vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        // Orthogonal vectors
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        // Opposite vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        // Zero vector
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        // Mismatched lengths
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }
}
