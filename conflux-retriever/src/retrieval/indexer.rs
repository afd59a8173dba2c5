//! Offline document indexing pipeline.

use crate::config::RetrievalConfig;
use crate::document::Document;
use crate::error::Result;
use crate::storage::{IndexEntry, VectorIndex};
use conflux_chunk::Chunker;
use conflux_embed::{EmbeddingProvider, EmbeddingTask};
use std::sync::Arc;

/// One document that could not be indexed, and why.
#[derive(Debug, Clone)]
pub struct IndexFailure {
    /// Identifier of the failed document.
    pub document_id: String,
    /// Human-readable failure cause.
    pub reason: String,
}

/// Summary of one indexing run.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    /// Documents fully chunked, embedded, and stored.
    pub documents_indexed: usize,
    /// Chunks written across all indexed documents.
    pub chunks_created: usize,
    /// Documents skipped or lost, with reasons.
    pub failures: Vec<IndexFailure>,
}

/// Chunks documents, embeds the chunks, and writes them to the index.
///
/// Safe to re-run over the same corpus: re-indexing a document replaces its
/// prior chunks rather than duplicating them.
pub struct DocumentIndexer {
    index: VectorIndex,
    provider: Arc<dyn EmbeddingProvider>,
    chunker: Chunker,
}

impl DocumentIndexer {
    /// Create an indexer over an index and an embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RetrievalError::Configuration`] if the chunking
    /// parameters are invalid.
    pub fn new(
        index: VectorIndex,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            index,
            provider,
            chunker,
        })
    }

    /// Index every document in `documents`.
    ///
    /// One document's embedding failure is recorded in the report and the
    /// run continues; a bad page must not abort a full reindex. A storage
    /// failure aborts the run, since nothing further can be written, and
    /// the documents processed so far are reported.
    pub async fn index(&self, documents: &[Document]) -> Result<IndexReport> {
        let mut report = IndexReport::default();

        for document in documents {
            let spans = self.chunker.chunk(&document.content);
            if spans.is_empty() {
                tracing::debug!(document_id = %document.id, "skipping empty document");
                report.failures.push(IndexFailure {
                    document_id: document.id.clone(),
                    reason: "document has no content".to_string(),
                });
                continue;
            }

            let texts: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
            let embeddings = match self
                .provider
                .embed_batch(&texts, EmbeddingTask::Document)
                .await
            {
                Ok(embeddings) => embeddings,
                Err(err) => {
                    tracing::warn!(
                        document_id = %document.id,
                        error = %err,
                        "embedding failed, skipping document"
                    );
                    report.failures.push(IndexFailure {
                        document_id: document.id.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let entries: Vec<IndexEntry> = spans
                .iter()
                .zip(embeddings)
                .map(|(span, embedding)| IndexEntry {
                    document_id: document.id.clone(),
                    chunk_index: span.index,
                    title: document.title.clone(),
                    url: document.url.clone(),
                    text: span.text.clone(),
                    embedding,
                })
                .collect();

            if let Err(err) = self.index.replace_document(document, &entries).await {
                tracing::error!(
                    document_id = %document.id,
                    error = %err,
                    "index write failed, aborting run"
                );
                report.failures.push(IndexFailure {
                    document_id: document.id.clone(),
                    reason: err.to_string(),
                });
                return Ok(report);
            }

            report.documents_indexed += 1;
            report.chunks_created += entries.len();
        }

        tracing::info!(
            documents = report.documents_indexed,
            chunks = report.chunks_created,
            failures = report.failures.len(),
            "indexing run completed"
        );
        Ok(report)
    }

    /// Discard the whole index and re-index `documents` from scratch.
    pub async fn reindex_all(&self, documents: &[Document]) -> Result<IndexReport> {
        self.index.rebuild().await?;
        self.index(documents).await
    }
}
