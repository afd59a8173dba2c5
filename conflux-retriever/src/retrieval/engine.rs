//! Query-time retrieval orchestration.
//!
//! [`RetrievalEngine::search`] is the one entry point the surrounding chat
//! logic calls. It embeds the query, asks the vector index for candidate
//! chunks, aggregates chunk scores into document scores, and gates the
//! result on a relevance threshold. When the embedding provider or the
//! index is unavailable it degrades to keyword search instead of failing;
//! a query never raises to the caller.

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::retrieval::keyword::keyword_search;
use crate::storage::VectorIndex;
use conflux_embed::{EmbeddingProvider, EmbeddingTask};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Characters of document text attached as the excerpt for keyword hits,
/// which have no matched chunk to cite.
const FALLBACK_PREVIEW_CHARS: usize = 500;

/// Excerpts attached per document for citation display.
const MAX_EXCERPTS_PER_DOCUMENT: usize = 3;

/// How a [`QueryResult`] was produced.
///
/// Callers surface the same result either way; the mode exists so they can
/// log degraded operation and optionally tell the user the answer came from
/// keyword matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Embedding-based similarity search.
    Semantic,
    /// Keyword fallback, used when semantic search was unavailable.
    Keyword,
}

/// One ranked document with citation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHit {
    /// Identifier of the matched document.
    pub document_id: String,
    /// Document title.
    pub title: String,
    /// Canonical document URL.
    pub url: String,
    /// Aggregate relevance score (0-1): the best contributing chunk's
    /// similarity, or the term-overlap fraction in keyword mode.
    pub score: f32,
    /// Supporting text spans, best match first.
    pub excerpts: Vec<String>,
}

/// Ranked documents for one query.
///
/// Zero hits is a valid answer meaning "no relevant information found" and
/// is how an empty or unrelated corpus surfaces, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Matched documents, best first.
    pub hits: Vec<DocumentHit>,
    /// How the hits were produced.
    pub mode: SearchMode,
}

impl QueryResult {
    fn empty(mode: SearchMode) -> Self {
        Self {
            hits: Vec::new(),
            mode,
        }
    }

    /// Whether the query matched nothing.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Outcome of one search attempt. Which branch was taken is an explicit
/// value, not a caught exception, so [`RetrievalEngine::search`] can report
/// the mode to its caller.
enum SearchOutcome {
    Semantic(Vec<DocumentHit>),
    Keyword(Vec<DocumentHit>),
}

/// Query-time entry point over a populated [`VectorIndex`].
///
/// Constructed once at startup and shared; holds no per-query state. All
/// searches are read-only against the index.
pub struct RetrievalEngine {
    index: VectorIndex,
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("index", &self.index)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    /// Create an engine over an index and an embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RetrievalError::Configuration`] if the configuration
    /// is invalid. This is the only fatal error in the query path.
    pub fn new(
        index: VectorIndex,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            index,
            provider,
            config,
        })
    }

    /// Search the corpus for documents relevant to `query`.
    ///
    /// Never fails: provider and index outages degrade to keyword search,
    /// and an empty or unrelated corpus yields an empty result.
    pub async fn search(&self, query: &str) -> QueryResult {
        match self.attempt(query).await {
            SearchOutcome::Semantic(hits) => QueryResult {
                hits,
                mode: SearchMode::Semantic,
            },
            SearchOutcome::Keyword(hits) => QueryResult {
                hits,
                mode: SearchMode::Keyword,
            },
        }
    }

    /// [`search`](Self::search) with a deadline.
    ///
    /// A query abandoned by its caller should not keep burning provider
    /// quota: on timeout the in-flight embedding and index calls are
    /// dropped and an empty result is returned.
    pub async fn search_with_timeout(&self, query: &str, deadline: Duration) -> QueryResult {
        match tokio::time::timeout(deadline, self.search(query)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?deadline, "search timed out, returning no results");
                QueryResult::empty(SearchMode::Semantic)
            }
        }
    }

    async fn attempt(&self, query: &str) -> SearchOutcome {
        match self.semantic_search(query).await {
            Ok(hits) => SearchOutcome::Semantic(hits),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(
                    error = %err,
                    "semantic search unavailable, falling back to keyword search"
                );
                SearchOutcome::Keyword(self.keyword_fallback(query).await)
            }
            Err(err) => {
                // A rejected query payload is our bug, not an outage;
                // keyword fallback would only mask it.
                tracing::warn!(error = %err, "semantic search rejected the query");
                SearchOutcome::Semantic(Vec::new())
            }
        }
    }

    /// Embedding-based search: embed, over-fetch chunks, aggregate per
    /// document, gate on the relevance threshold.
    async fn semantic_search(&self, query: &str) -> Result<Vec<DocumentHit>> {
        let vector = self.provider.embed(query, EmbeddingTask::Query).await?;
        let matches = self.index.query(&vector, self.config.fan_out()).await?;

        // Group chunks by document. A document's score is its best chunk,
        // not an average: one highly relevant chunk is enough to surface a
        // large document.
        let mut by_document: HashMap<String, DocumentHit> = HashMap::new();
        for (entry, similarity) in matches {
            let hit = by_document
                .entry(entry.document_id.clone())
                .or_insert_with(|| DocumentHit {
                    document_id: entry.document_id.clone(),
                    title: entry.title.clone(),
                    url: entry.url.clone(),
                    score: similarity,
                    excerpts: Vec::new(),
                });
            hit.score = hit.score.max(similarity);
            if hit.excerpts.len() < MAX_EXCERPTS_PER_DOCUMENT {
                // Chunks arrive ordered by similarity, so excerpts stay
                // best-first without re-sorting.
                hit.excerpts.push(entry.text);
            }
        }

        let mut hits: Vec<DocumentHit> = by_document
            .into_values()
            .filter(|hit| hit.score >= self.config.relevance_threshold)
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        hits.truncate(self.config.result_limit);

        tracing::debug!(query, hits = hits.len(), "semantic search completed");
        Ok(hits)
    }

    /// Keyword search over every indexed document.
    ///
    /// This is the "nothing works" safety net; its own failures degrade to
    /// an empty result rather than propagating.
    async fn keyword_fallback(&self, query: &str) -> Vec<DocumentHit> {
        let documents = match self.index.documents().await {
            Ok(documents) => documents,
            Err(err) => {
                tracing::warn!(error = %err, "keyword fallback could not load documents");
                return Vec::new();
            }
        };

        keyword_search(query, &documents, self.config.result_limit)
            .into_iter()
            .map(|(document, score)| DocumentHit {
                document_id: document.id.clone(),
                title: document.title.clone(),
                url: document.url.clone(),
                score,
                excerpts: vec![content_preview(&document.content)],
            })
            .collect()
    }
}

/// First `FALLBACK_PREVIEW_CHARS` characters of a document, as the excerpt
/// for keyword hits. Counts characters, not bytes.
fn content_preview(text: &str) -> String {
    text.chars().take(FALLBACK_PREVIEW_CHARS).collect()
}
