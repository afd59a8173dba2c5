//! Literal term-overlap search.
//!
//! The safety net when the embedding provider or vector index is down: it
//! touches no network and no database, only the document records it is
//! handed. It never fails; the worst it can do is return nothing.

use crate::document::Document;
use std::collections::HashSet;

/// Score documents by the fraction of distinct query terms they contain.
///
/// Terms are lowercased and split on non-alphanumeric boundaries, in both
/// the query and the document text. A document's score is the number of
/// distinct query terms found in it divided by the number of distinct query
/// terms, so a document containing every term scores 1.0. Documents with no
/// matching terms are excluded entirely.
///
/// Results are ordered by score descending; equal scores are ordered by
/// document identifier ascending so repeated searches are deterministic.
pub fn keyword_search<'a>(
    query: &str,
    documents: &'a [Document],
    limit: usize,
) -> Vec<(&'a Document, f32)> {
    let query_terms: HashSet<String> = tokenize(query).collect();
    if query_terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&Document, f32)> = documents
        .iter()
        .filter_map(|document| {
            let haystack: HashSet<String> =
                tokenize(&document.title).chain(tokenize(&document.content)).collect();
            let matched = query_terms.iter().filter(|t| haystack.contains(*t)).count();
            if matched == 0 {
                None
            } else {
                Some((document, matched as f32 / query_terms.len() as f32))
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.id.cmp(&b.0.id))
    });
    scored.truncate(limit);
    scored
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
