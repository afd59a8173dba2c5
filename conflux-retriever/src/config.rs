//! Configuration for the retrieval engine and document indexer.

use crate::error::{Result, RetrievalError};
use serde::{Deserialize, Serialize};

/// Tunable parameters for chunking, search, and relevance gating.
///
/// The defaults come from the deployed system; none of them is load-bearing,
/// and callers are expected to tune them per corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Minimum similarity (0-1) for a document to count as a genuine match.
    pub relevance_threshold: f32,
    /// Maximum number of documents returned per query.
    pub result_limit: usize,
    /// Over-fetch multiplier: the index is asked for
    /// `result_limit * fan_out_factor` chunks so document-level aggregation
    /// has enough candidates to draw from.
    pub fan_out_factor: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            relevance_threshold: 0.4,
            result_limit: 5,
            fan_out_factor: 3,
        }
    }
}

impl RetrievalConfig {
    /// Set the maximum chunk length in characters.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn with_chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Set the minimum similarity for a document to count as a match.
    pub fn with_relevance_threshold(mut self, relevance_threshold: f32) -> Self {
        self.relevance_threshold = relevance_threshold;
        self
    }

    /// Set the maximum number of documents returned per query.
    pub fn with_result_limit(mut self, result_limit: usize) -> Self {
        self.result_limit = result_limit;
        self
    }

    /// Set the chunk over-fetch multiplier.
    pub fn with_fan_out_factor(mut self, fan_out_factor: usize) -> Self {
        self.fan_out_factor = fan_out_factor;
        self
    }

    /// Number of chunks to request from the index per query.
    pub fn fan_out(&self) -> usize {
        self.result_limit * self.fan_out_factor
    }

    /// Reject invalid parameter combinations.
    ///
    /// This is meant to run at startup: a configuration error is fatal, not
    /// something to degrade around.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Configuration`] describing the first
    /// violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RetrievalError::configuration(
                "chunk_size must be greater than zero",
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RetrievalError::configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(RetrievalError::configuration(format!(
                "relevance_threshold ({}) must be between 0 and 1",
                self.relevance_threshold
            )));
        }
        if self.result_limit == 0 {
            return Err(RetrievalError::configuration(
                "result_limit must be greater than zero",
            ));
        }
        if self.fan_out_factor == 0 {
            return Err(RetrievalError::configuration(
                "fan_out_factor must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.relevance_threshold, 0.4);
        assert_eq!(config.result_limit, 5);
        assert_eq!(config.fan_out(), 15);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let config = RetrievalConfig::default()
            .with_chunk_size(200)
            .with_chunk_overlap(200);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RetrievalError::Configuration { .. }));
    }

    #[test]
    fn test_threshold_range() {
        let config = RetrievalConfig::default().with_relevance_threshold(1.5);
        assert!(config.validate().is_err());

        let config = RetrievalConfig::default().with_relevance_threshold(-0.1);
        assert!(config.validate().is_err());

        let config = RetrievalConfig::default().with_relevance_threshold(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(
            RetrievalConfig::default()
                .with_result_limit(0)
                .validate()
                .is_err()
        );
        assert!(
            RetrievalConfig::default()
                .with_fan_out_factor(0)
                .validate()
                .is_err()
        );
        assert!(
            RetrievalConfig::default()
                .with_chunk_size(0)
                .validate()
                .is_err()
        );
    }
}
