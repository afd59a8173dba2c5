//! Sliding-window chunking for document text.
//!
//! This module splits raw document text into overlapping fixed-size segments
//! that serve as the atomic unit of embedding and retrieval. Each chunk
//! carries its sequence number and character offset so that a matched chunk
//! can be traced back to its position in the source document.
//!
//! The splitter is character-based: `chunk_size` and `overlap` count Unicode
//! scalar values, and splits always land on `char` boundaries, never inside a
//! multi-byte code point.
//!
//! # Reconstruction invariant
//!
//! Consecutive chunks overlap by exactly `overlap` characters. Dropping the
//! `overlap`-character prefix of every chunk after the first and
//! concatenating the rest reconstructs the original text:
//!
//! ```
//! use conflux_chunk::Chunker;
//!
//! let chunker = Chunker::new(1000, 200).unwrap();
//! let text: String = (0..100).map(|_| "the quick brown fox ").collect();
//! let chunks = chunker.chunk(&text);
//!
//! let mut rebuilt = String::new();
//! for (i, chunk) in chunks.iter().enumerate() {
//!     let skip = if i == 0 { 0 } else { 200 };
//!     rebuilt.extend(chunk.text.chars().skip(skip));
//! }
//! assert_eq!(rebuilt, text);
//! ```

use serde::{Deserialize, Serialize};

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Errors raised when chunking parameters are invalid.
///
/// These are configuration errors: they are raised when a [`Chunker`] is
/// constructed, not during chunking, so a bad configuration fails at startup
/// rather than partway through an indexing run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChunkError {
    /// The chunk size was zero, which would never make progress.
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    /// The overlap was at least as large as the chunk size, so the window
    /// could never advance.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// A single segment of document text produced by [`Chunker::chunk`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpan {
    /// The sequence number of this chunk within the document (0-indexed).
    pub index: usize,
    /// Character offset of the chunk start within the document text.
    pub offset: usize,
    /// The text content of this chunk.
    pub text: String,
}

/// Splits document text into overlapping fixed-size chunks.
///
/// The chunker is a pure function of its inputs: chunking the same text with
/// the same parameters always yields the same sequence of [`ChunkSpan`]s.
/// It holds no state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker with the given window size and overlap, both in
    /// characters.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::ZeroChunkSize`] if `chunk_size` is zero and
    /// [`ChunkError::OverlapTooLarge`] if `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker with [`DEFAULT_CHUNK_SIZE`] and
    /// [`DEFAULT_CHUNK_OVERLAP`].
    pub fn with_defaults() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered, overlapping chunks.
    ///
    /// Empty text yields an empty vector. Text no longer than the chunk size
    /// yields exactly one chunk equal to the whole text. Every chunk's
    /// character length is at most the configured chunk size, and only the
    /// last chunk may be shorter. Consecutive chunk starts advance by
    /// `chunk_size - overlap` characters.
    pub fn chunk(&self, text: &str) -> Vec<ChunkSpan> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every character boundary, plus the end of the text,
        // so char-indexed windows can be sliced without re-walking the string.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let stride = self.chunk_size - self.overlap;
        let mut chunks = Vec::with_capacity(char_count / stride + 1);
        let mut start = 0usize;

        loop {
            let end = (start + self.chunk_size).min(char_count);
            chunks.push(ChunkSpan {
                index: chunks.len(),
                offset: start,
                text: text[boundaries[start]..boundaries[end]].to_string(),
            });
            if end == char_count {
                break;
            }
            start += stride;
        }

        chunks
    }
}
