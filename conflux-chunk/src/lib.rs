pub mod window;

// Re-export the main chunking types for external use
pub use window::{ChunkError, ChunkSpan, Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
