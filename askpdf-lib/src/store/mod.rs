//! Vector storage backends
//!
//! A store is write-once, read-many: it is filled during ingestion and then
//! only queried. Rebuilding means constructing a fresh store, never mutating
//! one that readers can see.
//!
//! # Storage Model
//!
//! Each stored item consists of:
//! - Chunk: the original text and metadata
//! - Embedding: the vector representation
//!
//! The first insertion fixes the store's dimensionality.
//!
//! # Usage
//!
//! ```ignore
//! use askpdf_lib::store::{VectorStore, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//!
//! // Insert chunks with their embeddings
//! store.insert(&chunks, &embeddings)?;
//!
//! // Search by vector similarity
//! let results = store.search(&query_embedding, 5)?;
//! ```

use serde::Serialize;

use crate::chunk::Chunk;
use crate::embed::Embedding;
use crate::{Error, Result};

/// A search result with similarity score
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity, -1.0 to 1.0 (higher is more similar)
    pub score: f32,
}

/// Trait for vector storage backends
pub trait VectorStore: Send + Sync {
    /// Append one chunk with its embedding
    ///
    /// Fails with [`Error::DimensionMismatch`] if the embedding length differs
    /// from the dimensionality set by the first insertion.
    fn add(&mut self, chunk: Chunk, embedding: Embedding) -> Result<()>;

    /// Insert chunks with their embeddings
    ///
    /// # Arguments
    /// * `chunks` - The text chunks to store
    /// * `embeddings` - Corresponding embeddings (must be same length)
    fn insert(&mut self, chunks: &[Chunk], embeddings: &[Embedding]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::InvalidArgument(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            self.add(chunk.clone(), embedding.clone())?;
        }
        Ok(())
    }

    /// Search for similar chunks
    ///
    /// # Arguments
    /// * `query_embedding` - The query vector
    /// * `k` - Number of results to return, must be at least 1
    ///
    /// # Returns
    /// Top-k results sorted by similarity (highest first), ties in insertion order.
    /// An empty store yields no results.
    fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Get total number of stored chunks
    fn len(&self) -> usize;

    /// Check if store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality of stored vectors, once known
    fn dimension(&self) -> Option<usize>;
}

mod memory;

pub use memory::*;
