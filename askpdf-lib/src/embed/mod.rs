//! Text embedding providers
//!
//! The pipeline only ever talks to the [`Embedder`] trait. Three backends ship
//! with the crate:
//! - [`OllamaEmbedder`]: a model served by a local Ollama daemon
//! - [`BgeEmbedder`]: BAAI/bge-large-en-v1.5 in-process via fastembed (ONNX runtime)
//! - [`HashingEmbedder`]: deterministic bag-of-words feature hashing, no model needed
//!
//! Documents and queries must be embedded by the same provider and model;
//! vectors from different embedding spaces are not comparable.
//!
//! # Usage
//!
//! ```ignore
//! use askpdf_lib::embed::{Embedder, HashingEmbedder};
//!
//! let embedder = HashingEmbedder::new(512);
//!
//! // Embed documents (for indexing)
//! let doc_embeddings = embedder.embed_documents(&["Page one...", "Page two..."]).await?;
//!
//! // Embed query (for searching)
//! let query_embedding = embedder.embed_query("What does the contract say?").await?;
//! ```

use async_trait::async_trait;

use crate::Result;

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed multiple documents for indexing
    ///
    /// Returns exactly one embedding per input, in input order.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single query for searching
    ///
    /// Note: Some models (like BGE) use different prompts for queries vs documents.
    /// This method handles that distinction.
    async fn embed_query(&self, text: &str) -> Result<Embedding>;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

mod bge;
mod hashing;
mod ollama;

pub use bge::*;
pub use hashing::*;
pub use ollama::*;
