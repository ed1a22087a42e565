//! Error types for askpdf

use thiserror::Error;

/// Result type alias for askpdf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in askpdf operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid chunking or pipeline parameters
    #[error("configuration error: {0}")]
    Config(String),

    /// Loading, parsing or embedding the corpus failed; the run was aborted
    #[error("ingestion error: {0}")]
    Ingestion(String),

    /// A document could not be read or its text extracted
    #[error("document error: {0}")]
    Document(String),

    /// Failed to load or run the embedding model
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A vector did not match the dimensionality established by the index
    #[error("dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Query was embedded with a different model than the corpus
    #[error("embedding model mismatch: corpus built with '{corpus}', query embedded with '{query}'")]
    EmbeddingModelMismatch { corpus: String, query: String },

    /// Invalid input provided
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No corpus snapshot exists and none could be built
    #[error("no corpus available")]
    NoCorpus,

    /// The generation provider kept failing after all retries
    #[error("generation error: {0}")]
    Generation(String),
}
