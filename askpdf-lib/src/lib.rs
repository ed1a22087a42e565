//! askpdf - retrieval-augmented question answering over a PDF collection
//!
//! # Architecture
//!
//! ```text
//! documents/ -> Loaders -> Chunker -> Embedder -> MemoryStore ==> Snapshot (Corpus)
//!                                                                     |
//! question -> Embedder -> top-k search <------------------------------+
//!                              |
//!                       AnswerComposer -> Generator -> {think, answer}
//! ```
//!
//! Ingestion builds an immutable [`corpus::Snapshot`] off to the side and
//! swaps it in atomically; questions always run against one whole snapshot.
//!
//! # Example
//!
//! ```ignore
//! use askpdf_lib::{chunk::split, document::Document, embed::HashingEmbedder, store::MemoryStore};
//!
//! let document = Document::new("facts.txt", "The sky is blue. Water is wet.");
//! let chunks = split(&document, 20, 5)?;
//!
//! let embedder = HashingEmbedder::new(256);
//! let mut store = MemoryStore::new();
//! for chunk in chunks {
//!     let vector = embedder.embed_text(&chunk.content);
//!     store.add(chunk, vector)?;
//! }
//!
//! let results = store.search(&embedder.embed_text("What color is the sky?"), 3)?;
//! ```

pub mod answer;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embed;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod ollama;
pub mod retrieve;
pub mod retry;
pub mod service;
pub mod store;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use service::RagService;
