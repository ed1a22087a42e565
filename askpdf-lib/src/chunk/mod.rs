//! Document chunking strategies
//!
//! Both strategies cut a document into character windows of at most
//! `chunk_size` characters, where consecutive windows share exactly
//! `chunk_overlap` characters:
//! - [`FixedSizeChunker`]: hard cuts every `chunk_size - chunk_overlap` characters
//! - [`RecursiveChunker`]: moves each cut back to the nearest paragraph,
//!   sentence or word boundary when one is available
//!
//! Sizes are counted in `char`s, never bytes, so multi-byte text is never
//! split inside a code point.
//!
//! # Usage
//!
//! ```ignore
//! use askpdf_lib::chunk::{split, Chunker, RecursiveChunker};
//!
//! let chunks = split(&document, 1000, 200)?;
//!
//! let chunker = RecursiveChunker::new(1000, 200)?;
//! let chunks = chunker.chunk(&document);
//! ```

use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentMetadata};
use crate::{Error, Result};

/// A chunk of text with its metadata
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Chunk {
    /// Unique identifier for this chunk, `{document_id}:{chunk_index}`
    pub id: String,
    /// Identifier of the document this chunk was cut from
    pub document_id: String,
    /// The text content of this chunk
    pub content: String,
    /// Metadata about the source and position
    pub metadata: ChunkMetadata,
}

/// Metadata associated with a chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ChunkMetadata {
    /// Provenance inherited from the source document
    #[serde(flatten)]
    pub document: DocumentMetadata,
    /// Index of this chunk within its document (0-indexed)
    pub chunk_index: usize,
    /// Character offset of the chunk start within the document
    pub position: usize,
    /// Total number of chunks cut from the same document
    pub total_chunks: usize,
}

/// Trait for document chunking strategies
pub trait Chunker: Send + Sync {
    /// Split a document into chunks
    ///
    /// Returns an empty `Vec` for an empty document.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Returns the name of this chunking strategy
    fn name(&self) -> &str;
}

/// Split `document` with the default boundary-aware strategy.
///
/// Fails with [`Error::Config`] unless `chunk_size > 0` and `chunk_overlap < chunk_size`.
pub fn split(document: &Document, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    Ok(RecursiveChunker::new(chunk_size, chunk_overlap)?.chunk(document))
}

/// Check the window parameters shared by every strategy.
pub(crate) fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::Config("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(Error::Config(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Turn character spans `[start, end)` of `chars` into chunks of `document`.
fn spans_to_chunks(document: &Document, chars: &[char], spans: &[(usize, usize)]) -> Vec<Chunk> {
    let total = spans.len();
    spans
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| Chunk {
            id: format!("{}:{i}", document.id),
            document_id: document.id.clone(),
            content: chars[start..end].iter().collect(),
            metadata: ChunkMetadata {
                document: document.metadata.clone(),
                chunk_index: i,
                position: start,
                total_chunks: total,
            },
        })
        .collect()
}

mod fixed;
mod recursive;

pub use fixed::*;
pub use recursive::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_size() {
        assert!(matches!(validate(0, 0), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_size() {
        assert!(matches!(validate(10, 10), Err(Error::Config(_))));
        assert!(matches!(validate(10, 11), Err(Error::Config(_))));
        assert!(validate(10, 9).is_ok());
        assert!(validate(1, 0).is_ok());
    }

    #[test]
    fn test_split_uses_boundaries() {
        let doc = Document::new("facts.txt", "The sky is blue. Water is wet.");
        let chunks = split(&doc, 20, 5).unwrap();

        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].content, "The sky is blue. ");
        assert!(chunks.iter().all(|c| c.document_id == "facts.txt"));
    }

    #[test]
    fn test_split_rejects_bad_params() {
        let doc = Document::new("x", "text");
        assert!(matches!(split(&doc, 5, 5), Err(Error::Config(_))));
    }

    #[test]
    fn test_chunk_metadata_inherits_document() {
        let mut doc = Document::new("book.pdf#3", "0123456789abcdefghij");
        doc.metadata.page = Some(3);
        doc.metadata.total_pages = Some(9);

        let chunks = FixedSizeChunker::new(10, 0).unwrap().chunk(&doc);
        assert_eq!(chunks[1].id, "book.pdf#3:1");
        assert_eq!(chunks[1].metadata.document.page, Some(3));
        assert_eq!(chunks[1].metadata.document.total_pages, Some(9));
        assert_eq!(chunks[1].metadata.total_chunks, 2);
    }

    #[test]
    fn test_metadata_serializes_flat() {
        let doc = Document::new("a.txt", "hello");
        let chunks = split(&doc, 10, 0).unwrap();
        let json = serde_json::to_value(&chunks[0].metadata).unwrap();

        assert_eq!(json["source"], "a.txt");
        assert_eq!(json["chunk_index"], 0);
        assert!(json.get("page").is_none());
    }
}
