use crate::chunk::{spans_to_chunks, validate, Chunk, Chunker};
use crate::document::Document;
use crate::Result;

/// Fixed-size chunker - splits purely by character count
///
/// Good for: baseline experiments, text without natural boundaries
///
/// Produces exactly `ceil((len - overlap) / (size - overlap))` chunks for a
/// document longer than one chunk.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    /// Create a fixed-size chunker.
    ///
    /// Fails with [`crate::Error::Config`] on `chunk_size == 0` or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        validate(chunk_size, overlap)?;
        Ok(Self { chunk_size, overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &str {
        "fixed"
    }

    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.content.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let stride = self.chunk_size - self.overlap;
        let mut spans = Vec::with_capacity(chars.len().div_ceil(stride));
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(chars.len());
            spans.push((start, end));
            if end == chars.len() {
                break;
            }
            start += stride;
        }

        spans_to_chunks(document, &chars, &spans)
    }
}
