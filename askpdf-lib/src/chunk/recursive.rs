use crate::chunk::{spans_to_chunks, validate, Chunk, Chunker};
use crate::document::Document;
use crate::Result;

/// Boundaries tried in order, strongest first. A cut lands just after the separator.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", "; ", ", ", " "];

/// Boundary-aware chunker - the default strategy
///
/// Good for: prose extracted from PDFs
///
/// Each window starts `chunk_overlap` characters before the previous cut, so
/// the overlap is always exact. The cut itself is pulled back from the hard
/// `chunk_size` limit to the strongest boundary found in the back half of the
/// window; without any boundary it behaves like [`super::FixedSizeChunker`].
///
/// Window starts never trail the fixed-size grid by a whole stride, so a
/// document yields at most one chunk more than the fixed strategy would.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    overlap: usize,
}

impl RecursiveChunker {
    /// Create a boundary-aware chunker.
    ///
    /// Fails with [`crate::Error::Config`] on `chunk_size == 0` or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        validate(chunk_size, overlap)?;
        Ok(Self { chunk_size, overlap })
    }

    fn spans(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let separators: Vec<Vec<char>> = SEPARATORS.iter().map(|s| s.chars().collect()).collect();

        let stride = self.chunk_size - self.overlap;

        let mut spans = Vec::new();
        let mut start = 0;
        for window in 0.. {
            let hard_end = (start + self.chunk_size).min(chars.len());
            if hard_end == chars.len() {
                spans.push((start, hard_end));
                break;
            }

            // the next start must land past this window's grid start, which
            // also guarantees progress; no chunk is cut below half the window
            let earliest = (window * stride + self.overlap + 1).max(start + self.chunk_size / 2);
            let end = find_boundary(chars, start, earliest, hard_end, &separators)
                .unwrap_or(hard_end);

            spans.push((start, end));
            start = end - self.overlap;
        }
        spans
    }
}

impl Chunker for RecursiveChunker {
    fn name(&self) -> &str {
        "recursive"
    }

    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.content.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let spans = self.spans(&chars);
        spans_to_chunks(document, &chars, &spans)
    }
}

/// Latest cut in `earliest..=latest` that directly follows a separator lying
/// wholly inside the window, trying separators strongest first.
fn find_boundary(
    chars: &[char],
    start: usize,
    earliest: usize,
    latest: usize,
    separators: &[Vec<char>],
) -> Option<usize> {
    separators.iter().find_map(|sep| {
        (earliest..=latest)
            .rev()
            .find(|&cut| cut >= start + sep.len() && chars[cut - sep.len()..cut] == sep[..])
    })
}
