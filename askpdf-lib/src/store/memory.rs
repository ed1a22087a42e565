use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::chunk::Chunk;
use crate::embed::Embedding;
use crate::store::{SearchResult, VectorStore};
use crate::{Error, Result};

/// In-memory vector store.
///
/// Uses brute-force cosine similarity over every stored vector, keeping the
/// best `k` in a bounded heap. Suitable for single-process corpora of tens of
/// thousands of chunks. Entries keep insertion order, which is also the
/// order used for listing.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<Entry>,
    dimension: Option<usize>,
}

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    embedding: Embedding,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> impl ExactSizeIterator<Item = &Chunk> + '_ {
        self.entries.iter().map(|e| &e.chunk)
    }
}

impl VectorStore for MemoryStore {
    fn add(&mut self, chunk: Chunk, embedding: Embedding) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != embedding.len() => {
                return Err(Error::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            Some(_) => {}
            None => self.dimension = Some(embedding.len()),
        }

        self.entries.push(Entry { chunk, embedding });
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }
        let Some(expected) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }

        // min-heap of the best k seen so far; its top is the weakest keeper
        let mut best = BinaryHeap::with_capacity(k + 1);
        for (index, entry) in self.entries.iter().enumerate() {
            best.push(Reverse(Ranked {
                score: cosine_similarity(query, &entry.embedding),
                index,
            }));
            if best.len() > k {
                best.pop();
            }
        }

        // ascending order of Reverse is descending rank
        Ok(best
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(ranked)| SearchResult {
                chunk: self.entries[ranked.index].chunk.clone(),
                score: ranked.score,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

/// Heap key: higher score ranks higher, then earlier insertion.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    score: f32,
    index: usize,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 means identical direction, and 0.0 when
/// either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
