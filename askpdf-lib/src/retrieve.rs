//! Question-to-context retrieval

use std::sync::Arc;

use tracing::debug;

use crate::chunk::Chunk;
use crate::corpus::Snapshot;
use crate::embed::Embedder;
use crate::store::{SearchResult, VectorStore};
use crate::{Error, Result};

/// Embeds questions and ranks a snapshot's chunks against them.
///
/// The embedder must be the one the snapshot was built with; a different
/// model is rejected rather than compared in an unrelated vector space.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Top-`k` chunks of `snapshot` for `question`, with scores.
    pub async fn search(&self, snapshot: &Snapshot, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be at least 1".to_string()));
        }
        if snapshot.embedding_model() != self.embedder.model_name() {
            return Err(Error::EmbeddingModelMismatch {
                corpus: snapshot.embedding_model().to_string(),
                query: self.embedder.model_name().to_string(),
            });
        }
        if snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed_query(question).await?;
        let results = snapshot.store().search(&query, k)?;

        debug!(
            version = snapshot.version(),
            k,
            hits = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved context"
        );
        Ok(results)
    }

    /// Top-`k` chunks of `snapshot` for `question`, best first.
    pub async fn retrieve(&self, snapshot: &Snapshot, question: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self
            .search(snapshot, question, k)
            .await?
            .into_iter()
            .map(|result| result.chunk)
            .collect())
    }
}
