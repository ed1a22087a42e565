//! Ingestion pipeline: documents on disk to a corpus snapshot
//!
//! ```text
//! directory -> Loaders -> Document* -> Chunker -> Chunk* -> Embedder (batched) -> MemoryStore
//! ```
//!
//! The whole run either succeeds and yields a [`Snapshot`] or fails with
//! [`Error::Ingestion`]; no partial snapshot escapes. Publishing the result
//! is the caller's job (see [`crate::corpus::Corpus`]).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::chunk::{Chunk, Chunker};
use crate::corpus::Snapshot;
use crate::document::{Document, Loaders};
use crate::embed::Embedder;
use crate::store::{MemoryStore, VectorStore};
use crate::{Error, Result};

/// Default number of chunks sent to the embedder per request
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Builds snapshots from a documents directory.
#[derive(Clone)]
pub struct Ingestor {
    loaders: Loaders,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(loaders: Loaders, chunker: Arc<dyn Chunker>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            loaders,
            chunker,
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set how many chunks go into one embedding request (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Load every supported file under `root` and index it.
    ///
    /// A missing or empty directory produces an empty snapshot.
    pub async fn ingest(&self, root: &Path) -> Result<Snapshot> {
        let started = Instant::now();
        info!(path = %root.display(), chunker = self.chunker.name(), model = self.embedder.model_name(), "ingesting documents");

        let documents = self.load(root.to_path_buf()).await?;
        let snapshot = self.build(documents).await?;

        info!(
            documents = snapshot.documents(),
            chunks = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingestion finished"
        );
        Ok(snapshot)
    }

    /// Chunk and embed already loaded documents.
    pub async fn build(&self, documents: Vec<Document>) -> Result<Snapshot> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|document| self.chunker.chunk(document))
            .collect();
        let sources = documents
            .iter()
            .filter(|d| !d.content.trim().is_empty())
            .count();

        if chunks.is_empty() {
            warn!("no text found, corpus will be empty");
        } else {
            debug!(documents = documents.len(), chunks = chunks.len(), "chunked documents");
        }

        let mut store = MemoryStore::new();
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();

            let embeddings = self.embedder.embed_documents(&texts).await.map_err(|e| {
                error!(document = %batch[0].document_id, error = %e, "embedding failed");
                Error::Ingestion(format!("embedding chunks of {}: {e}", batch[0].document_id))
            })?;

            store
                .insert(batch, &embeddings)
                .map_err(|e| Error::Ingestion(format!("indexing chunks of {}: {e}", batch[0].document_id)))?;
        }

        Ok(Snapshot::new(self.embedder.model_name(), sources, store))
    }

    async fn load(&self, root: PathBuf) -> Result<Vec<Document>> {
        let loaders = self.loaders.clone();
        tokio::task::spawn_blocking(move || loaders.load_all(&root))
            .await
            .map_err(|e| Error::Ingestion(format!("loader task failed: {e}")))?
            .map_err(|e| {
                error!(error = %e, "loading documents failed");
                Error::Ingestion(e.to_string())
            })
    }
}
