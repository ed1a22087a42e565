//! Corpus snapshots and their lifecycle
//!
//! A [`Snapshot`] is an immutable, fully built index: chunks, embeddings and
//! the name of the model that produced them. The [`Corpus`] holds at most one
//! current snapshot and replaces it atomically, so a query sees either the
//! old index or the new one, never a mix.
//!
//! Builds are single-flight: concurrent rebuild or lazy-init requests queue
//! on one build lock, and a lazy init that finds a snapshot already
//! published after waiting reuses it instead of building again.
//!
//! ```text
//!            build ok                    rebuild ok
//! Empty ─────────────────> Ready(v1) ─────────────────> Ready(v2)
//!   │                          │
//!   └─ build fails: Empty      └─ rebuild fails: Ready(v1)
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::chunk::{Chunk, ChunkMetadata};
use crate::store::{MemoryStore, VectorStore};
use crate::{Error, Result};

/// An immutable, queryable index of the corpus.
#[derive(Debug, Clone)]
pub struct Snapshot {
    version: u64,
    built_at: DateTime<Utc>,
    embedding_model: String,
    documents: usize,
    store: MemoryStore,
}

impl Snapshot {
    /// Wrap a filled store. The version is assigned when the snapshot is published.
    pub fn new(embedding_model: impl Into<String>, documents: usize, store: MemoryStore) -> Self {
        Self {
            version: 0,
            built_at: Utc::now(),
            embedding_model: embedding_model.into(),
            documents,
            store,
        }
    }

    /// Publication counter, starting at 1 for the first published snapshot
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Embedding model the chunk vectors were produced with
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Number of source documents (PDF pages, text files) that produced chunks
    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Chunks in ingestion order.
    pub fn chunks(&self) -> impl ExactSizeIterator<Item = &Chunk> + '_ {
        self.store.chunks()
    }

    /// One page of chunks in ingestion order, with 1-based ids.
    ///
    /// A page past the end is empty, not an error.
    pub fn page(&self, page: usize, limit: usize) -> Result<Page> {
        if page == 0 || limit == 0 {
            return Err(Error::InvalidArgument(format!(
                "page and limit must be at least 1, got page={page} limit={limit}"
            )));
        }

        let total = self.len();
        let start = (page - 1).saturating_mul(limit);
        let documents = self
            .chunks()
            .enumerate()
            .skip(start)
            .take(limit)
            .map(|(index, chunk)| PageEntry {
                id: index + 1,
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
            })
            .collect();

        Ok(Page {
            total,
            page,
            total_pages: total.div_ceil(limit),
            documents,
        })
    }
}

/// A page of indexed chunks
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Total number of chunks in the snapshot
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    pub documents: Vec<PageEntry>,
}

impl Page {
    /// The page served when no snapshot exists yet.
    pub fn empty(page: usize) -> Self {
        Self {
            total: 0,
            page,
            total_pages: 0,
            documents: Vec::new(),
        }
    }
}

/// One listed chunk
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageEntry {
    /// 1-based position in ingestion order
    pub id: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Lifecycle state of the corpus
#[derive(Debug, Clone, Copy, Serialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CorpusState {
    /// Nothing published and no build running
    Empty,
    /// A build is running; any previous snapshot is still served
    Building,
    /// A snapshot is published and no build is running
    Ready,
}

/// Holder of the current snapshot.
#[derive(Debug, Default)]
pub struct Corpus {
    current: RwLock<Option<Arc<Snapshot>>>,
    build_lock: Mutex<()>,
    building: AtomicBool,
    versions: AtomicU64,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot, if one has been published.
    ///
    /// The returned handle stays valid and unchanged across later rebuilds.
    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    pub async fn state(&self) -> CorpusState {
        if self.building.load(Ordering::SeqCst) {
            CorpusState::Building
        } else if self.current.read().await.is_some() {
            CorpusState::Ready
        } else {
            CorpusState::Empty
        }
    }

    /// Build a new snapshot and publish it, replacing the current one.
    ///
    /// Waits for any build already running. On failure the previous snapshot
    /// stays current.
    pub async fn rebuild<F, Fut>(&self, build: F) -> Result<Arc<Snapshot>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        let _guard = self.build_lock.lock().await;
        self.build_and_publish(build).await
    }

    /// Return the current snapshot, building one first if none exists.
    ///
    /// Concurrent callers on an empty corpus trigger exactly one build.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<Snapshot>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }

        let _guard = self.build_lock.lock().await;
        // another caller may have finished a build while we waited
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }
        self.build_and_publish(build).await
    }

    // Caller holds build_lock.
    async fn build_and_publish<F, Fut>(&self, build: F) -> Result<Arc<Snapshot>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Snapshot>>,
    {
        let result = {
            let _flag = BuildingFlag::raise(&self.building);
            build().await
        };

        match result {
            Ok(snapshot) => Ok(self.publish(snapshot).await),
            Err(e) => {
                error!(error = %e, "corpus build failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    async fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        snapshot.version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(snapshot);

        *self.current.write().await = Some(Arc::clone(&snapshot));

        info!(
            version = snapshot.version,
            documents = snapshot.documents,
            chunks = snapshot.len(),
            model = %snapshot.embedding_model,
            "published corpus snapshot"
        );
        snapshot
    }
}

/// Clears the building flag when the build future finishes or is dropped.
struct BuildingFlag<'a>(&'a AtomicBool);

impl<'a> BuildingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BuildingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn snapshot_with(contents: &[&str]) -> Snapshot {
        let mut store = MemoryStore::new();
        for (i, content) in contents.iter().enumerate() {
            let chunk = Chunk {
                id: format!("doc:{i}"),
                document_id: "doc".to_string(),
                content: content.to_string(),
                metadata: ChunkMetadata {
                    chunk_index: i,
                    total_chunks: contents.len(),
                    ..Default::default()
                },
            };
            store.add(chunk, vec![1.0, i as f32]).unwrap();
        }
        Snapshot::new("test-model", 1, store)
    }

    #[test]
    fn test_page_slices_in_order() {
        let snapshot = snapshot_with(&["a", "b", "c", "d", "e"]);

        let page = snapshot.page(2, 2).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 2);
        let ids: Vec<_> = page.documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(page.documents[0].content, "c");
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let snapshot = snapshot_with(&["a", "b"]);
        let page = snapshot.page(7, 10).unwrap();
        assert!(page.documents.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_page_rejects_zero() {
        let snapshot = snapshot_with(&["a"]);
        assert!(snapshot.page(0, 10).is_err());
        assert!(snapshot.page(1, 0).is_err());
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let json = serde_json::to_value(Page::empty(1)).unwrap();
        assert_eq!(json["totalPages"], 0);
        assert!(json["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_corpus() {
        let corpus = Corpus::new();
        assert!(corpus.current().await.is_none());
        assert_eq!(corpus.state().await, CorpusState::Empty);
    }

    #[tokio::test]
    async fn test_versions_increase() {
        let corpus = Corpus::new();
        let first = corpus.rebuild(|| async { Ok(snapshot_with(&["a"])) }).await.unwrap();
        let second = corpus.rebuild(|| async { Ok(snapshot_with(&["b"])) }).await.unwrap();

        assert_eq!(first.version(), 1);
        assert_eq!(second.version(), 2);
        assert_eq!(corpus.current().await.unwrap().version(), 2);
        assert_eq!(corpus.state().await, CorpusState::Ready);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous() {
        let corpus = Corpus::new();
        corpus.rebuild(|| async { Ok(snapshot_with(&["kept"])) }).await.unwrap();

        let err = corpus
            .rebuild(|| async { Err(Error::Ingestion("embedder down".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));

        let current = corpus.current().await.unwrap();
        assert_eq!(current.version(), 1);
        assert_eq!(current.chunks().next().unwrap().content, "kept");
        assert_eq!(corpus.state().await, CorpusState::Ready);
    }

    #[tokio::test]
    async fn test_readers_see_old_snapshot_during_rebuild() {
        let corpus = Arc::new(Corpus::new());
        corpus.rebuild(|| async { Ok(snapshot_with(&["old"])) }).await.unwrap();
        let held = corpus.current().await.unwrap();

        let (release, wait) = oneshot::channel::<()>();
        let rebuilding = {
            let corpus = Arc::clone(&corpus);
            tokio::spawn(async move {
                corpus
                    .rebuild(|| async move {
                        wait.await.ok();
                        Ok(snapshot_with(&["new", "newer"]))
                    })
                    .await
            })
        };

        // let the rebuild start and park on the channel
        while corpus.state().await != CorpusState::Building {
            tokio::task::yield_now().await;
        }
        let during = corpus.current().await.unwrap();
        assert_eq!(during.version(), 1);
        assert_eq!(during.len(), 1);

        release.send(()).unwrap();
        let published = rebuilding.await.unwrap().unwrap();
        assert_eq!(published.len(), 2);

        // handles taken before the swap are unaffected
        assert_eq!(held.len(), 1);
        assert_eq!(held.chunks().next().unwrap().content, "old");
        assert_eq!(corpus.current().await.unwrap().version(), 2);
        assert_eq!(corpus.state().await, CorpusState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_lazy_init_builds_once() {
        let corpus = Arc::new(Corpus::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let corpus = Arc::clone(&corpus);
                let builds = Arc::clone(&builds);
                tokio::spawn(async move {
                    corpus
                        .get_or_build(|| async move {
                            builds.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(snapshot_with(&["only"]))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            let snapshot = task.await.unwrap().unwrap();
            assert_eq!(snapshot.version(), 1);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lazy_init_failure_leaves_empty() {
        let corpus = Corpus::new();
        let result = corpus
            .get_or_build(|| async { Err(Error::Ingestion("no documents".to_string())) })
            .await;
        assert!(result.is_err());
        assert_eq!(corpus.state().await, CorpusState::Empty);
    }
}
