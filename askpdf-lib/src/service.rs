//! The question-answering service
//!
//! [`RagService`] wires a documents directory, an embedder and a generator
//! into the full pipeline and owns the [`Corpus`]. It is the only type a
//! front end (HTTP server, CLI) needs.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use askpdf_lib::{RagConfig, RagService, embed::OllamaEmbedder, generate::OllamaGenerator};
//!
//! let service = RagService::new(
//!     RagConfig::default(),
//!     "documents/",
//!     Arc::new(OllamaEmbedder::new(url, "deepseek-r1:8b")?),
//!     Arc::new(OllamaGenerator::new(url)?),
//! )?;
//!
//! let answer = service.ask("What is this document about?").await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::answer::{Answer, AnswerComposer};
use crate::chunk::Chunk;
use crate::config::RagConfig;
use crate::corpus::{Corpus, CorpusState, Page, Snapshot};
use crate::document::Loaders;
use crate::embed::Embedder;
use crate::generate::Generator;
use crate::ingest::Ingestor;
use crate::retrieve::Retriever;
use crate::retry::Backoff;
use crate::{Error, Result};

/// Corpus status report
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub state: CorpusState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
    pub documents: usize,
    pub chunks: usize,
    /// Model the current snapshot was embedded with, else the configured one
    pub embedding_model: String,
}

/// Question answering over a documents directory.
pub struct RagService {
    config: RagConfig,
    documents_path: PathBuf,
    corpus: Corpus,
    ingestor: Ingestor,
    retriever: Retriever,
    composer: AnswerComposer,
}

impl RagService {
    /// Validate `config` and assemble the pipeline. Nothing is ingested yet.
    pub fn new(
        config: RagConfig,
        documents_path: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;

        let ingestor = Ingestor::new(Loaders::with_defaults(), config.chunker()?, Arc::clone(&embedder))
            .with_batch_size(config.embed_batch_size);
        let composer = AnswerComposer::new(generator, config.generation_options());

        Ok(Self {
            documents_path: documents_path.into(),
            corpus: Corpus::new(),
            ingestor,
            retriever: Retriever::new(embedder),
            composer,
            config,
        })
    }

    /// Replace the document loaders used by future ingestions.
    pub fn with_loaders(mut self, loaders: Loaders) -> Result<Self> {
        self.ingestor = Ingestor::new(loaders, self.config.chunker()?, Arc::clone(self.ingestor.embedder()))
            .with_batch_size(self.config.embed_batch_size);
        Ok(self)
    }

    /// Replace the generation retry policy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.composer = self.composer.with_backoff(backoff);
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn documents_path(&self) -> &Path {
        &self.documents_path
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Rebuild the corpus from the documents directory and publish it.
    ///
    /// On failure the previous snapshot keeps serving.
    pub async fn reindex(&self) -> Result<Arc<Snapshot>> {
        self.corpus
            .rebuild(|| self.ingestor.ingest(&self.documents_path))
            .await
    }

    /// The current snapshot, ingesting first if none exists.
    ///
    /// Fails with [`Error::NoCorpus`] if that ingestion fails.
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.corpus
            .get_or_build(|| self.ingestor.ingest(&self.documents_path))
            .await
            .map_err(|e| {
                error!(error = %e, "lazy corpus initialisation failed");
                Error::NoCorpus
            })
    }

    /// The `top_k` chunks most relevant to `question`.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Chunk>> {
        let snapshot = self.snapshot().await?;
        self.retriever
            .retrieve(&snapshot, question, self.config.top_k)
            .await
    }

    /// Answer `question` from the corpus.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidArgument("question must not be empty".to_string()));
        }

        let context = self.retrieve(question).await?;
        info!(question_chars = question.len(), context_chunks = context.len(), "answering question");
        self.composer.compose(question, &context).await
    }

    /// One page of indexed chunks. Never triggers ingestion.
    pub async fn documents(&self, page: usize, limit: usize) -> Result<Page> {
        match self.corpus.current().await {
            Some(snapshot) => snapshot.page(page, limit),
            None if page == 0 || limit == 0 => Err(Error::InvalidArgument(format!(
                "page and limit must be at least 1, got page={page} limit={limit}"
            ))),
            None => Ok(Page::empty(page)),
        }
    }

    pub async fn status(&self) -> Status {
        let state = self.corpus.state().await;
        match self.corpus.current().await {
            Some(snapshot) => Status {
                state,
                version: Some(snapshot.version()),
                built_at: Some(snapshot.built_at()),
                documents: snapshot.documents(),
                chunks: snapshot.len(),
                embedding_model: snapshot.embedding_model().to_string(),
            },
            None => Status {
                state,
                version: None,
                built_at: None,
                documents: 0,
                chunks: 0,
                embedding_model: self.ingestor.embedder().model_name().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashingEmbedder;
    use crate::generate::GenerationOptions;
    use async_trait::async_trait;
    use std::fs;
    use std::time::Duration;

    /// Echoes the prompt back as the answer.
    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
            Ok(format!("<think>echo</think>\n{prompt}"))
        }
    }

    fn service(dir: &Path) -> RagService {
        let config = RagConfig::builder().chunk_size(20).chunk_overlap(5).top_k(1).build().unwrap();
        RagService::new(config, dir, Arc::new(HashingEmbedder::new(256)), Arc::new(EchoGenerator))
            .unwrap()
            .with_backoff(Backoff::new(0).with_base_delay(Duration::ZERO))
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RagConfig {
            top_k: 0,
            ..RagConfig::default()
        };
        let result = RagService::new(config, "docs", Arc::new(HashingEmbedder::new(8)), Arc::new(EchoGenerator));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_ask_initialises_lazily() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("facts.txt"), "The sky is blue. Water is wet.").unwrap();
        let service = service(dir.path());
        assert_eq!(service.status().await.state, CorpusState::Empty);

        let answer = service.ask("What color is the sky?").await.unwrap();
        assert_eq!(answer.reasoning.as_deref(), Some("echo"));
        assert!(answer.answer.contains("The sky is blue."));

        let status = service.status().await;
        assert_eq!(status.state, CorpusState::Ready);
        assert_eq!(status.version, Some(1));
        assert_eq!(status.documents, 1);
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let dir = tempfile::tempdir().unwrap();
        let err = service(dir.path()).ask("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_documents_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let page = service.documents(1, 10).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(service.documents(0, 10).await.is_err());
        // listing never ingests
        assert!(service.corpus().current().await.is_none());
    }

    #[tokio::test]
    async fn test_reindex_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let service = service(dir.path());

        let first = service.reindex().await.unwrap();
        assert_eq!(first.len(), 1);

        fs::write(dir.path().join("b.txt"), "beta").unwrap();
        let second = service.reindex().await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second.version(), 2);
    }

    #[tokio::test]
    async fn test_empty_directory_answers_without_context() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let answer = service.ask("anything?").await.unwrap();
        assert!(answer.answer.ends_with("anything?"));
        assert_eq!(service.status().await.chunks, 0);
    }
}
