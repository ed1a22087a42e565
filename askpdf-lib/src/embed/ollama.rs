use async_trait::async_trait;

use crate::embed::{Embedder, Embedding};
use crate::ollama::OllamaClient;
use crate::{Error, Result};

/// Embedder backed by a model served by Ollama.
///
/// Vector size depends on the model; the index learns it from the first insert.
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    /// Create an embedder using `model` on the daemon at `base_url`.
    pub fn new(base_url: &str, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(base_url).map_err(|e| Error::Embedding(e.to_string()))?,
            model: model.into(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .embed(&self.model, texts)
            .await
            .map_err(|e| Error::Embedding(format!("{}: {e}", self.model)))
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.embed_documents(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("model returned no embeddings".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:9", "nomic-embed-text").unwrap();
        assert!(embedder.embed_documents(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_daemon_maps_to_embedding_error() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:9", "nomic-embed-text").unwrap();
        let err = embedder.embed_query("hello").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(msg) if msg.starts_with("nomic-embed-text")));
    }

    #[tokio::test]
    #[ignore] // Requires a running Ollama with the model pulled
    async fn test_live_embedding() {
        let embedder = OllamaEmbedder::new(crate::ollama::DEFAULT_OLLAMA_URL, "nomic-embed-text").unwrap();
        let vectors = embedder.embed_documents(&["a", "b"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), vectors[1].len());
    }
}
