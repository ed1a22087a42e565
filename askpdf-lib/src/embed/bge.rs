use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

/// BGE embedder using BAAI/bge-large-en-v1.5.
///
/// Uses fastembed for ONNX-based inference. This model produces 1024-dimensional
/// embeddings and supports up to 512 tokens per input. Inference runs on the
/// blocking thread pool so it never stalls the async runtime.
pub struct BgeEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl BgeEmbedder {
    /// Create a new BGE embedder.
    ///
    /// Downloads the model on first use (~1.2GB).
    pub fn new() -> Result<Self> {
        let opts = InitOptions::new(EmbeddingModel::BGELargeENV15)
            .with_show_download_progress(true);

        TextEmbedding::try_new(opts)
            .map(|model| Self {
                model: Arc::new(Mutex::new(model)),
            })
            .map_err(|e| Error::Embedding(e.to_string()))
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| Error::Embedding("embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| Error::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| Error::Embedding(e.to_string()))?
    }
}

#[async_trait]
impl Embedder for BgeEmbedder {
    fn model_name(&self) -> &str {
        "BAAI/bge-large-en-v1.5"
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.run(texts.iter().map(|t| t.to_string()).collect()).await
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        // BGE uses a special prompt prefix for queries to improve retrieval
        let query_text = format!("Represent this sentence for searching relevant passages: {text}");

        self.run(vec![query_text])
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
    #[ignore] // Requires model download, run with: cargo test -- --ignored
    async fn test_dimensions_and_count() {
        let embedder = BgeEmbedder::new().unwrap();
        let docs = embedder
            .embed_documents(&["The sky is blue.", "Water is wet."])
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.len() == 1024));
    }

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_query_closer_to_relevant_document() {
        let embedder = BgeEmbedder::new().unwrap();
        let docs = embedder
            .embed_documents(&["The sky is blue on a clear day.", "Invoices are due in 30 days."])
            .await
            .unwrap();
        let query = embedder.embed_query("What colour is the sky?").await.unwrap();

        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&query, &docs[0]) > dot(&query, &docs[1]));
    }
}
