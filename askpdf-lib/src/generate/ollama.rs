use async_trait::async_trait;
use tracing::debug;

use crate::generate::{GenerationOptions, Generator};
use crate::ollama::OllamaClient;
use crate::{Error, Result};

/// Generator backed by Ollama's `/api/generate`.
pub struct OllamaGenerator {
    client: OllamaClient,
}

impl OllamaGenerator {
    /// Create a generator talking to the daemon at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(base_url).map_err(|e| Error::Generation(e.to_string()))?,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        debug!(model = %options.model, prompt_chars = prompt.len(), "generating");
        self.client
            .generate(&options.model, prompt, options.temperature)
            .await
            .map_err(|e| Error::Generation(format!("{}: {e}", options.model)))
    }
}
