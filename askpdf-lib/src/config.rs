//! Pipeline configuration

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunk::{Chunker, FixedSizeChunker, RecursiveChunker};
use crate::generate::GenerationOptions;
use crate::{Error, Result};

/// Which chunker the pipeline uses
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Boundary-aware windows
    #[default]
    Recursive,
    /// Hard character windows
    Fixed,
}

impl FromStr for ChunkStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recursive" => Ok(Self::Recursive),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown chunk strategy '{other}', expected 'recursive' or 'fixed'")),
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recursive => f.write_str("recursive"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}

/// Configuration parameters for ingestion, retrieval and generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks of a document
    pub chunk_overlap: usize,
    /// Chunking strategy
    pub chunk_strategy: ChunkStrategy,
    /// Number of chunks retrieved as context per question
    pub top_k: usize,
    /// Generation model identifier
    pub model: String,
    /// Sampling temperature passed to the generator
    pub temperature: f32,
    /// Extra generation attempts after the first failure
    pub max_retries: u32,
    /// Chunks per embedding request during ingestion
    pub embed_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            chunk_strategy: ChunkStrategy::Recursive,
            top_k: 3,
            model: "deepseek-r1:8b".to_string(),
            temperature: 2.0,
            max_retries: 2,
            embed_batch_size: 32,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check parameter consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `embed_batch_size == 0`
    /// - `temperature` is negative or not finite
    pub fn validate(&self) -> Result<()> {
        crate::chunk::validate(self.chunk_size, self.chunk_overlap)?;
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be greater than zero".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::Config("embed_batch_size must be greater than zero".to_string()));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::Config(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Build the configured chunker.
    pub fn chunker(&self) -> Result<Arc<dyn Chunker>> {
        let chunker: Arc<dyn Chunker> = match self.chunk_strategy {
            ChunkStrategy::Recursive => {
                Arc::new(RecursiveChunker::new(self.chunk_size, self.chunk_overlap)?)
            }
            ChunkStrategy::Fixed => {
                Arc::new(FixedSizeChunker::new(self.chunk_size, self.chunk_overlap)?)
            }
        };
        Ok(chunker)
    }

    /// Parameters handed to the generator on every call.
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_retries: self.max_retries,
        }
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the chunking strategy.
    pub fn chunk_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.config.chunk_strategy = strategy;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the generation model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the number of generation retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the embedding batch size.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_builder_rejects_overlap() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_builder_rejects_zero_top_k() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
    }

    #[test]
    fn test_builder_rejects_bad_temperature() {
        assert!(RagConfig::builder().temperature(-0.1).build().is_err());
        assert!(RagConfig::builder().temperature(f32::NAN).build().is_err());
        assert!(RagConfig::builder().temperature(0.0).build().is_ok());
    }

    #[test]
    fn test_chunker_follows_strategy() {
        let config = RagConfig::builder()
            .chunk_size(50)
            .chunk_overlap(10)
            .chunk_strategy(ChunkStrategy::Fixed)
            .build()
            .unwrap();
        assert_eq!(config.chunker().unwrap().name(), "fixed");

        let config = RagConfig::default();
        assert_eq!(config.chunker().unwrap().name(), "recursive");
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("FIXED".parse::<ChunkStrategy>().unwrap(), ChunkStrategy::Fixed);
        assert_eq!(ChunkStrategy::Recursive.to_string(), "recursive");
        assert!("paragraph".parse::<ChunkStrategy>().is_err());
    }

    #[test]
    fn test_generation_options() {
        let config = RagConfig::builder().model("llama3").temperature(0.3).max_retries(4).build().unwrap();
        let options = config.generation_options();
        assert_eq!(options.model, "llama3");
        assert_eq!(options.max_retries, 4);
    }
}
