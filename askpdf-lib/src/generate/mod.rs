//! Text generation backends
//!
//! A [`Generator`] turns a fully rendered prompt into raw model output. It
//! makes a single attempt; retries and reasoning extraction happen in
//! [`crate::answer`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Per-call generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier understood by the backend
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Extra attempts after the first failure
    pub max_retries: u32,
}

/// Trait for text generation backends
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// Fails with [`crate::Error::Generation`] when the backend is
    /// unreachable or returns an unusable response.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;
}

mod ollama;

pub use ollama::*;
