//! Answer composition: prompt rendering, generation and reasoning extraction

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::chunk::Chunk;
use crate::generate::{GenerationOptions, Generator};
use crate::retry::Backoff;
use crate::{Error, Result};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// A generated answer, split into the model's reasoning and the final text.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Answer {
    /// Content of the first `<think>` block, if the model produced one
    #[serde(rename = "think")]
    pub reasoning: Option<String>,
    pub answer: String,
}

impl Answer {
    /// Split raw model output into reasoning and answer.
    ///
    /// Only the first complete `<think>...</think>` block counts; it is removed
    /// from the answer together with the newlines right after it.
    pub fn parse(raw: &str) -> Self {
        let block = raw.find(THINK_OPEN).and_then(|open| {
            let inner = open + THINK_OPEN.len();
            raw[inner..].find(THINK_CLOSE).map(|len| (open, inner, inner + len))
        });

        match block {
            Some((open, inner, close)) => {
                let rest = raw[close + THINK_CLOSE.len()..].trim_start_matches('\n');
                Self {
                    reasoning: Some(raw[inner..close].trim().to_string()),
                    answer: format!("{}{rest}", &raw[..open]).trim().to_string(),
                }
            }
            None => Self {
                reasoning: None,
                answer: raw.trim().to_string(),
            },
        }
    }
}

/// Render the grounded prompt for `question` over `context`.
pub fn build_prompt(question: &str, context: &[Chunk]) -> String {
    let context = context
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Based on the following context from the documents:\n{context}\n\n\
         Using only the information in the context above, please answer this question: {question}"
    )
}

/// Turns a question and retrieved chunks into an [`Answer`].
#[derive(Clone)]
pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
    options: GenerationOptions,
    backoff: Backoff,
}

impl AnswerComposer {
    /// Retries follow `options.max_retries`.
    pub fn new(generator: Arc<dyn Generator>, options: GenerationOptions) -> Self {
        let backoff = Backoff::new(options.max_retries);
        Self {
            generator,
            options,
            backoff,
        }
    }

    /// Replace the retry policy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Generate an answer to `question` grounded in `context`.
    ///
    /// Fails with [`Error::Generation`] once every attempt has failed.
    pub async fn compose(&self, question: &str, context: &[Chunk]) -> Result<Answer> {
        let prompt = build_prompt(question, context);
        debug!(context_chunks = context.len(), prompt_chars = prompt.len(), "composing answer");

        let raw = self
            .backoff
            .run("generate", || self.generator.generate(&prompt, &self.options))
            .await
            .map_err(|e| {
                error!(model = %self.options.model, error = %e, "generation failed after retries");
                match e {
                    Error::Generation(_) => e,
                    other => Error::Generation(other.to_string()),
                }
            })?;

        Ok(Answer::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails `failures` times, then echoes a canned reply and records the prompt.
    struct ScriptedGenerator {
        failures: u32,
        calls: AtomicU32,
        reply: String,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedGenerator {
        fn new(failures: u32, reply: &str) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                reply: reply.to_string(),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(Error::Generation("connection refused".to_string()));
            }
            Ok(self.reply.clone())
        }
    }

    fn chunk(content: &str) -> Chunk {
        Chunk {
            id: "doc:0".to_string(),
            document_id: "doc".to_string(),
            content: content.to_string(),
            metadata: ChunkMetadata::default(),
        }
    }

    fn options(max_retries: u32) -> GenerationOptions {
        GenerationOptions {
            model: "test-model".to_string(),
            temperature: 0.0,
            max_retries,
        }
    }

    fn composer(generator: Arc<ScriptedGenerator>, max_retries: u32) -> AnswerComposer {
        AnswerComposer::new(generator, options(max_retries)).with_backoff(Backoff::new(max_retries).with_base_delay(Duration::ZERO))
    }

    #[test]
    fn test_parse_think_block() {
        let answer = Answer::parse("<think>plan</think>\nFinal answer.");
        assert_eq!(answer.reasoning.as_deref(), Some("plan"));
        assert_eq!(answer.answer, "Final answer.");
    }

    #[test]
    fn test_parse_without_think_block() {
        let answer = Answer::parse("  Just the answer.\n");
        assert_eq!(answer.reasoning, None);
        assert_eq!(answer.answer, "Just the answer.");
    }

    #[test]
    fn test_parse_multiline_reasoning_first_block_only() {
        let raw = "<think>\nstep one\nstep two\n</think>\n\nBlue.<think>again</think>";
        let answer = Answer::parse(raw);
        assert_eq!(answer.reasoning.as_deref(), Some("step one\nstep two"));
        assert_eq!(answer.answer, "Blue.<think>again</think>");
    }

    #[test]
    fn test_answer_serializes_reasoning_as_think() {
        let json = serde_json::to_value(Answer::parse("plain")).unwrap();
        assert!(json["think"].is_null());
        assert_eq!(json["answer"], "plain");
    }

    #[test]
    fn test_prompt_joins_context() {
        let prompt = build_prompt("Why?", &[chunk("first"), chunk("second")]);
        assert!(prompt.contains("first\n\nsecond"));
        assert!(prompt.ends_with("Why?"));
        assert!(prompt.contains("only the information in the context"));
    }

    #[tokio::test]
    async fn test_compose_recovers_within_retries() {
        let generator = Arc::new(ScriptedGenerator::new(2, "<think>hmm</think>\nBlue."));
        let answer = composer(generator.clone(), 2)
            .compose("What color is the sky?", &[chunk("The sky is blue.")])
            .await
            .unwrap();

        assert_eq!(answer.answer, "Blue.");
        assert_eq!(answer.reasoning.as_deref(), Some("hmm"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);

        let prompt = generator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("The sky is blue."));
    }

    #[tokio::test]
    async fn test_compose_fails_after_retries() {
        let generator = Arc::new(ScriptedGenerator::new(5, "never"));
        let err = composer(generator.clone(), 1).compose("q", &[]).await.unwrap_err();

        assert!(matches!(err, Error::Generation(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }
}
