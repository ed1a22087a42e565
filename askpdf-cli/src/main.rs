//! askpdf CLI - serve, ingest and query a folder of PDFs
//!
//! # Commands
//!
//! ```bash
//! # Run the HTTP API (ingests documents/ on startup)
//! askpdf serve --port 3000
//!
//! # Build the corpus once and print its stats
//! askpdf ingest --documents-path ./documents
//!
//! # Ask a single question from the terminal
//! askpdf ask "What is the warranty period?"
//!
//! # Preview how a file would be chunked
//! askpdf chunk --chunk-strategy fixed manual.pdf
//! ```
//!
//! Every setting can also come from the environment or a `.env` file.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use askpdf_lib::{
    config::ChunkStrategy,
    document::Loaders,
    embed::{BgeEmbedder, Embedder, HashingEmbedder, OllamaEmbedder},
    generate::{Generator, OllamaGenerator},
    ollama::DEFAULT_OLLAMA_URL,
    RagConfig, RagService,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::server::{run_server, ServerConfig};

/// Vector size of the offline hashing embedder
const HASHING_DIMENSION: usize = 384;

#[derive(Parser)]
#[command(name = "askpdf")]
#[command(about = "Ask questions about a collection of PDF documents")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = 3000)]
        port: u16,

        /// Skip building the corpus at startup (first question builds it)
        #[arg(long)]
        lazy: bool,
    },

    /// Ingest the documents directory and print corpus stats
    Ingest,

    /// Answer one question and exit
    Ask {
        /// The question to answer
        question: String,

        /// Also print the model's reasoning and the retrieved context
        #[arg(short, long)]
        verbose: bool,
    },

    /// Chunk a document with the configured strategy and show the result
    Chunk {
        /// PDF or text file to chunk
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbeddingProvider {
    /// Embeddings from the Ollama daemon
    Ollama,
    /// Local BGE model via fastembed (downloads on first run)
    Bge,
    /// Deterministic feature hashing, no model needed
    Hashing,
}

/// Settings shared by every subcommand
#[derive(clap::Args)]
struct Settings {
    /// Directory holding the documents to index
    #[arg(long, env = "DOCUMENTS_PATH", default_value = "documents", global = true)]
    documents_path: PathBuf,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL, global = true)]
    ollama_url: String,

    /// Generation model served by Ollama
    #[arg(long, env = "OLLAMA_MODEL", default_value = "deepseek-r1:8b", global = true)]
    model: String,

    /// Where embeddings come from
    #[arg(long, env = "EMBEDDING_PROVIDER", value_enum, default_value_t = EmbeddingProvider::Ollama, global = true)]
    embedding_provider: EmbeddingProvider,

    /// Ollama embedding model (defaults to the generation model)
    #[arg(long, env = "EMBEDDING_MODEL", global = true)]
    embedding_model: Option<String>,

    /// Maximum chunk size in characters
    #[arg(long, env = "CHUNK_SIZE", default_value_t = 1000, global = true)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, env = "CHUNK_OVERLAP", default_value_t = 200, global = true)]
    chunk_overlap: usize,

    /// Chunking strategy: "recursive" or "fixed"
    #[arg(long, env = "CHUNK_STRATEGY", default_value = "recursive", global = true)]
    chunk_strategy: ChunkStrategy,

    /// Sampling temperature for generation
    #[arg(long, env = "TEMPERATURE", default_value_t = 2.0, global = true)]
    temperature: f32,

    /// Generation retries after the first failure
    #[arg(long, env = "MAX_RETRIES", default_value_t = 2, global = true)]
    max_retries: u32,

    /// Number of chunks retrieved as context
    #[arg(long = "top-k", env = "SIMILAR_DOCS_COUNT", default_value_t = 3, global = true)]
    top_k: usize,

    /// Chunks per embedding request
    #[arg(long, env = "EMBED_BATCH_SIZE", default_value_t = 32, global = true)]
    embed_batch_size: usize,
}

impl Settings {
    fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .chunk_strategy(self.chunk_strategy)
            .top_k(self.top_k)
            .model(&self.model)
            .temperature(self.temperature)
            .max_retries(self.max_retries)
            .embed_batch_size(self.embed_batch_size)
            .build()
            .context("invalid configuration")
    }

    fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        let embedder: Arc<dyn Embedder> = match self.embedding_provider {
            EmbeddingProvider::Ollama => {
                let model = self.embedding_model.as_deref().unwrap_or(&self.model);
                Arc::new(OllamaEmbedder::new(&self.ollama_url, model)?)
            }
            EmbeddingProvider::Bge => {
                info!("loading BGE model (first run downloads ~1.2GB)");
                Arc::new(BgeEmbedder::new()?)
            }
            EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(HASHING_DIMENSION)),
        };
        Ok(embedder)
    }

    fn generator(&self) -> Result<Arc<dyn Generator>> {
        Ok(Arc::new(OllamaGenerator::new(&self.ollama_url)?))
    }

    fn service(&self) -> Result<RagService> {
        let config = self.rag_config()?;
        info!(
            documents = %self.documents_path.display(),
            model = %config.model,
            embeddings = ?self.embedding_provider,
            chunk_size = config.chunk_size,
            chunk_overlap = config.chunk_overlap,
            strategy = %config.chunk_strategy,
            "configured pipeline"
        );
        Ok(RagService::new(
            config,
            &self.documents_path,
            self.embedder()?,
            self.generator()?,
        )?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;

    match cli.command {
        Commands::Serve { host, port, lazy } => {
            let service = Arc::new(settings.service()?);
            let config = ServerConfig {
                host,
                port,
                ingest_on_startup: !lazy,
            };
            run_server(config, service).await?;
        }

        Commands::Ingest => {
            let service = settings.service()?;
            let snapshot = service.reindex().await?;

            println!("Indexed '{}':", service.documents_path().display());
            println!("  Documents:       {}", snapshot.documents());
            println!("  Chunks:          {}", snapshot.len());
            println!("  Embedding model: {}", snapshot.embedding_model());
            println!("  Built at:        {}", snapshot.built_at().to_rfc3339());
        }

        Commands::Ask { question, verbose } => {
            let service = settings.service()?;

            if verbose {
                let context = service.retrieve(&question).await?;
                println!("=== Context ({} chunks) ===\n", context.len());
                for chunk in &context {
                    println!("[{}]", chunk.id);
                    println!("{}\n", preview(&chunk.content, 300));
                }
            }

            let answer = service.ask(&question).await?;
            if verbose {
                if let Some(reasoning) = &answer.reasoning {
                    println!("=== Reasoning ===\n\n{reasoning}\n");
                }
                println!("=== Answer ===\n");
            }
            println!("{}", answer.answer);
        }

        Commands::Chunk { input } => {
            let config = settings.rag_config()?;
            let chunker = config.chunker()?;
            let loaders = Loaders::with_defaults();
            let loader = loaders
                .for_path(&input)
                .with_context(|| format!("unsupported file type: {}", input.display()))?;

            let documents = loader.load(&input)?;
            let chunks: Vec<_> = documents.iter().flat_map(|d| chunker.chunk(d)).collect();

            println!(
                "Chunked '{}' ({} documents) into {} chunks using {} strategy:\n",
                input.display(),
                documents.len(),
                chunks.len(),
                chunker.name()
            );
            for chunk in &chunks {
                println!("--- {} ({} chars, offset {}) ---", chunk.id, chunk.content.chars().count(), chunk.metadata.position);
                println!("{}\n", preview(&chunk.content, 200));
            }
        }
    }

    Ok(())
}

/// First `max` characters of `text`, with an ellipsis if cut.
fn preview(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().nth(max).is_some() {
        out.push_str("...");
    }
    out
}
