//! Source documents and the loaders that read them from disk
//!
//! A loader turns one file into one or more [`Document`]s. PDFs produce one
//! document per non-empty page so page provenance survives into chunk
//! metadata; plain text files produce a single document.
//!
//! # Usage
//!
//! ```ignore
//! use askpdf_lib::document::Loaders;
//!
//! let loaders = Loaders::with_defaults();
//! let documents = loaders.load_all("documents/".as_ref())?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

/// Raw document text with its provenance. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Document {
    /// Identifier unique within one ingestion run
    pub id: String,
    /// Extracted text
    pub content: String,
    /// Where the text came from
    pub metadata: DocumentMetadata,
}

/// Provenance of a document
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct DocumentMetadata {
    /// Source file path
    pub source: String,
    /// 1-based page number for paged formats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page count of the source file for paged formats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl Document {
    /// Create an unpaged document whose id is its source.
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: source.clone(),
            content: content.into(),
            metadata: DocumentMetadata {
                source,
                ..Default::default()
            },
        }
    }
}

/// Reads files of one format into documents.
pub trait DocumentLoader: Send + Sync {
    /// Lowercase file extensions (without the dot) this loader handles
    fn extensions(&self) -> &[&'static str];

    /// Load a file into zero or more documents
    fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

/// Extension-keyed set of loaders used to discover and read a corpus.
#[derive(Clone, Default)]
pub struct Loaders {
    by_extension: HashMap<String, Arc<dyn DocumentLoader>>,
}

impl Loaders {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the PDF and plain text loaders.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with(Arc::new(PdfLoader))
            .with(Arc::new(TextLoader))
    }

    /// Register a loader for every extension it declares, replacing earlier ones.
    #[must_use]
    pub fn with(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        for ext in loader.extensions() {
            self.by_extension.insert(ext.to_string(), Arc::clone(&loader));
        }
        self
    }

    /// Returns the loader responsible for `path`, if its extension is supported.
    pub fn for_path(&self, path: &Path) -> Option<&Arc<dyn DocumentLoader>> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext)
    }

    /// List supported files under `root` (a directory or a single file), sorted by path.
    ///
    /// A missing `root` is an empty corpus, not an error.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            warn!(root = %root.display(), "document location does not exist, treating as empty");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Document(e.to_string()))?;
            if entry.file_type().is_file() && self.for_path(entry.path()).is_some() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Discover and load every supported document under `root`, in discovery order.
    pub fn load_all(&self, root: &Path) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for path in self.discover(root)? {
            let Some(loader) = self.for_path(&path) else {
                continue;
            };
            let loaded = loader.load(&path)?;
            debug!(path = %path.display(), documents = loaded.len(), "loaded file");
            documents.extend(loaded);
        }
        Ok(documents)
    }
}

mod pdf;
mod text;

pub use pdf::*;
pub use text::*;
