use std::path::Path;

use crate::document::{Document, DocumentLoader, DocumentMetadata};
use crate::{Error, Result};

/// PDF loader backed by `lopdf`.
///
/// Produces one document per page that has extractable text, with ids of the
/// form `{source}#{page}`. Pages without text (scans, blank pages) are skipped.
pub struct PdfLoader;

impl PdfLoader {
    /// Load a PDF that is already in memory, e.g. an upload.
    pub fn load_bytes(&self, bytes: &[u8], source: &str) -> Result<Vec<Document>> {
        let pdf = lopdf::Document::load_mem(bytes)
            .map_err(|e| Error::Document(format!("{source}: {e}")))?;
        pages_to_documents(&pdf, source)
    }
}

impl DocumentLoader for PdfLoader {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let source = path.display().to_string();
        let pdf = lopdf::Document::load(path)
            .map_err(|e| Error::Document(format!("{source}: {e}")))?;
        pages_to_documents(&pdf, &source)
    }
}

fn pages_to_documents(pdf: &lopdf::Document, source: &str) -> Result<Vec<Document>> {
    let pages = pdf.get_pages();
    let total = pages.len() as u32;

    let mut documents = Vec::with_capacity(pages.len());
    for &page in pages.keys() {
        let text = pdf
            .extract_text(&[page])
            .map_err(|e| Error::Document(format!("{source}: page {page}: {e}")))?;

        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        documents.push(Document {
            id: format!("{source}#{page}"),
            content: text.to_string(),
            metadata: DocumentMetadata {
                source: source.to_string(),
                page: Some(page),
                total_pages: Some(total),
            },
        });
    }
    Ok(documents)
}
