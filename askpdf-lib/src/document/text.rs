use std::fs;
use std::path::Path;

use crate::document::{Document, DocumentLoader};
use crate::{Error, Result};

/// Plain text loader for `.txt` and `.md` files.
///
/// The whole file becomes one document; empty files produce none.
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn extensions(&self) -> &[&'static str] {
        &["txt", "md"]
    }

    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Document(format!("{}: {e}", path.display())))?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![Document::new(path.display().to_string(), content)])
    }
}
