//! Document text sources.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DocumentError, Result};
use crate::pdf::PdfExtractor;

/// Produces the full text of a document from its reference.
pub trait TextSource: Send + Sync {
    /// Full text of `document`. Errors are per-document.
    fn full_text(&self, document: &str) -> Result<String>;
}

/// Reads documents from a directory: `.pdf` through the PDF extractor,
/// `.txt` verbatim.
#[derive(Debug, Clone)]
pub struct FileTextSource {
    root: PathBuf,
}

impl FileTextSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Extract text from a file given by path, ignoring the root.
    pub fn read_path(path: &Path) -> Result<String> {
        let display = path.display().to_string();
        if !path.is_file() {
            return Err(DocumentError::NotFound(display).into());
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let text = match extension.as_str() {
            "pdf" => {
                let data = std::fs::read(path).map_err(|e| DocumentError::Unreadable {
                    path: display.clone(),
                    reason: e.to_string(),
                })?;
                PdfExtractor::text_from_bytes(&data)?
            }
            "txt" => std::fs::read_to_string(path).map_err(|e| DocumentError::Unreadable {
                path: display.clone(),
                reason: e.to_string(),
            })?,
            _ => return Err(DocumentError::UnsupportedFormat(display).into()),
        };

        if text.trim().is_empty() {
            return Err(DocumentError::EmptyText(display).into());
        }

        debug!(path = %path.display(), chars = text.len(), "document text loaded");
        Ok(text)
    }
}

impl TextSource for FileTextSource {
    fn full_text(&self, document: &str) -> Result<String> {
        Self::read_path(&self.root.join(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegcacheError;

    #[test]
    fn test_reads_text_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rg1.txt"), "NOME MARIA\n04/02/2021").unwrap();

        let source = FileTextSource::new(dir.path());
        assert_eq!(source.full_text("rg1.txt").unwrap(), "NOME MARIA\n04/02/2021");
    }

    #[test]
    fn test_per_document_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blank.txt"), "  \n ").unwrap();
        std::fs::write(dir.path().join("scan.docx"), "x").unwrap();
        std::fs::write(dir.path().join("broken.pdf"), "not a pdf").unwrap();
        let source = FileTextSource::new(dir.path());

        let missing = source.full_text("missing.pdf").unwrap_err();
        assert!(matches!(missing, RegcacheError::Document(DocumentError::NotFound(_))));

        let blank = source.full_text("blank.txt").unwrap_err();
        assert!(matches!(blank, RegcacheError::Document(DocumentError::EmptyText(_))));

        let docx = source.full_text("scan.docx").unwrap_err();
        assert!(matches!(docx, RegcacheError::Document(DocumentError::UnsupportedFormat(_))));

        let broken = source.full_text("broken.pdf").unwrap_err();
        assert!(broken.is_per_document());
    }
}
