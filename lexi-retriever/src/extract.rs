//! Document to text conversion.

use crate::error::{Result, RetrieverError};
use crate::retrieval::chunking_strategy::ChunkingStrategy;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Turns one document into plain text.
pub trait Extractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Extracts PDFs with pdf-extract and reads `txt`/`md` files as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

impl Extractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            // pdf-extract panics on some malformed files.
            Some("pdf") => match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(e)) => Err(RetrieverError::Extraction {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }),
                Err(_) => Err(RetrieverError::Extraction {
                    path: path.to_path_buf(),
                    message: "PDF parser panicked".to_string(),
                }),
            },
            Some("txt") | Some("md") => {
                std::fs::read_to_string(path).map_err(|e| RetrieverError::Extraction {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
            _ => Err(RetrieverError::Extraction {
                path: path.to_path_buf(),
                message: "unsupported document type".to_string(),
            }),
        }
    }
}

/// A document's identifier and its extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

/// Paths under `dir` that `strategy` accepts, sorted.
pub fn discover_documents(dir: &Path, strategy: &ChunkingStrategy) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("document directory {} does not exist", dir.display()),
        )
        .into());
    }

    let mut paths: Vec<PathBuf> = WalkBuilder::new(dir)
        .standard_filters(true)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| strategy.should_index_file(path))
        .collect();

    paths.sort();
    Ok(paths)
}

/// Extracts every accepted document under `dir`, in path order.
///
/// Documents that fail to extract are logged and skipped. The document id is
/// the path relative to `dir`.
pub fn collect_documents(
    dir: &Path,
    strategy: &ChunkingStrategy,
    extractor: &dyn Extractor,
) -> Result<Vec<Document>> {
    let paths = discover_documents(dir, strategy)?;
    tracing::info!("Found {} documents under {}", paths.len(), dir.display());

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let id = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();

        match extractor.extract(&path) {
            Ok(text) => {
                let preview: String = text.chars().take(200).collect();
                tracing::debug!("Extracted {} ({} chars): {:?}", id, text.chars().count(), preview);
                documents.push(Document { id, text });
            }
            Err(e) => tracing::warn!("Skipping {}: {}", id, e),
        }
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::chunking_strategy::IndexConfig;
    use tempfile::tempdir;

    #[test]
    fn test_collect_documents_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("a.md"), "first").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("unit2")).unwrap();
        std::fs::write(dir.path().join("unit2").join("c.txt"), "third").unwrap();

        let strategy = ChunkingStrategy::new(&IndexConfig::default());
        let docs = collect_documents(dir.path(), &strategy, &FileExtractor).unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md", "b.txt", "unit2/c.txt"]);
        assert_eq!(docs[0].text, "first");
    }

    #[test]
    fn test_failed_extraction_is_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), "not really a pdf").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "usable").unwrap();

        let strategy = ChunkingStrategy::new(&IndexConfig::default());
        let docs = collect_documents(dir.path(), &strategy, &FileExtractor).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "notes.txt");
    }

    #[test]
    fn test_missing_directory() {
        let strategy = ChunkingStrategy::new(&IndexConfig::default());
        let err = collect_documents(Path::new("/nonexistent/lexi/docs"), &strategy, &FileExtractor)
            .unwrap_err();
        assert!(matches!(err, RetrieverError::Io(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FileExtractor.extract(Path::new("slides.pptx")).unwrap_err();
        assert!(err.to_string().contains("unsupported document type"));
    }
}
