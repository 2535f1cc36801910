// Corpus discovery: turns an input folder into an ordered list of documents.
//
// A Document only records identity (path + modification time). Page text is
// pulled on demand by a PageExtractor, so scanning a folder is cheap and the
// cache can decide whether extraction is needed at all.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ConfigurationError;

/// File extensions the default extractor knows how to read.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// One document in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Position of the document in the scanned corpus.
    pub id: usize,
    pub path: PathBuf,
    /// Part of the cache identity: touching the file yields a fresh cache key.
    #[serde(skip)]
    pub modified_time: SystemTime,
}

impl Document {
    pub fn new(id: usize, path: impl Into<PathBuf>, modified_time: SystemTime) -> Self {
        Self {
            id,
            path: path.into(),
            modified_time,
        }
    }

    /// Build a document from a file on disk, reading its modification time.
    pub fn from_path(id: usize, path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let modified_time = fs::metadata(&path)?.modified()?;
        Ok(Self::new(id, path, modified_time))
    }

    /// Row label used in reports: the file's basename.
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// List supported documents directly inside `dir`, sorted by file name.
/// Subfolders are not descended into.
pub fn scan_folder(dir: &Path) -> Result<Vec<Document>, ConfigurationError> {
    if dir.as_os_str().is_empty() {
        return Err(ConfigurationError::MissingInput);
    }
    if !dir.exists() {
        return Err(ConfigurationError::InputNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(ConfigurationError::InputNotDirectory(dir.to_path_buf()));
    }

    let entries =
        fs::read_dir(dir).map_err(|_| ConfigurationError::InputNotFound(dir.to_path_buf()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_supported(path))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        // A file that vanished between listing and stat is simply skipped
        match Document::from_path(documents.len(), &path) {
            Ok(doc) => documents.push(doc),
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable file"),
        }
    }

    if documents.is_empty() {
        return Err(ConfigurationError::NoDocuments(dir.to_path_buf()));
    }

    info!(folder = %dir.display(), documents = documents.len(), "Scanned input folder");
    Ok(documents)
}

/// Whether the file extension is one we can extract (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.TXT"), "first").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let docs = scan_folder(dir.path()).unwrap();
        let labels: Vec<String> = docs.iter().map(Document::label).collect();
        assert_eq!(labels, vec!["a.TXT", "b.txt"]);
        assert_eq!(docs[0].id, 0);
        assert_eq!(docs[1].id, 1);
    }

    #[test]
    fn test_scan_empty_folder_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_folder(dir.path()).unwrap_err();
        assert_eq!(err, ConfigurationError::NoDocuments(dir.path().to_path_buf()));
    }

    #[test]
    fn test_scan_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(
            scan_folder(&missing).unwrap_err(),
            ConfigurationError::InputNotFound(missing)
        );
        assert_eq!(
            scan_folder(Path::new("")).unwrap_err(),
            ConfigurationError::MissingInput
        );
    }
}
