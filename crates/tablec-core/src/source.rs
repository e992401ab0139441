//! Schema source loading.
//!
//! The compiler only ever needs the complete text of one schema file. The
//! [`SourceProvider`] trait keeps that read behind a seam so tests and
//! embedders can compile schemas that never touch the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Supplies the full text of a schema file.
pub trait SourceProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Reads schemas from disk. The file handle is dropped before returning.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// Serves schemas from a path-to-text map.
#[derive(Default)]
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(files: HashMap<PathBuf, String>) -> Self {
        Self { files }
    }

    /// Add or replace one file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("schema not found in memory: {}", path.display()),
            )
        })
    }
}
