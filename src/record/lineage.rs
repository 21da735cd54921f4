use std::path::{Path, PathBuf};

/// Version chain of one item: `original -> stage result -> stage result`.
///
/// The cursor points at the version the next stage reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    versions: Vec<PathBuf>,
    cursor: usize,
}

impl Lineage {
    pub fn new(original: impl Into<PathBuf>) -> Self {
        Self {
            versions: vec![original.into()],
            cursor: 0,
        }
    }

    pub fn original(&self) -> &Path {
        &self.versions[0]
    }

    pub fn current(&self) -> &Path {
        &self.versions[self.cursor]
    }

    pub fn versions(&self) -> &[PathBuf] {
        &self.versions
    }

    /// Record a new version and make it current.
    pub fn advance(&mut self, next: impl Into<PathBuf>) {
        self.versions.push(next.into());
        self.cursor = self.versions.len() - 1;
    }
}
