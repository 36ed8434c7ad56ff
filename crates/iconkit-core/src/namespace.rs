//! In-memory virtual namespace
//!
//! Engines that keep their exchange files in memory store them here.
//! Paths are normalized so that `output.ico` and `/output.ico` name the same
//! entry, matching an engine whose working directory is the namespace root.

use crate::error::EngineError;
use dashmap::DashMap;

/// Normalize a namespace path to its root-relative form
///
/// # Errors
/// Returns `EngineError::InvalidPath` for empty paths and paths containing
/// `..` or empty segments
pub fn normalize_path(path: &str) -> Result<String, EngineError> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty()
        || trimmed
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(EngineError::InvalidPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Concurrent path → bytes map
#[derive(Debug, Default)]
pub struct MemoryNamespace {
    files: DashMap<String, Vec<u8>>,
}

impl MemoryNamespace {
    /// Empty namespace
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` at `path`, replacing any previous entry
    ///
    /// # Errors
    /// Returns `EngineError::InvalidPath` if `path` does not normalize
    pub fn write(&self, path: &str, data: &[u8]) -> Result<(), EngineError> {
        self.files.insert(normalize_path(path)?, data.to_vec());
        Ok(())
    }

    /// Copy of the bytes at `path`, if present
    ///
    /// # Errors
    /// Returns `EngineError::InvalidPath` if `path` does not normalize
    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>, EngineError> {
        let key = normalize_path(path)?;
        Ok(self.files.get(&key).map(|entry| entry.value().clone()))
    }

    /// Remove the entry at `path`; absent entries are not an error
    ///
    /// # Errors
    /// Returns `EngineError::InvalidPath` if `path` does not normalize
    pub fn remove(&self, path: &str) -> Result<(), EngineError> {
        self.files.remove(&normalize_path(path)?);
        Ok(())
    }

    /// Whether `path` holds an entry
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        normalize_path(path).is_ok_and(|key| self.files.contains_key(&key))
    }

    /// Sorted list of stored paths, root-relative
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Number of stored entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.files.clear();
    }
}
