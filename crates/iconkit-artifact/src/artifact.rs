//! Output artifacts
//!
//! An [`OutputArtifact`] is one named byte payload read back from the
//! conversion engine. Its name is the eventual file or archive entry name,
//! so it must be a flat file name.

use crate::hash::ContentHash;

/// Errors related to artifact construction
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Name is empty or contains a path separator
    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),

    /// Two artifacts in one set share a name
    #[error("duplicate artifact name: {0}")]
    DuplicateName(String),
}

/// One named output payload
///
/// # Invariants
/// - `hash` is always `ContentHash::compute(&data)`
/// - `name` is non-empty and has no directory component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    name: String,
    data: Vec<u8>,
    hash: ContentHash,
}

impl OutputArtifact {
    /// Create an artifact, validating its name
    ///
    /// # Errors
    /// Returns `ArtifactError::InvalidName` for empty names or names with
    /// `/` or `\`
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Result<Self, ArtifactError> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ArtifactError::InvalidName(name));
        }
        let hash = ContentHash::compute(&data);
        Ok(Self { name, data, hash })
    }

    /// Logical name (file or entry name)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload bytes
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload digest
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Payload length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the payload bytes
    #[inline]
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Ordered collection of artifacts with unique names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    artifacts: Vec<OutputArtifact>,
}

impl ArtifactSet {
    /// Empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an artifact, keeping insertion order
    ///
    /// # Errors
    /// Returns `ArtifactError::DuplicateName` if the name is already present
    pub fn push(&mut self, artifact: OutputArtifact) -> Result<(), ArtifactError> {
        if self.contains(artifact.name()) {
            return Err(ArtifactError::DuplicateName(artifact.name));
        }
        self.artifacts.push(artifact);
        Ok(())
    }

    /// Whether an artifact with `name` is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.iter().any(|a| a.name() == name)
    }

    /// Look up an artifact by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutputArtifact> {
        self.artifacts.iter().find(|a| a.name() == name)
    }

    /// Names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(OutputArtifact::name)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, OutputArtifact> {
        self.artifacts.iter()
    }

    /// Number of artifacts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Total payload bytes across all artifacts
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.artifacts.iter().map(OutputArtifact::len).sum()
    }

    /// Take the single artifact if the set holds exactly one
    ///
    /// # Errors
    /// Gives the set back unchanged if it holds zero or several artifacts
    pub fn into_single(mut self) -> Result<OutputArtifact, Self> {
        if self.artifacts.len() == 1 {
            Ok(self.artifacts.remove(0))
        } else {
            Err(self)
        }
    }

    /// Take all artifacts in order
    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<OutputArtifact> {
        self.artifacts
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a OutputArtifact;
    type IntoIter = std::slice::Iter<'a, OutputArtifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.iter()
    }
}

impl IntoIterator for ArtifactSet {
    type Item = OutputArtifact;
    type IntoIter = std::vec::IntoIter<OutputArtifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.into_iter()
    }
}
