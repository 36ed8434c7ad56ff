//! Archive bundles
//!
//! An [`ArchiveBundle`] serializes an ordered [`ArtifactSet`] into a single
//! blob through an [`ArchiveEncoder`]. [`ZipEncoder`] produces standard zip
//! archives with flat entry names.

use crate::artifact::ArtifactSet;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors raised while packaging artifacts
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Nothing to package
    #[error("cannot build an archive with no entries")]
    NoEntries,

    /// Zip encoder failure
    #[error("zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Writing entry data failed
    #[error("archive i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Encoder-specific failure
    #[error("archive encoder failed: {0}")]
    Encoder(String),
}

/// Entry compression used by [`ZipEncoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    /// Entries stored as-is
    Stored,
    /// Entries deflated
    #[default]
    Deflated,
}

impl Compression {
    fn method(self) -> CompressionMethod {
        match self {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// Serializes an artifact set into one archive blob
///
/// Implementations are synchronous; callers run them on a blocking pool.
pub trait ArchiveEncoder: Send + Sync {
    /// Encode `entries`, in order, as one archive
    ///
    /// # Errors
    /// Returns `ArchiveError` if any entry cannot be written
    fn encode(&self, entries: &ArtifactSet) -> Result<Vec<u8>, ArchiveError>;
}

/// Zip archive encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipEncoder {
    compression: Compression,
}

impl ZipEncoder {
    /// Encoder with the given entry compression
    #[inline]
    #[must_use]
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }

    /// Entry compression in use
    #[inline]
    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }
}

impl ArchiveEncoder for ZipEncoder {
    fn encode(&self, entries: &ArtifactSet) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(self.compression.method());

        for artifact in entries {
            writer.start_file(artifact.name(), options)?;
            writer.write_all(artifact.data())?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Ordered artifacts awaiting serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBundle {
    entries: ArtifactSet,
}

impl ArchiveBundle {
    /// Bundle a non-empty artifact set
    ///
    /// # Errors
    /// Returns `ArchiveError::NoEntries` for an empty set
    pub fn new(entries: ArtifactSet) -> Result<Self, ArchiveError> {
        if entries.is_empty() {
            return Err(ArchiveError::NoEntries);
        }
        Ok(Self { entries })
    }

    /// Entries in archive order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &ArtifactSet {
        &self.entries
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; bundles are non-empty by construction
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize with `encoder`
    ///
    /// # Errors
    /// Propagates the encoder's `ArchiveError`
    pub fn encode(&self, encoder: &dyn ArchiveEncoder) -> Result<Vec<u8>, ArchiveError> {
        encoder.encode(&self.entries)
    }
}
