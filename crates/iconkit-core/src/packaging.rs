//! Archive builder
//!
//! Single-output operations pass their one artifact through untouched.
//! Multi-output operations are always archived, even when only one artifact
//! was recovered.

use crate::types::OperationKind;
use iconkit_artifact::{ArchiveBundle, ArchiveEncoder, ArchiveError, ArtifactSet, Compression, ZipEncoder};
use std::sync::Arc;

/// Final payload handed to delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packaged {
    pub bytes: Vec<u8>,
    /// Whether `bytes` is an archive
    pub archived: bool,
    /// Artifacts contained in `bytes`
    pub entries: usize,
}

/// Packages collected artifacts by operation kind
#[derive(Clone)]
pub struct ArchiveBuilder {
    encoder: Arc<dyn ArchiveEncoder>,
}

impl ArchiveBuilder {
    /// Builder using a zip encoder with `compression`
    #[must_use]
    pub fn zip(compression: Compression) -> Self {
        Self::with_encoder(Arc::new(ZipEncoder::new(compression)))
    }

    /// Builder using a custom archive encoder
    #[must_use]
    pub fn with_encoder(encoder: Arc<dyn ArchiveEncoder>) -> Self {
        Self { encoder }
    }

    /// Package `artifacts` for delivery as `kind`
    ///
    /// Archive encoding runs on the blocking pool.
    ///
    /// # Errors
    /// Returns `ArchiveError::NoEntries` for an empty set,
    /// `ArchiveError::Encoder` if a single-output kind holds more than one
    /// artifact, or the encoder's error
    pub async fn build(&self, kind: OperationKind, artifacts: ArtifactSet) -> Result<Packaged, ArchiveError> {
        if !kind.is_multi_output() {
            return match artifacts.into_single() {
                Ok(artifact) => Ok(Packaged {
                    bytes: artifact.into_data(),
                    archived: false,
                    entries: 1,
                }),
                Err(set) if set.is_empty() => Err(ArchiveError::NoEntries),
                Err(set) => Err(ArchiveError::Encoder(format!(
                    "{kind} yields one artifact, got {}",
                    set.len()
                ))),
            };
        }

        let bundle = ArchiveBundle::new(artifacts)?;
        let entries = bundle.len();
        let encoder = Arc::clone(&self.encoder);
        let bytes = tokio::task::spawn_blocking(move || bundle.encode(encoder.as_ref()))
            .await
            .map_err(|e| ArchiveError::Encoder(format!("archive task failed: {e}")))??;

        tracing::debug!(entries, bytes = bytes.len(), "built archive");
        Ok(Packaged {
            bytes,
            archived: true,
            entries,
        })
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::zip(Compression::default())
    }
}

impl std::fmt::Debug for ArchiveBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBuilder").finish_non_exhaustive()
    }
}
