//! Output collection
//!
//! After a successful native call the collector reads every output the
//! operation declares. Absent outputs are skipped with a warning. The result
//! is `Empty` (fatal), `Partial` or `Complete`.

use crate::engine::EngineSession;
use crate::error::PipelineError;
use crate::staging::StagingLayout;
use crate::types::OperationKind;
use iconkit_artifact::{ArtifactSet, OutputArtifact};

/// One declared output: where the engine writes it, what it is called in the
/// delivered result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOutput {
    pub path: String,
    pub name: String,
}

impl ExpectedOutput {
    fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// Outputs an operation is expected to produce, in delivery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputShape {
    kind: OperationKind,
    outputs: Vec<ExpectedOutput>,
}

impl OutputShape {
    /// Declared outputs of `kind`
    ///
    /// Container files are named `{base}.ico` / `{base}.icns`; PNGs keep
    /// their `{size}.png` names. The combined operation lists the ICNS, then
    /// the ICO, then every PNG.
    #[must_use]
    pub fn for_request(
        kind: OperationKind,
        layout: &StagingLayout,
        base: &str,
        resolutions: &[u32],
    ) -> Self {
        let pngs = || {
            resolutions
                .iter()
                .map(|&size| ExpectedOutput::new(layout.png(size), format!("{size}.png")))
        };

        let outputs = match kind {
            OperationKind::Ico => vec![ExpectedOutput::new(layout.ico_output(), format!("{base}.ico"))],
            OperationKind::Icns => {
                vec![ExpectedOutput::new(layout.icns_output(), format!("{base}.icns"))]
            }
            OperationKind::PngSet => pngs().collect(),
            OperationKind::All => {
                let mut outputs = vec![
                    ExpectedOutput::new(layout.both_icns(), format!("{base}.icns")),
                    ExpectedOutput::new(layout.both_ico(), format!("{base}.ico")),
                ];
                outputs.extend(pngs());
                outputs
            }
        };
        Self { kind, outputs }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &[ExpectedOutput] {
        &self.outputs
    }

    /// Number of declared outputs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// How much of the declared shape was recovered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Every declared output was read
    Complete,
    /// Some outputs were absent; the rest are still delivered
    Partial { missing: Vec<String> },
    /// Nothing was recovered
    Empty,
}

impl CollectionStatus {
    /// Whether the pipeline may proceed to packaging
    #[inline]
    #[must_use]
    pub fn is_deliverable(&self) -> bool {
        !matches!(self, CollectionStatus::Empty)
    }
}

/// Artifacts read back from the namespace
#[derive(Debug)]
pub struct Collection {
    pub artifacts: ArtifactSet,
    pub status: CollectionStatus,
}

/// Reads declared outputs through the staging adapter
#[derive(Debug, Clone, Copy)]
pub struct OutputCollector<'a> {
    session: &'a EngineSession,
}

impl<'a> OutputCollector<'a> {
    #[inline]
    #[must_use]
    pub fn new(session: &'a EngineSession) -> Self {
        Self { session }
    }

    /// Read every output in `shape`, skipping absent ones
    ///
    /// Returns a `Collection` even when nothing was recovered; the caller
    /// decides what `Empty` means.
    ///
    /// # Errors
    /// Returns `PipelineError::StagingRead` if the engine is unreachable and
    /// `PipelineError::Artifact` for an output that cannot be named
    pub async fn collect(&self, shape: &OutputShape) -> Result<Collection, PipelineError> {
        let staging = self.session.staging();
        let mut artifacts = ArtifactSet::new();
        let mut missing = Vec::new();

        for expected in shape.outputs() {
            match staging.try_read(&expected.path).await? {
                Some(bytes) => {
                    tracing::debug!(path = %expected.path, bytes = bytes.len(), "collected output");
                    artifacts.push(OutputArtifact::new(expected.name.clone(), bytes)?)?;
                }
                None => {
                    tracing::warn!(
                        path = %expected.path,
                        operation = shape.kind().native_name(),
                        "declared output missing, skipping"
                    );
                    missing.push(expected.path.clone());
                }
            }
        }

        let status = if artifacts.is_empty() {
            CollectionStatus::Empty
        } else if missing.is_empty() {
            CollectionStatus::Complete
        } else {
            CollectionStatus::Partial { missing }
        };
        tracing::debug!(
            recovered = artifacts.len(),
            declared = shape.len(),
            ?status,
            "collection finished"
        );
        Ok(Collection { artifacts, status })
    }
}
