//! Error types for iconkit Core
//!
//! Provides error handling for:
//! - Engine access and native calls
//! - Staging reads and writes
//! - Empty or failed conversions
//! - Packaging and delivery failures
//! - Cancellation and timeouts

use crate::state_machine::RequestState;
use crate::types::Stage;
use iconkit_artifact::{ArchiveError, ArtifactError};

/// Main pipeline error type
///
/// Every variant except `ArtifactMissing` aborts the request; nothing is
/// delivered once one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Request issued before the engine session was initialized
    #[error("conversion engine is not initialized")]
    EngineNotInitialized,

    /// Source filename would yield a nested output name
    #[error("source name {0:?} contains a path separator")]
    InvalidSourceName(String),

    /// Input bytes could not be placed into the engine namespace
    #[error("staging failed: {0}")]
    StagingWrite(#[source] StagingError),

    /// Engine became unreachable while outputs were being read
    #[error("reading outputs failed: {0}")]
    StagingRead(#[source] StagingError),

    /// Native operation returned a nonzero status
    #[error("{operation} failed with status {code}")]
    ConversionFailed { operation: &'static str, code: i32 },

    /// Native call could not be made at all
    #[error("engine call failed: {0}")]
    Engine(#[source] EngineError),

    /// A required output path was absent
    #[error("artifact missing: {0}")]
    ArtifactMissing(String),

    /// None of the declared outputs were recovered
    #[error("{operation} produced none of its {expected} declared outputs")]
    EmptyOutput { operation: &'static str, expected: usize },

    /// Collected bytes could not form a valid artifact
    #[error("invalid artifact: {0}")]
    Artifact(#[from] ArtifactError),

    /// Packaging failed
    #[error("packaging failed: {0}")]
    ArchiveBuild(#[from] ArchiveError),

    /// Delivery capability rejected the result
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Cancellation signal observed
    #[error("operation cancelled during {stage}")]
    Cancelled { stage: Stage },

    /// Stage exceeded its configured time limit
    #[error("{stage} timed out after {duration_secs}s")]
    Timeout { stage: Stage, duration_secs: u64 },

    /// Request lifecycle violated
    #[error("illegal request transition {from:?} -> {to:?}")]
    IllegalTransition { from: RequestState, to: RequestState },
}

impl PipelineError {
    /// Stage at which the request failed
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::EngineNotInitialized => Stage::Initialization,
            Self::InvalidSourceName(_) | Self::StagingWrite(_) => Stage::Staging,
            Self::ConversionFailed { .. } | Self::Engine(_) => Stage::Invocation,
            Self::StagingRead(_)
            | Self::ArtifactMissing(_)
            | Self::EmptyOutput { .. }
            | Self::Artifact(_) => Stage::Collection,
            Self::ArchiveBuild(_) => Stage::Packaging,
            Self::Delivery(_) => Stage::Delivery,
            Self::Cancelled { stage } | Self::Timeout { stage, .. } => *stage,
            Self::IllegalTransition { from, .. } => from.stage(),
        }
    }

    /// Check if the request was cancelled by its caller
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Check if the error is absorbed by the collector rather than aborting
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ArtifactMissing(_))
    }
}

impl From<EngineError> for PipelineError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::NotInitialized => Self::EngineNotInitialized,
            other => Self::Engine(other),
        }
    }
}

impl From<StagingError> for PipelineError {
    fn from(error: StagingError) -> Self {
        match error {
            StagingError::Write { .. } => Self::StagingWrite(error),
            StagingError::Read { .. } => Self::StagingRead(error),
            StagingError::ArtifactMissing(path) => Self::ArtifactMissing(path),
        }
    }
}

/// Errors raised by a conversion engine implementation
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Engine used before `initialize` completed
    #[error("engine is not initialized")]
    NotInitialized,

    /// Engine setup failed
    #[error("engine initialization failed: {0}")]
    InitFailed(String),

    /// Path cannot be mapped into the namespace
    #[error("invalid namespace path: {0:?}")]
    InvalidPath(String),

    /// Namespace I/O failure
    #[error("namespace i/o failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Native call mechanics failed (distinct from a nonzero status)
    #[error("call to {operation} failed: {message}")]
    Call { operation: String, message: String },
}

/// Staging adapter errors
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Bytes could not be written into the namespace
    #[error("cannot stage {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: EngineError,
    },

    /// Namespace unreachable while reading
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: EngineError,
    },

    /// Path does not exist in the namespace
    #[error("artifact missing: {0}")]
    ArtifactMissing(String),
}

/// Delivery capability errors
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Sink refused the payload
    #[error("delivery rejected: {0}")]
    Rejected(String),

    /// Sink I/O failure
    #[error("delivery i/o failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantically invalid value
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::ConversionFailed {
            operation: "wasm_convert_to_ico",
            code: -2,
        };
        assert_eq!(err.to_string(), "wasm_convert_to_ico failed with status -2");
    }

    #[test]
    fn pipeline_error_stages() {
        assert_eq!(PipelineError::EngineNotInitialized.stage(), Stage::Initialization);
        assert_eq!(
            PipelineError::EmptyOutput {
                operation: "wasm_convert_to_pngs",
                expected: 14
            }
            .stage(),
            Stage::Collection
        );
        assert_eq!(
            PipelineError::Delivery(DeliveryError::Rejected("full".into())).stage(),
            Stage::Delivery
        );
        assert_eq!(
            PipelineError::Cancelled {
                stage: Stage::Packaging
            }
            .stage(),
            Stage::Packaging
        );
    }

    #[test]
    fn illegal_transition_reports_last_reached_stage() {
        use crate::state_machine::validate_transition;

        let err = validate_transition(RequestState::Collected, RequestState::Delivered).unwrap_err();
        assert_eq!(err.stage(), Stage::Collection);

        let err = validate_transition(RequestState::Delivered, RequestState::Failed).unwrap_err();
        assert_eq!(err.stage(), Stage::Delivery);
    }

    #[test]
    fn invalid_source_name_is_a_staging_error() {
        let err = PipelineError::InvalidSourceName("a/b.png".into());
        assert_eq!(err.stage(), Stage::Staging);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn engine_not_initialized_maps_through() {
        let err: PipelineError = EngineError::NotInitialized.into();
        assert!(matches!(err, PipelineError::EngineNotInitialized));

        let err: PipelineError = EngineError::InvalidPath("../x".into()).into();
        assert!(matches!(err, PipelineError::Engine(_)));
    }

    #[test]
    fn staging_errors_map_by_direction() {
        let write: PipelineError = StagingError::Write {
            path: "input.png".into(),
            source: EngineError::NotInitialized,
        }
        .into();
        assert_eq!(write.stage(), Stage::Staging);

        let read: PipelineError = StagingError::Read {
            path: "/16.png".into(),
            source: EngineError::InitFailed("gone".into()),
        }
        .into();
        assert_eq!(read.stage(), Stage::Collection);

        let missing: PipelineError = StagingError::ArtifactMissing("/16.png".into()).into();
        assert!(missing.is_recoverable());
    }
}
