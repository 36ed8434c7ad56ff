//! Conversion pipeline
//!
//! Drives one request through stage → invoke → collect → package → deliver.
//! Every stage races the caller's [`CancellationToken`]; a fatal error at any
//! stage aborts the request and nothing is delivered.

use crate::collector::{CollectionStatus, OutputCollector, OutputShape};
use crate::config::{NamespaceScope, PipelineConfig};
use crate::delivery::{base_file_name_or, DeliveryDispatcher, DeliverySink};
use crate::engine::EngineSession;
use crate::error::{ConfigError, PipelineError};
use crate::invoker::ConversionInvoker;
use crate::packaging::ArchiveBuilder;
use crate::request::ConversionRequest;
use crate::state_machine::{RequestState, RequestTracker};
use crate::types::{ConversionStatus, OperationKind, RequestId, SourceImage, Stage, ICON_RESOLUTIONS};
use iconkit_artifact::ContentHash;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Outcome of a delivered conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub request_id: RequestId,
    pub kind: OperationKind,
    /// Name the result was delivered under
    pub file_name: String,
    pub media_type: &'static str,
    /// Delivered byte count
    pub bytes: usize,
    pub hash: ContentHash,
    /// `Complete` or `Partial`; `Empty` never reaches a report
    pub status: CollectionStatus,
    /// Artifacts recovered from the engine
    pub artifact_count: usize,
    /// Whether the delivered bytes are an archive
    pub archived: bool,
}

impl ConversionReport {
    /// Whether some declared outputs were missing
    #[inline]
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self.status, CollectionStatus::Partial { .. })
    }
}

/// Orchestrates conversions against one engine session
#[derive(Debug, Clone)]
pub struct ConversionPipeline {
    session: Arc<EngineSession>,
    builder: ArchiveBuilder,
    dispatcher: DeliveryDispatcher,
    config: PipelineConfig,
}

impl ConversionPipeline {
    /// Pipeline delivering into `sink`
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if `config` fails validation
    pub fn new(
        session: Arc<EngineSession>,
        sink: Arc<dyn DeliverySink>,
        config: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            session,
            builder: ArchiveBuilder::zip(config.compression),
            dispatcher: DeliveryDispatcher::new(sink).with_fallback(config.fallback_base_name.clone()),
            config,
        })
    }

    /// Replace the archive builder
    #[inline]
    #[must_use]
    pub fn with_archive_builder(mut self, builder: ArchiveBuilder) -> Self {
        self.builder = builder;
        self
    }

    #[inline]
    #[must_use]
    pub fn session(&self) -> &Arc<EngineSession> {
        &self.session
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Convert `source` as `kind`, observing `cancel` at every stage
    ///
    /// # Errors
    /// Returns the first fatal `PipelineError`; its [`stage`](PipelineError::stage)
    /// names where the request stopped
    pub async fn run(
        &self,
        source: SourceImage,
        kind: OperationKind,
        cancel: &CancellationToken,
    ) -> Result<ConversionReport, PipelineError> {
        let request = ConversionRequest::new(kind, self.config.namespace);
        let span = tracing::info_span!("conversion", request = %request.id(), operation = %kind);

        async move {
            tracing::info!(source = source.name(), bytes = source.len(), "conversion started");
            let mut tracker = RequestTracker::new(request.id());
            let result = self.execute(&request, source, &mut tracker, cancel).await;

            match &result {
                Ok(report) => tracing::info!(
                    file_name = %report.file_name,
                    bytes = report.bytes,
                    artifacts = report.artifact_count,
                    partial = report.is_partial(),
                    "conversion delivered"
                ),
                Err(e) => {
                    tracker.fail();
                    tracing::error!(stage = %e.stage(), error = %e, "conversion failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// [`run`](Self::run) without a cancellation source
    ///
    /// # Errors
    /// As [`run`](Self::run)
    pub async fn convert(
        &self,
        source: SourceImage,
        kind: OperationKind,
    ) -> Result<ConversionReport, PipelineError> {
        self.run(source, kind, &CancellationToken::new()).await
    }

    /// Convert to a single ICO file
    ///
    /// # Errors
    /// As [`run`](Self::run)
    pub async fn convert_to_ico(&self, source: SourceImage) -> Result<ConversionReport, PipelineError> {
        self.convert(source, OperationKind::Ico).await
    }

    /// Convert to a zip of PNGs, one per resolution
    ///
    /// # Errors
    /// As [`run`](Self::run)
    pub async fn convert_to_pngs(&self, source: SourceImage) -> Result<ConversionReport, PipelineError> {
        self.convert(source, OperationKind::PngSet).await
    }

    /// Convert to a single ICNS file
    ///
    /// # Errors
    /// As [`run`](Self::run)
    pub async fn convert_to_icns(&self, source: SourceImage) -> Result<ConversionReport, PipelineError> {
        self.convert(source, OperationKind::Icns).await
    }

    /// Convert to a zip holding the ICNS, the ICO and every PNG
    ///
    /// # Errors
    /// As [`run`](Self::run)
    pub async fn convert_to_all(&self, source: SourceImage) -> Result<ConversionReport, PipelineError> {
        self.convert(source, OperationKind::All).await
    }

    /// Check preconditions, take the gate if needed and release scoped files
    async fn execute(
        &self,
        request: &ConversionRequest,
        source: SourceImage,
        tracker: &mut RequestTracker,
        cancel: &CancellationToken,
    ) -> Result<ConversionReport, PipelineError> {
        self.session.engine()?;
        let kind = request.kind();

        let base = base_file_name_or(source.name(), &self.config.fallback_base_name);
        if base.contains(['/', '\\']) {
            return Err(PipelineError::InvalidSourceName(source.name().to_string()));
        }

        let _gate = if self.config.namespace.is_exclusive(kind) {
            Some(
                guarded(Stage::Staging, cancel, async {
                    Ok::<_, PipelineError>(self.session.exclusive().await)
                })
                .await?,
            )
        } else {
            None
        };

        let result = self.process(request, source, &base, tracker, cancel).await;
        if self.config.namespace == NamespaceScope::PerRequest {
            self.release(request).await;
        }
        result
    }

    async fn process(
        &self,
        request: &ConversionRequest,
        source: SourceImage,
        base: &str,
        tracker: &mut RequestTracker,
        cancel: &CancellationToken,
    ) -> Result<ConversionReport, PipelineError> {
        let kind = request.kind();
        let layout = request.layout();
        let staging = self.session.staging();
        let shape = OutputShape::for_request(kind, layout, base, &self.config.resolutions);

        // collected outputs must not predate this request
        for expected in shape.outputs() {
            guarded(Stage::Staging, cancel, staging.remove(&expected.path)).await?;
        }
        guarded(Stage::Staging, cancel, staging.write(layout.input(), source.bytes())).await?;
        let source_name = source.name().to_string();
        drop(source);
        tracker.advance(RequestState::Staged)?;

        let invoker = ConversionInvoker::new(&self.session);
        let invocation = invoker.invoke(request);
        let status = match self.config.invoke_timeout() {
            Some(limit) => {
                guarded(Stage::Invocation, cancel, async {
                    tokio::time::timeout(limit, invocation)
                        .await
                        .map_err(|_| PipelineError::Timeout {
                            stage: Stage::Invocation,
                            duration_secs: limit.as_secs(),
                        })?
                        .map_err(PipelineError::from)
                })
                .await?
            }
            None => guarded(Stage::Invocation, cancel, invocation).await?,
        };
        tracker.advance(RequestState::Invoked)?;

        if let ConversionStatus::Failed(code) = status {
            return Err(PipelineError::ConversionFailed {
                operation: kind.native_name(),
                code,
            });
        }

        let collection = guarded(
            Stage::Collection,
            cancel,
            OutputCollector::new(&self.session).collect(&shape),
        )
        .await?;
        if !collection.status.is_deliverable() {
            return Err(PipelineError::EmptyOutput {
                operation: kind.native_name(),
                expected: shape.len(),
            });
        }
        tracker.advance(RequestState::Collected)?;

        let artifact_count = collection.artifacts.len();
        let packaged = guarded(
            Stage::Packaging,
            cancel,
            self.builder.build(kind, collection.artifacts),
        )
        .await?;
        tracker.advance(RequestState::Packaged)?;

        let archived = packaged.archived;
        let receipt = guarded(
            Stage::Delivery,
            cancel,
            self.dispatcher.deliver(packaged.bytes, &source_name, kind),
        )
        .await?;
        tracker.advance(RequestState::Delivered)?;

        Ok(ConversionReport {
            request_id: request.id(),
            kind,
            file_name: receipt.file_name,
            media_type: receipt.media_type,
            bytes: receipt.len,
            hash: receipt.hash,
            status: collection.status,
            artifact_count,
            archived,
        })
    }

    /// Remove every path a request-scoped run may have left behind
    ///
    /// Root PNG paths are only touched by PNG-producing kinds, which still
    /// hold the gate here.
    async fn release(&self, request: &ConversionRequest) {
        let staging = self.session.staging();
        let layout = request.layout();
        let mut paths = layout.scoped_paths();
        if request.kind().is_multi_output() {
            paths.extend(
                ICON_RESOLUTIONS
                    .iter()
                    .chain(&self.config.resolutions)
                    .map(|&size| layout.png(size)),
            );
            paths.sort_unstable();
            paths.dedup();
        }
        for path in paths {
            if let Err(e) = staging.remove(&path).await {
                tracing::warn!(path, error = %e, "failed to remove staged file");
            }
        }
    }
}

/// Run `fut` unless `cancel` fires first
async fn guarded<F, T, E>(stage: Stage, cancel: &CancellationToken, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, E>>,
    PipelineError: From<E>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(%stage, "cancellation observed");
            Err(PipelineError::Cancelled { stage })
        }
        result = fut => result.map_err(PipelineError::from),
    }
}
