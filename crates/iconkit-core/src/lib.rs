//! iconkit Core - icon conversion orchestration
//!
//! Drives a native conversion engine through one request at a time:
//! - Stages the source image into the engine namespace
//! - Invokes the native operation and interprets its status code
//! - Collects declared outputs, tolerating missing ones
//! - Packages multi-output results as zip archives
//! - Delivers the named result to a sink
//!
//! # Example
//!
//! ```rust,ignore
//! use iconkit_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(engine: impl ConversionEngine + 'static) -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(EngineSession::new(engine));
//! session.initialize().await?;
//!
//! let sink = Arc::new(DirectorySink::new("icons"));
//! let pipeline = ConversionPipeline::new(session, sink, PipelineConfig::default())?;
//!
//! let source = SourceImage::from_path("logo.png").await?;
//! let report = pipeline.run(source, OperationKind::All, &CancellationToken::new()).await?;
//! println!("delivered {} ({} bytes)", report.file_name, report.bytes);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod collector;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod namespace;
pub mod packaging;
pub mod pipeline;
pub mod request;
pub mod staging;
pub mod state_machine;
pub mod types;

// Re-exports for convenience
pub use collector::{Collection, CollectionStatus, ExpectedOutput, OutputCollector, OutputShape};
pub use config::{NamespaceScope, PipelineConfig};
pub use delivery::{
    base_file_name, base_file_name_or, delivered_file_name, Delivery, DeliveryDispatcher,
    DeliveryReceipt, DeliverySink, DirectorySink,
};
pub use engine::{ConversionEngine, EngineSession, SessionState};
pub use error::{ConfigError, DeliveryError, EngineError, PipelineError, StagingError};
pub use invoker::ConversionInvoker;
pub use namespace::{normalize_path, MemoryNamespace};
pub use packaging::{ArchiveBuilder, Packaged};
pub use pipeline::{ConversionPipeline, ConversionReport};
pub use request::ConversionRequest;
pub use staging::{StagingAdapter, StagingLayout};
pub use state_machine::{allowed_transitions, validate_transition, RequestState, RequestTracker};
pub use types::{
    ConversionStatus, OperationKind, RequestId, SourceImage, Stage, DEFAULT_BASE_NAME,
    ICON_RESOLUTIONS,
};

pub use tokio_util::sync::CancellationToken;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running conversions
    pub use crate::{
        CancellationToken, ConversionEngine, ConversionPipeline, ConversionReport, DeliverySink,
        DirectorySink, EngineSession, NamespaceScope, OperationKind, PipelineConfig,
        PipelineError, SourceImage,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
