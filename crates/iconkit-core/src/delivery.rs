//! Delivery dispatch
//!
//! Names the final payload after the source file and hands it to a
//! [`DeliverySink`]. Delivery completes when the sink accepts the bytes.

use crate::error::DeliveryError;
use crate::types::{OperationKind, DEFAULT_BASE_NAME};
use iconkit_artifact::ContentHash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Strip the last extension from `name`
///
/// An extension is a final `.` followed by at least one character, none of
/// them `/`. Falls back to `output` if nothing is left.
#[must_use]
pub fn base_file_name(name: &str) -> String {
    base_file_name_or(name, DEFAULT_BASE_NAME)
}

/// [`base_file_name`] with an explicit fallback
#[must_use]
pub fn base_file_name_or(name: &str, fallback: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    };
    if stem.is_empty() {
        fallback.to_string()
    } else {
        stem.to_string()
    }
}

/// Delivered file name for `source_name` converted as `kind`
#[must_use]
pub fn delivered_file_name(source_name: &str, kind: OperationKind, fallback: &str) -> String {
    format!("{}{}", base_file_name_or(source_name, fallback), kind.file_suffix())
}

/// Bytes, file name and media type handed to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

/// External delivery capability
#[async_trait::async_trait]
pub trait DeliverySink: Send + Sync {
    /// Accept one delivery; returning `Ok` means the bytes were taken
    async fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError>;
}

/// Writes deliveries into a directory on disk
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl DeliverySink for DirectorySink {
    async fn deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        if delivery.file_name.is_empty()
            || delivery.file_name.contains(['/', '\\'])
            || delivery.file_name == ".."
        {
            return Err(DeliveryError::Rejected(format!(
                "not a plain file name: {:?}",
                delivery.file_name
            )));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error(&self.dir))?;
        let target = self.dir.join(&delivery.file_name);
        tokio::fs::write(&target, &delivery.bytes)
            .await
            .map_err(io_error(&target))?;

        tracing::info!(
            path = %target.display(),
            media_type = delivery.media_type,
            bytes = delivery.bytes.len(),
            "wrote delivery"
        );
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DeliveryError {
    let path = path.display().to_string();
    move |source| DeliveryError::Io { path, source }
}

/// What was delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub file_name: String,
    pub media_type: &'static str,
    pub len: usize,
    pub hash: ContentHash,
}

/// Names payloads and forwards them to a sink
#[derive(Clone)]
pub struct DeliveryDispatcher {
    sink: Arc<dyn DeliverySink>,
    fallback: String,
}

impl DeliveryDispatcher {
    #[must_use]
    pub fn new(sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            sink,
            fallback: DEFAULT_BASE_NAME.to_string(),
        }
    }

    /// Base name used when the source name yields none
    #[inline]
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Deliver `bytes` produced from `source_name` by `kind`
    ///
    /// # Errors
    /// Returns the sink's `DeliveryError`
    pub async fn deliver(
        &self,
        bytes: Vec<u8>,
        source_name: &str,
        kind: OperationKind,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let file_name = delivered_file_name(source_name, kind, &self.fallback);
        let receipt = DeliveryReceipt {
            file_name: file_name.clone(),
            media_type: kind.media_type(),
            len: bytes.len(),
            hash: ContentHash::compute(&bytes),
        };

        self.sink
            .deliver(Delivery {
                file_name,
                media_type: receipt.media_type,
                bytes,
            })
            .await?;
        Ok(receipt)
    }
}

impl std::fmt::Debug for DeliveryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryDispatcher")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}
