//! Core types for the conversion pipeline
//!
//! - Operation kinds and their native names
//! - Source images and request identifiers
//! - Engine status codes and pipeline stages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use ulid::Ulid;

/// Standard icon edge lengths, in pixels, produced by the PNG-set operations
pub const ICON_RESOLUTIONS: [u32; 14] = [16, 24, 30, 32, 40, 48, 64, 72, 80, 96, 128, 256, 512, 1024];

/// Base name used when the source filename yields an empty one
pub const DEFAULT_BASE_NAME: &str = "output";

/// Unique request identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Ulid);

impl RequestId {
    /// Generate new request ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four conversion operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// Windows ICO container
    Ico,
    /// Discrete PNG files at every configured resolution
    PngSet,
    /// macOS ICNS container
    Icns,
    /// ICNS, ICO and the PNG set together
    All,
}

impl OperationKind {
    /// Every operation kind
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Ico,
        OperationKind::PngSet,
        OperationKind::Icns,
        OperationKind::All,
    ];

    /// Name of the native engine entry point
    #[inline]
    #[must_use]
    pub fn native_name(self) -> &'static str {
        match self {
            OperationKind::Ico => "wasm_convert_to_ico",
            OperationKind::PngSet => "wasm_convert_to_pngs",
            OperationKind::Icns => "wasm_convert_to_icns",
            OperationKind::All => "wasm_convert_to_both",
        }
    }

    /// Whether the caller always receives an archive for this kind
    #[inline]
    #[must_use]
    pub fn is_multi_output(self) -> bool {
        matches!(self, OperationKind::PngSet | OperationKind::All)
    }

    /// Suffix appended to the base name of the delivered file
    #[inline]
    #[must_use]
    pub fn file_suffix(self) -> &'static str {
        match self {
            OperationKind::Ico => ".ico",
            OperationKind::Icns => ".icns",
            OperationKind::PngSet => "_pngs.zip",
            OperationKind::All => "_all_formats.zip",
        }
    }

    /// Media type of the delivered file
    #[inline]
    #[must_use]
    pub fn media_type(self) -> &'static str {
        match self {
            OperationKind::Ico => "image/x-icon",
            OperationKind::Icns => "image/icns",
            OperationKind::PngSet | OperationKind::All => "application/zip",
        }
    }

    /// Short CLI-facing name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Ico => "ico",
            OperationKind::PngSet => "pngs",
            OperationKind::Icns => "icns",
            OperationKind::All => "all",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ico" => Ok(OperationKind::Ico),
            "pngs" | "png" | "png-set" => Ok(OperationKind::PngSet),
            "icns" => Ok(OperationKind::Icns),
            "all" | "both" => Ok(OperationKind::All),
            other => Err(format!("unknown operation: {other}")),
        }
    }
}

/// Raw source image bytes plus the filename they arrived under
///
/// Owned by one request and dropped once staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    name: String,
    bytes: Vec<u8>,
}

impl SourceImage {
    /// Create from a filename and bytes
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a source image from disk, keeping only the final path component
    /// as its name
    ///
    /// # Errors
    /// Returns the underlying I/O error if the file cannot be read
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }

    /// Original filename
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Image bytes
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte length
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no bytes were captured
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Outcome of a native conversion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    /// Status `0`
    Ok,
    /// Any nonzero status, kept verbatim
    Failed(i32),
}

impl ConversionStatus {
    /// Interpret a raw native status code
    #[inline]
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            ConversionStatus::Ok
        } else {
            ConversionStatus::Failed(code)
        }
    }

    /// Whether the call succeeded
    #[inline]
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, ConversionStatus::Ok)
    }

    /// Raw status code
    #[inline]
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            ConversionStatus::Ok => 0,
            ConversionStatus::Failed(code) => code,
        }
    }
}

/// Pipeline stage, used to report where a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Initialization,
    Staging,
    Invocation,
    Collection,
    Packaging,
    Delivery,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Initialization => "initialization",
            Stage::Staging => "staging",
            Stage::Invocation => "invocation",
            Stage::Collection => "collection",
            Stage::Packaging => "packaging",
            Stage::Delivery => "delivery",
        };
        f.write_str(name)
    }
}
