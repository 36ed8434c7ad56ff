//! iconkit Artifact System
//!
//! Named output payloads and their packaging.
//!
//! # Core Concepts
//!
//! - [`OutputArtifact`]: a logical file name paired with bytes and a digest
//! - [`ArtifactSet`]: ordered artifacts with unique names
//! - [`ContentHash`]: 32-byte Blake3 digest
//! - [`ArchiveBundle`]: an artifact set on its way to one archive blob
//! - [`ArchiveEncoder`]: the archive capability, with [`ZipEncoder`] as the
//!   standard implementation
//!
//! # Example
//!
//! ```rust
//! use iconkit_artifact::{ArchiveBundle, ArtifactSet, OutputArtifact, ZipEncoder};
//!
//! let mut set = ArtifactSet::new();
//! set.push(OutputArtifact::new("16.png", vec![0x89, b'P', b'N', b'G'])?)?;
//! set.push(OutputArtifact::new("32.png", vec![0x89, b'P', b'N', b'G'])?)?;
//!
//! let zip = ArchiveBundle::new(set)?.encode(&ZipEncoder::default())?;
//! assert_eq!(&zip[..2], b"PK");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod archive;
mod artifact;
mod hash;

pub use archive::{ArchiveBundle, ArchiveEncoder, ArchiveError, Compression, ZipEncoder};
pub use artifact::{ArtifactError, ArtifactSet, OutputArtifact};
pub use hash::{ContentHash, HashError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
