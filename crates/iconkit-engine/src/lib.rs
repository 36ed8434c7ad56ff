//! iconkit Engine - conversion engines for the iconkit pipeline
//!
//! [`ProcessEngine`] drives an external converter program that implements
//! the four native operations as subcommands:
//!
//! ```text
//! converter wasm_convert_to_ico  <input> <output>
//! converter wasm_convert_to_pngs <input>
//! converter wasm_convert_to_icns <input> <output>
//! converter wasm_convert_to_both <input> <prefix>
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use iconkit_core::EngineSession;
//! use iconkit_engine::ProcessEngine;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = EngineSession::new(ProcessEngine::new("icon-converter")?);
//! session.initialize().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod process;

pub use process::{ProcessEngine, SIGNAL_STATUS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
