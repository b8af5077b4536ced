//! ODIN Common Library
//!
//! Shared utilities for the ODIN mobility workspace members.
//!
//! # Overview
//!
//! - **Error Handling**: [`OdinError`] and the crate [`Result`] alias
//! - **Checksums**: MD5 digests for content-derived identities and SHA-256
//!   fingerprints for source file provenance
//! - **Logging**: centralised `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use odin_common::checksum::{fingerprint_file, md5_hex};
//!
//! fn fingerprint() -> odin_common::Result<()> {
//!     let fingerprint = fingerprint_file("data/observations.csv")?;
//!     tracing::info!(sha256 = %fingerprint.sha256, "Source fingerprint");
//!     assert_eq!(md5_hex(b"hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{OdinError, Result};
