//! Core types, errors, and configuration for the Aseprite extension toolkit.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`ExtensionManifest`] - the parsed and validated `package.json` document
//! - [`ManifestError`] - validation failures surfaced before any write occurs
//! - Configuration structures ([`Config`], [`BuildConfig`], [`WatchConfig`])
//! - Well-known file name constants ([`MANIFEST_FILE`], [`KEYS_FILE`])

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod manifest;

// Re-export configuration types
pub use config::{BuildConfig, Config, InstallConfig, WatchConfig};

// Re-export error types
pub use error::ManifestError;

// Re-export manifest types
pub use manifest::{API_VERSION, ExtensionManifest, KEYS_FILE, MANIFEST_FILE};
