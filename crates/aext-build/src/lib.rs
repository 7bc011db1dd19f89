//! Extension build pipeline for the Aseprite extension toolkit.
//!
//! This crate turns a validated extension source tree into an installable
//! form. It provides:
//!
//! - [`SourceFileSet`] - deterministic discovery of the files to package
//! - [`build`] - archive (`.aseprite-extension` zip) and expanded builds
//! - [`install`] - crash-safe staging-and-swap installation
//! - [`pipeline`] - the validate → collect → build → install composition
//!   used by both the `pack` command and the live-reload engine
//!
//! # Data Flow
//!
//! ```text
//! ExtensionManifest ─┐
//!                    ├─► build() ─► BuildArtifact ─► install()
//! SourceFileSet ─────┘
//! ```
//!
//! Artifacts are fully formed or not produced at all: archives are written
//! under a temporary name and renamed into place, and installation stages
//! the new tree next to the previous install before swapping, so a failure
//! at any point leaves the prior state intact.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod archive;
pub mod collector;
pub mod descriptor;
pub mod error;
pub mod install;
pub mod pipeline;

// Re-export error types
pub use error::{BuildError, CollectError, InstallError};

// Re-export collector types
pub use collector::SourceFileSet;

// Re-export builder types
pub use archive::{ARCHIVE_EXTENSION, BuildArtifact, BuildMode, BuildOptions, build};

// Re-export descriptor types
pub use descriptor::{INFO_DESCRIPTOR, INSTALL_DESCRIPTOR, InfoDescriptor, InstallDescriptor};

// Re-export installer types
pub use install::{InstallReport, default_extensions_dir, install};

// Re-export pipeline types
pub use pipeline::{PackOutcome, PipelineError, pack, rebuild_and_install};
