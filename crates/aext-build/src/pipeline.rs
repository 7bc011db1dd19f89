//! The validate → collect → build → install composition.
//!
//! Both entry points re-read everything from disk: the manifest is loaded
//! fresh, the file set is collected fresh, and the artifact is consumed by
//! the installer within the same cycle. [`pack`] drives the one-shot
//! `pack` command; [`rebuild_and_install`] is the unit of work the
//! live-reload engine runs on every settled burst of changes.
//!
//! Errors carry the failing stage so that every failure surfaces a stage
//! name and cause, never a bare I/O error.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use aext_core::{ExtensionManifest, ManifestError};

use crate::archive::{BuildArtifact, BuildMode, BuildOptions, build};
use crate::collector::SourceFileSet;
use crate::error::{BuildError, CollectError, InstallError};
use crate::install::{InstallReport, default_extensions_dir, install};

/// A pipeline failure, tagged with the stage that produced it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The manifest failed to validate.
    #[error("validation failed: {0}")]
    Manifest(#[from] ManifestError),

    /// Source file collection failed.
    #[error("collection failed: {0}")]
    Collect(#[from] CollectError),

    /// Artifact assembly failed.
    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    /// Installation failed.
    #[error("install failed: {0}")]
    Install(#[from] InstallError),
}

impl PipelineError {
    /// Returns the name of the failing stage.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Manifest(_) => "validate",
            Self::Collect(_) => "collect",
            Self::Build(_) => "build",
            Self::Install(_) => "install",
        }
    }
}

/// The result of a successful `pack` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOutcome {
    /// The manifest the archive was built from.
    pub manifest: ExtensionManifest,

    /// The finished archive artifact.
    pub artifact: BuildArtifact,

    /// The install report, when `--install` was requested.
    pub installed: Option<InstallReport>,
}

/// Packs the extension at `root` into a `.aseprite-extension` archive.
///
/// Runs validator → collector → archive builder, and optionally installs
/// the finished archive. Short-circuits on the first failing stage; no
/// write happens before validation passes.
///
/// # Arguments
///
/// * `root` - The extension root directory
/// * `options` - Artifact naming and placement
/// * `install_to` - `Some(dir)` to install the finished archive into
///   `dir` after building (the CLI resolves the platform default before
///   calling)
pub fn pack(
    root: &Utf8Path,
    options: &BuildOptions,
    install_to: Option<&Utf8Path>,
) -> Result<PackOutcome, PipelineError> {
    let manifest = ExtensionManifest::load(root)?;
    let files = SourceFileSet::collect(&manifest)?;

    debug!(
        identifier = %manifest.name,
        files = files.len(),
        "Packing extension"
    );

    let artifact = build(&manifest, &files, BuildMode::Archive, options)?;

    let installed = match install_to {
        Some(target) => Some(install(&artifact, target)?),
        None => None,
    };

    Ok(PackOutcome {
        manifest,
        artifact,
        installed,
    })
}

/// Rebuilds the extension in expanded form and installs it.
///
/// The expanded build is assembled in a process-scoped scratch directory,
/// handed to the installer, and discarded afterwards; nothing is written
/// next to the extension source. When `extensions_dir` is `None` the
/// platform default directory is resolved.
///
/// # Errors
///
/// The first failing stage is returned; the previous install survives any
/// failure (see the installer's staging contract).
pub fn rebuild_and_install(
    root: &Utf8Path,
    extensions_dir: Option<&Utf8Path>,
) -> Result<InstallReport, PipelineError> {
    let manifest = ExtensionManifest::load(root)?;
    let files = SourceFileSet::collect(&manifest)?;

    let target = match extensions_dir {
        Some(dir) => dir.to_owned(),
        None => default_extensions_dir().ok_or(InstallError::NoDefaultTarget)?,
    };

    let scratch = scratch_dir(&manifest.name);
    let options = BuildOptions {
        output_dir: Some(scratch.clone()),
        output_name: None,
        clean: false,
    };

    let artifact = build(&manifest, &files, BuildMode::Expanded, &options)?;
    let result = install(&artifact, &target);

    // The artifact is consumed within this cycle; drop the scratch tree
    if let Err(error) = std::fs::remove_dir_all(&scratch) {
        debug!(path = %scratch, %error, "Scratch cleanup failed");
    }

    let report = result?;
    info!(
        identifier = %report.identifier,
        target = %report.installed_to,
        "Rebuild installed"
    );
    Ok(report)
}

/// Per-process scratch directory for expanded rebuilds.
fn scratch_dir(identifier: &str) -> Utf8PathBuf {
    let base = Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("."));
    base.join(format!("aext-{}-{identifier}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_extension(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp directory");
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create parent dir");
            }
            std::fs::write(path, content).expect("Failed to write file");
        }
        dir
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(dir.path())
            .expect("Invalid path")
            .to_owned()
    }

    #[test]
    fn test_pack_produces_named_archive() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let out = TempDir::new().expect("Failed to create temp directory");
        let options = BuildOptions {
            output_dir: Some(utf8(&out)),
            ..BuildOptions::default()
        };

        let outcome = pack(&utf8(&ext), &options, None).expect("pack should succeed");

        assert_eq!(outcome.manifest.name, "demo");
        assert_eq!(
            outcome.artifact.path().file_name(),
            Some("demo.aseprite-extension")
        );
        assert!(outcome.installed.is_none());
    }

    #[test]
    fn test_pack_invalid_manifest_writes_nothing() {
        let ext = write_extension(&[
            ("package.json", r#"{"version": "1.0", "name": ""}"#),
            ("extension.lua", "-- main"),
        ]);
        let out = TempDir::new().expect("Failed to create temp directory");
        let options = BuildOptions {
            output_dir: Some(utf8(&out)),
            ..BuildOptions::default()
        };

        let result = pack(&utf8(&ext), &options, None);
        match result {
            Err(PipelineError::Manifest(ManifestError::Incomplete { field, .. })) => {
                assert_eq!(field, "name");
            }
            other => panic!("Expected Incomplete, got {other:?}"),
        }

        // No archive or install side effect occurred
        let leftovers: Vec<_> = std::fs::read_dir(out.path())
            .expect("output dir should exist")
            .flatten()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_pack_with_install() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let out = TempDir::new().expect("Failed to create temp directory");
        let target = TempDir::new().expect("Failed to create temp directory");
        let options = BuildOptions {
            output_dir: Some(utf8(&out)),
            ..BuildOptions::default()
        };

        let outcome =
            pack(&utf8(&ext), &options, Some(&utf8(&target))).expect("pack should succeed");

        let report = outcome.installed.expect("install report expected");
        assert!(report.installed_to.join("extension.lua").is_file());
    }

    #[test]
    fn test_pipeline_error_stage_names() {
        let err: PipelineError = CollectError::EmptyExtension(Utf8PathBuf::from("/e")).into();
        assert_eq!(err.stage(), "collect");

        let err: PipelineError = InstallError::NoDefaultTarget.into();
        assert_eq!(err.stage(), "install");
    }

    #[test]
    fn test_rebuild_and_install_round_trip() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let target = TempDir::new().expect("Failed to create temp directory");

        let report = rebuild_and_install(&utf8(&ext), Some(&utf8(&target)))
            .expect("rebuild should succeed");

        assert_eq!(report.identifier, "demo");
        assert!(report.installed_to.join("extension.lua").is_file());
        assert!(report.installed_to.join("extension.json").is_file());
        assert!(report.installed_to.join("__info.json").is_file());
    }
}
