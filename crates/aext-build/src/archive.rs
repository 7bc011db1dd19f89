//! Archive and expanded-tree assembly.
//!
//! This module turns a manifest plus a [`SourceFileSet`] into a
//! [`BuildArtifact`]: either a single `.aseprite-extension` zip container
//! or an expanded directory tree ready for direct installation.
//!
//! # Atomicity
//!
//! No half-written artifact is ever visible under its final name. Archives
//! are written to a dot-prefixed temporary sibling and renamed into place
//! on success; expanded trees are assembled in a staging directory and
//! renamed the same way. A stale artifact at the destination is therefore
//! overwritten atomically, which is the tool's stable policy when `--clean`
//! is not requested.

use std::fs::{self, File};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use tracing::{debug, info, warn};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use aext_core::{BuildConfig, ExtensionManifest};

use crate::collector::SourceFileSet;
use crate::descriptor::{INFO_DESCRIPTOR, INSTALL_DESCRIPTOR, InfoDescriptor, InstallDescriptor};
use crate::error::BuildError;

/// File extension of the distributable archive form.
pub const ARCHIVE_EXTENSION: &str = "aseprite-extension";

/// The form a build should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildMode {
    /// A single compressed `.aseprite-extension` container.
    Archive,
    /// An uncompressed directory tree plus generated descriptors,
    /// suitable for direct installation.
    Expanded,
}

/// Options controlling artifact naming and placement.
///
/// # Examples
///
/// ```
/// use aext_build::BuildOptions;
///
/// let options = BuildOptions::default();
/// assert!(options.output_name.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Base name override (default: the manifest identifier).
    pub output_name: Option<String>,

    /// Destination directory override (default: the extension root's
    /// parent directory).
    pub output_dir: Option<Utf8PathBuf>,

    /// Remove previously generated archives at the destination first.
    pub clean: bool,
}

impl From<&BuildConfig> for BuildOptions {
    fn from(config: &BuildConfig) -> Self {
        Self {
            output_name: config.output_name.clone(),
            output_dir: config.output_dir.clone(),
            clean: config.clean,
        }
    }
}

/// The result of a successful build.
///
/// Fully formed when returned; consumed by the installer and discarded
/// within the same cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildArtifact {
    /// A finished `.aseprite-extension` archive on disk.
    Archive {
        /// Extension identifier the archive was built for.
        identifier: String,
        /// Path of the archive file.
        path: Utf8PathBuf,
    },
    /// An expanded directory tree with generated descriptors.
    Expanded {
        /// Extension identifier the tree was built for.
        identifier: String,
        /// Path of the expanded directory.
        dir: Utf8PathBuf,
    },
}

impl BuildArtifact {
    /// Returns the extension identifier this artifact was built for.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Archive { identifier, .. } | Self::Expanded { identifier, .. } => identifier,
        }
    }

    /// Returns the on-disk location of the artifact.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Archive { path, .. } => path,
            Self::Expanded { dir, .. } => dir,
        }
    }
}

/// Builds an artifact from a validated manifest and a collected file set.
///
/// See [`BuildMode`] for the two output forms and the module docs for the
/// atomicity guarantees.
///
/// # Errors
///
/// Returns [`BuildError::Write`] when the destination is not writable,
/// [`BuildError::Read`] when a collected file disappears mid-build, and
/// [`BuildError::Zip`]/[`BuildError::Serialize`] for container or
/// descriptor failures. Partial output is removed before returning.
pub fn build(
    manifest: &ExtensionManifest,
    files: &SourceFileSet,
    mode: BuildMode,
    options: &BuildOptions,
) -> Result<BuildArtifact, BuildError> {
    let base_name = options
        .output_name
        .clone()
        .unwrap_or_else(|| manifest.name.clone());
    let output_dir = resolve_output_dir(manifest, options);

    fs::create_dir_all(&output_dir).map_err(|e| BuildError::write(&output_dir, e))?;

    if options.clean {
        clean_previous_builds(&output_dir);
    }

    match mode {
        BuildMode::Archive => build_archive(manifest, files, &base_name, &output_dir),
        BuildMode::Expanded => build_expanded(manifest, files, &base_name, &output_dir),
    }
}

/// Destination directory: override, else the extension root's parent.
fn resolve_output_dir(manifest: &ExtensionManifest, options: &BuildOptions) -> Utf8PathBuf {
    options.output_dir.clone().unwrap_or_else(|| {
        manifest
            .root
            .parent()
            .map_or_else(|| manifest.root.clone(), Utf8Path::to_owned)
    })
}

/// Removes previously generated archives from the destination.
///
/// Failures here are logged and ignored; a stale archive that cannot be
/// removed will simply be overwritten by the atomic rename later.
fn clean_previous_builds(output_dir: &Utf8Path) {
    let Ok(entries) = output_dir.read_dir_utf8() else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension() == Some(ARCHIVE_EXTENSION) {
            match fs::remove_file(path) {
                Ok(()) => info!(path = %path, "Removed previous build"),
                Err(error) => warn!(path = %path, %error, "Failed to remove previous build"),
            }
        }
    }
}

/// Writes the zip container to a temporary sibling and renames it into place.
fn build_archive(
    manifest: &ExtensionManifest,
    files: &SourceFileSet,
    base_name: &str,
    output_dir: &Utf8Path,
) -> Result<BuildArtifact, BuildError> {
    let final_path = output_dir.join(format!("{base_name}.{ARCHIVE_EXTENSION}"));
    let tmp_path = output_dir.join(format!(".{base_name}.{ARCHIVE_EXTENSION}.tmp"));

    let result = write_archive(files, &tmp_path);
    if let Err(error) = result {
        // Never leave a half-written container behind
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            debug!(path = %tmp_path, error = %cleanup, "Temporary archive cleanup failed");
        }
        return Err(error);
    }

    fs::rename(&tmp_path, &final_path).map_err(|e| BuildError::write(&final_path, e))?;

    info!(
        identifier = %manifest.name,
        path = %final_path,
        entries = files.len(),
        "Archive built"
    );

    Ok(BuildArtifact::Archive {
        identifier: manifest.name.clone(),
        path: final_path,
    })
}

/// Streams every collected file into a deflate-compressed zip.
fn write_archive(files: &SourceFileSet, tmp_path: &Utf8Path) -> Result<(), BuildError> {
    let file = File::create(tmp_path).map_err(|e| BuildError::write(tmp_path, e))?;
    let mut zip = ZipWriter::new(file);
    let zip_options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for relative in files.all_files() {
        let source = files.absolute(relative);
        let contents = fs::read(&source).map_err(|e| BuildError::read(&source, e))?;

        zip.start_file(relative.as_str(), zip_options)?;
        zip.write_all(&contents)
            .map_err(|e| BuildError::write(tmp_path, e))?;
        debug!(entry = %relative, "Added archive entry");
    }

    zip.finish()?;
    Ok(())
}

/// Assembles the expanded tree in a staging directory, then renames it.
fn build_expanded(
    manifest: &ExtensionManifest,
    files: &SourceFileSet,
    base_name: &str,
    output_dir: &Utf8Path,
) -> Result<BuildArtifact, BuildError> {
    let final_dir = output_dir.join(base_name);
    let staging_dir = output_dir.join(format!(".{base_name}.build"));

    if staging_dir.exists() {
        fs::remove_dir_all(&staging_dir).map_err(|e| BuildError::write(&staging_dir, e))?;
    }

    let result = populate_expanded(manifest, files, &staging_dir);
    if let Err(error) = result {
        if let Err(cleanup) = fs::remove_dir_all(&staging_dir) {
            debug!(path = %staging_dir, error = %cleanup, "Staging cleanup failed");
        }
        return Err(error);
    }

    // Replace any stale output under the final name
    if final_dir.exists() {
        fs::remove_dir_all(&final_dir).map_err(|e| BuildError::write(&final_dir, e))?;
    }
    fs::rename(&staging_dir, &final_dir).map_err(|e| BuildError::write(&final_dir, e))?;

    info!(
        identifier = %manifest.name,
        dir = %final_dir,
        entries = files.len(),
        "Expanded build assembled"
    );

    Ok(BuildArtifact::Expanded {
        identifier: manifest.name.clone(),
        dir: final_dir,
    })
}

/// Copies the file set and writes the two generated descriptors.
fn populate_expanded(
    manifest: &ExtensionManifest,
    files: &SourceFileSet,
    staging_dir: &Utf8Path,
) -> Result<(), BuildError> {
    fs::create_dir_all(staging_dir).map_err(|e| BuildError::write(staging_dir, e))?;

    for relative in files.all_files() {
        let source = files.absolute(relative);
        let target = staging_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::write(parent, e))?;
        }
        fs::copy(&source, &target).map_err(|e| BuildError::read(&source, e))?;
        debug!(entry = %relative, "Copied into expanded build");
    }

    let install_json = InstallDescriptor::new(manifest, files).to_json()?;
    let install_path = staging_dir.join(INSTALL_DESCRIPTOR);
    fs::write(&install_path, install_json).map_err(|e| BuildError::write(&install_path, e))?;

    let info_json = InfoDescriptor::new(files, Utc::now()).to_json()?;
    let info_path = staging_dir.join(INFO_DESCRIPTOR);
    fs::write(&info_path, info_json).map_err(|e| BuildError::write(&info_path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

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

    fn load(dir: &TempDir) -> (ExtensionManifest, SourceFileSet) {
        let path = Utf8Path::from_path(dir.path()).expect("Invalid path");
        let manifest = ExtensionManifest::load(path).expect("manifest should validate");
        let files = SourceFileSet::collect(&manifest).expect("collect should succeed");
        (manifest, files)
    }

    fn out_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8Path::from_path(dir.path())
            .expect("Invalid path")
            .to_owned();
        (dir, path)
    }

    #[test]
    fn test_archive_contains_exactly_collected_files() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let (manifest, files) = load(&ext);
        let (_out, out_path) = out_dir();
        let options = BuildOptions {
            output_dir: Some(out_path.clone()),
            ..BuildOptions::default()
        };

        let artifact =
            build(&manifest, &files, BuildMode::Archive, &options).expect("build should succeed");

        assert_eq!(artifact.path(), out_path.join("demo.aseprite-extension"));

        let file = std::fs::File::open(artifact.path()).expect("archive should open");
        let mut archive = ZipArchive::new(file).expect("archive should parse");
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| {
                archive
                    .by_index(i)
                    .expect("entry should exist")
                    .name()
                    .to_owned()
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["extension.lua", "package.json"]);
    }

    #[test]
    fn test_archive_round_trips_bytes() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- exact bytes\nprint('hi')\n"),
            ("scripts/util.lua", "return {}"),
        ]);
        let (manifest, files) = load(&ext);
        let (_out, out_path) = out_dir();
        let options = BuildOptions {
            output_dir: Some(out_path),
            ..BuildOptions::default()
        };

        let artifact =
            build(&manifest, &files, BuildMode::Archive, &options).expect("build should succeed");

        let file = std::fs::File::open(artifact.path()).expect("archive should open");
        let mut archive = ZipArchive::new(file).expect("archive should parse");

        for relative in files.all_files() {
            let mut entry = archive
                .by_name(relative.as_str())
                .expect("entry should exist at its source-relative path");
            let mut extracted = Vec::new();
            entry
                .read_to_end(&mut extracted)
                .expect("entry should read");
            let original =
                std::fs::read(files.absolute(relative)).expect("source should still exist");
            assert_eq!(extracted, original, "byte mismatch for {relative}");
        }
    }

    #[test]
    fn test_output_name_override() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let (manifest, files) = load(&ext);
        let (_out, out_path) = out_dir();
        let options = BuildOptions {
            output_name: Some("custom".to_owned()),
            output_dir: Some(out_path.clone()),
            clean: false,
        };

        let artifact =
            build(&manifest, &files, BuildMode::Archive, &options).expect("build should succeed");
        assert_eq!(artifact.path(), out_path.join("custom.aseprite-extension"));
    }

    #[test]
    fn test_clean_removes_previous_archives() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let (manifest, files) = load(&ext);
        let (_out, out_path) = out_dir();
        std::fs::write(out_path.join("stale.aseprite-extension"), "old")
            .expect("Failed to write stale archive");

        let options = BuildOptions {
            output_dir: Some(out_path.clone()),
            clean: true,
            ..BuildOptions::default()
        };
        build(&manifest, &files, BuildMode::Archive, &options).expect("build should succeed");

        assert!(!out_path.join("stale.aseprite-extension").exists());
        assert!(out_path.join("demo.aseprite-extension").exists());
    }

    #[test]
    fn test_stale_artifact_is_overwritten_without_clean() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let (manifest, files) = load(&ext);
        let (_out, out_path) = out_dir();
        std::fs::write(out_path.join("demo.aseprite-extension"), "stale, not a zip")
            .expect("Failed to write stale archive");

        let options = BuildOptions {
            output_dir: Some(out_path.clone()),
            ..BuildOptions::default()
        };
        let artifact =
            build(&manifest, &files, BuildMode::Archive, &options).expect("build should succeed");

        // Overwritten atomically; the stale content is gone
        let file = std::fs::File::open(artifact.path()).expect("archive should open");
        assert!(ZipArchive::new(file).is_ok());
    }

    #[test]
    fn test_no_tmp_file_left_on_failure() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let (manifest, files) = load(&ext);
        let (_out, out_path) = out_dir();

        // Delete a collected file after collection to force a read failure
        std::fs::remove_file(ext.path().join("extension.lua")).expect("Failed to delete script");

        let options = BuildOptions {
            output_dir: Some(out_path.clone()),
            ..BuildOptions::default()
        };
        let result = build(&manifest, &files, BuildMode::Archive, &options);
        assert!(matches!(result, Err(BuildError::Read { .. })));

        let leftovers: Vec<_> = std::fs::read_dir(&out_path)
            .expect("output dir should exist")
            .flatten()
            .collect();
        assert!(leftovers.is_empty(), "no partial output may remain");
    }

    #[test]
    fn test_expanded_build_writes_descriptors() {
        let ext = write_extension(&[
            (
                "package.json",
                r#"{"name": "demo", "displayName": "Demo", "version": "1.0"}"#,
            ),
            ("extension.lua", "-- main"),
            ("scripts/util.lua", "return {}"),
        ]);
        let (manifest, files) = load(&ext);
        let (_out, out_path) = out_dir();
        let options = BuildOptions {
            output_dir: Some(out_path.clone()),
            ..BuildOptions::default()
        };

        let artifact =
            build(&manifest, &files, BuildMode::Expanded, &options).expect("build should succeed");

        let dir = artifact.path();
        assert!(dir.join("extension.lua").is_file());
        assert!(dir.join("scripts/util.lua").is_file());
        assert!(dir.join("package.json").is_file());

        let install_json =
            std::fs::read_to_string(dir.join(INSTALL_DESCRIPTOR)).expect("descriptor should exist");
        assert!(install_json.contains("\"displayName\": \"Demo\""));

        let info_json =
            std::fs::read_to_string(dir.join(INFO_DESCRIPTOR)).expect("descriptor should exist");
        assert!(info_json.contains("\"installedFiles\""));
        assert!(info_json.contains("\"builtAt\""));
    }

    #[test]
    fn test_expanded_build_replaces_stale_tree() {
        let ext = write_extension(&[
            ("package.json", r#"{"name": "demo", "version": "1.0"}"#),
            ("extension.lua", "-- main"),
        ]);
        let (manifest, files) = load(&ext);
        let (_out, out_path) = out_dir();
        let stale = out_path.join("demo");
        std::fs::create_dir_all(&stale).expect("Failed to create stale dir");
        std::fs::write(stale.join("leftover.lua"), "-- old")
            .expect("Failed to write stale file");

        let options = BuildOptions {
            output_dir: Some(out_path),
            ..BuildOptions::default()
        };
        let artifact =
            build(&manifest, &files, BuildMode::Expanded, &options).expect("build should succeed");

        assert!(!artifact.path().join("leftover.lua").exists());
        assert!(artifact.path().join("extension.lua").is_file());
    }
}
