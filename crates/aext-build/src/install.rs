//! Crash-safe installation into the Aseprite extensions directory.
//!
//! Installation replaces `target_dir/<identifier>/` with the contents of a
//! [`BuildArtifact`] using a staging-and-swap scheme:
//!
//! 1. The new tree is fully assembled in a staging directory inside the
//!    target, so a failure while copying leaves the previous install
//!    untouched.
//! 2. The previous install is renamed aside, the staged tree is renamed
//!    into place, and only then is the old copy deleted. A failed swap
//!    rolls the previous install back.
//!
//! Replacing (rather than merging into) the install directory guarantees
//! that no files from a prior version with a different file set remain.

use std::fs::{self, File};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::archive::BuildArtifact;
use crate::error::InstallError;

/// Directory name Aseprite uses under its configuration directory.
const ASEPRITE_DIR: &str = "Aseprite";

/// Extensions subdirectory inside the Aseprite configuration directory.
const EXTENSIONS_DIR: &str = "extensions";

/// Probe file name used to verify the target is writable.
const WRITE_PROBE: &str = ".aext-write-probe";

/// The outcome of a successful installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Identifier of the installed extension.
    pub identifier: String,

    /// Directory the extension now lives in.
    pub installed_to: Utf8PathBuf,

    /// Whether a previous install was replaced.
    pub replaced_previous: bool,
}

/// Returns the platform default Aseprite extensions directory.
///
/// Follows Aseprite's own layout: the user configuration directory plus
/// `Aseprite/extensions` (`~/.config` on Linux, `~/Library/Application
/// Support` on macOS, `%APPDATA%` on Windows).
///
/// Returns `None` when the platform provides no configuration directory.
#[must_use]
pub fn default_extensions_dir() -> Option<Utf8PathBuf> {
    let config = dirs::config_dir()?;
    let path = Utf8PathBuf::from_path_buf(config).ok()?;
    Some(path.join(ASEPRITE_DIR).join(EXTENSIONS_DIR))
}

/// Installs a built artifact into `target_dir/<identifier>/`.
///
/// Any previously installed copy with the same identifier is fully
/// replaced. See the module docs for the crash-safety contract.
///
/// # Errors
///
/// - [`InstallError::TargetUnwritable`] if `target_dir` cannot be created
///   or written to
/// - [`InstallError::Stage`] if populating the staging tree fails (the
///   previous install is left byte-identical)
/// - [`InstallError::Swap`] if the final rename fails (the previous
///   install is rolled back)
pub fn install(artifact: &BuildArtifact, target_dir: &Utf8Path) -> Result<InstallReport, InstallError> {
    ensure_writable(target_dir)?;

    let identifier = artifact.identifier();
    let install_dir = target_dir.join(identifier);
    let staging_dir = target_dir.join(format!(".{identifier}.staging"));
    let previous_dir = target_dir.join(format!(".{identifier}.previous"));

    // Stale staging from an interrupted earlier attempt
    if staging_dir.exists() {
        fs::remove_dir_all(&staging_dir).map_err(|e| InstallError::stage(&staging_dir, e))?;
    }

    if let Err(error) = populate_staging(artifact, &staging_dir) {
        if let Err(cleanup) = fs::remove_dir_all(&staging_dir) {
            debug!(path = %staging_dir, error = %cleanup, "Staging cleanup failed");
        }
        return Err(error);
    }

    let replaced_previous = install_dir.exists();
    swap_into_place(&staging_dir, &install_dir, &previous_dir)?;

    info!(
        identifier,
        target = %install_dir,
        replaced = replaced_previous,
        "Extension installed"
    );

    Ok(InstallReport {
        identifier: identifier.to_owned(),
        installed_to: install_dir,
        replaced_previous,
    })
}

/// Creates the target directory if needed and probes write access.
fn ensure_writable(target_dir: &Utf8Path) -> Result<(), InstallError> {
    fs::create_dir_all(target_dir).map_err(|e| InstallError::target_unwritable(target_dir, e))?;

    let probe = target_dir.join(WRITE_PROBE);
    File::create(&probe).map_err(|e| InstallError::target_unwritable(target_dir, e))?;
    if let Err(error) = fs::remove_file(&probe) {
        debug!(path = %probe, %error, "Write probe cleanup failed");
    }
    Ok(())
}

/// Fills the staging directory from the artifact.
fn populate_staging(artifact: &BuildArtifact, staging_dir: &Utf8Path) -> Result<(), InstallError> {
    match artifact {
        BuildArtifact::Expanded { dir, .. } => copy_tree(dir, staging_dir),
        BuildArtifact::Archive { path, .. } => {
            fs::create_dir_all(staging_dir).map_err(|e| InstallError::stage(staging_dir, e))?;
            let file = File::open(path).map_err(|e| InstallError::stage(path, e))?;
            let mut archive = ZipArchive::new(file)?;
            archive.extract(staging_dir)?;
            Ok(())
        }
    }
}

/// Recursively copies `src` into `dst`, preserving structure.
fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> Result<(), InstallError> {
    fs::create_dir_all(dst).map_err(|e| InstallError::stage(dst, e))?;

    let entries = src.read_dir_utf8().map_err(|e| InstallError::stage(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| InstallError::stage(src, e))?;
        let source = entry.path();
        let target = dst.join(entry.file_name());

        let file_type = entry.file_type().map_err(|e| InstallError::stage(source, e))?;
        if file_type.is_dir() {
            copy_tree(source, &target)?;
        } else {
            fs::copy(source, &target).map_err(|e| InstallError::stage(source, e))?;
            debug!(path = %target, "Installed file");
        }
    }
    Ok(())
}

/// Swaps the staged tree into place, rolling back on failure.
fn swap_into_place(
    staging_dir: &Utf8Path,
    install_dir: &Utf8Path,
    previous_dir: &Utf8Path,
) -> Result<(), InstallError> {
    // Leftover from an interrupted swap; the current install is intact,
    // so the aside copy is expendable.
    if previous_dir.exists() {
        if let Err(error) = fs::remove_dir_all(previous_dir) {
            warn!(path = %previous_dir, %error, "Failed to remove stale previous install");
        }
    }

    let had_previous = install_dir.exists();
    if had_previous {
        fs::rename(install_dir, previous_dir).map_err(|e| InstallError::swap(install_dir, e))?;
    }

    if let Err(error) = fs::rename(staging_dir, install_dir) {
        // Roll the previous install back before reporting
        if had_previous {
            if let Err(rollback) = fs::rename(previous_dir, install_dir) {
                warn!(path = %install_dir, error = %rollback, "Rollback of previous install failed");
            }
        }
        return Err(InstallError::swap(install_dir, error));
    }

    if had_previous {
        if let Err(error) = fs::remove_dir_all(previous_dir) {
            warn!(path = %previous_dir, %error, "Failed to remove replaced install");
        }
    }

    Ok(())
}
