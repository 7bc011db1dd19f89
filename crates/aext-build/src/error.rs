//! Error types for the aext-build crate.
//!
//! This module provides the [`CollectError`], [`BuildError`], and
//! [`InstallError`] types covering the three stages of the build pipeline.

use camino::Utf8PathBuf;

/// Errors that can occur while collecting source files.
///
/// # Error Recovery Strategy
///
/// - **Walker errors** ([`CollectError::Walk`]): Fatal - propagate immediately
/// - **Empty extension** ([`CollectError::EmptyExtension`]): Fatal - nothing to package
/// - **Non-UTF-8 path** ([`CollectError::NonUtf8Path`]): Fatal - paths must be UTF-8
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Failed to walk the extension directory.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// No script files were found after filtering.
    #[error("no script files found under {0}")]
    EmptyExtension(Utf8PathBuf),

    /// A discovered path escapes the extension root.
    ///
    /// Collected paths must stay inside the root so that archive entries
    /// and installed copies cannot reference files outside the extension.
    #[error("path {path} resolves outside extension root {root}")]
    OutsideRoot {
        /// The offending path.
        path: Utf8PathBuf,
        /// The extension root.
        root: Utf8PathBuf,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl CollectError {
    /// Creates a new [`CollectError::OutsideRoot`] error.
    #[inline]
    pub fn outside_root(path: impl Into<Utf8PathBuf>, root: impl Into<Utf8PathBuf>) -> Self {
        Self::OutsideRoot {
            path: path.into(),
            root: root.into(),
        }
    }
}

/// Errors that can occur while assembling a build artifact.
///
/// Any partial output is cleaned up before these are returned; no
/// half-written artifact is ever left under its final name.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Failed to write to the destination.
    #[error("failed to write build output {path}: {source}")]
    Write {
        /// The path that could not be written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a source file slated for inclusion.
    #[error("failed to read source file {path}: {source}")]
    Read {
        /// The path of the file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to assemble the zip container.
    #[error("failed to assemble archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to serialize a generated descriptor.
    #[error("failed to serialize descriptor: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BuildError {
    /// Creates a new [`BuildError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`BuildError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

/// Errors that can occur while installing a built artifact.
///
/// The installer stages the new tree before touching the previous install,
/// so every variant here leaves the prior install intact.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The target directory cannot be created or written to.
    #[error("extensions directory is not writable: {path}: {source}")]
    TargetUnwritable {
        /// The target directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to populate the staging directory.
    #[error("failed to stage install at {path}: {source}")]
    Stage {
        /// The staging path that failed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to swap the staged tree into place.
    #[error("failed to swap installed extension at {path}: {source}")]
    Swap {
        /// The install path that failed to swap.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to extract an archive artifact during staging.
    #[error("failed to extract archive: {0}")]
    Extract(#[from] zip::result::ZipError),

    /// No target directory was supplied and no platform default exists.
    #[error("no extensions directory given and no platform default is known")]
    NoDefaultTarget,
}

impl InstallError {
    /// Creates a new [`InstallError::TargetUnwritable`] error.
    #[inline]
    pub fn target_unwritable(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::TargetUnwritable {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`InstallError::Stage`] error.
    #[inline]
    pub fn stage(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Stage {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`InstallError::Swap`] error.
    #[inline]
    pub fn swap(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Swap {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_empty_extension_display() {
        let err = CollectError::EmptyExtension(Utf8PathBuf::from("/ext"));
        assert!(err.to_string().contains("/ext"));
        assert!(err.to_string().contains("no script files"));
    }

    #[test]
    fn test_outside_root_display() {
        let err = CollectError::outside_root("/other/file.lua", "/ext");
        let msg = err.to_string();
        assert!(msg.contains("/other/file.lua"));
        assert!(msg.contains("/ext"));
    }

    #[test]
    fn test_build_write_display() {
        let err = BuildError::write(
            "/out/demo.aseprite-extension",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("demo.aseprite-extension"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_target_unwritable_display() {
        let err = InstallError::target_unwritable(
            "/opt/aseprite/extensions",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/opt/aseprite/extensions"));
    }

    #[test]
    fn test_no_default_target_display() {
        let err = InstallError::NoDefaultTarget;
        assert!(err.to_string().contains("no platform default"));
    }
}
