//! Error types for the aext-core crate.
//!
//! This module provides the [`ManifestError`] type for failures that occur
//! while loading and validating an extension manifest.

use camino::Utf8PathBuf;

/// Errors that can occur while loading and validating a `package.json`.
///
/// Validation is a pure read-and-parse step: every variant is reported to
/// the caller before any build or install side effect takes place.
///
/// # Error Recovery Strategy
///
/// - **Root not found** ([`ManifestError::RootNotFound`]): Fatal - the extension directory must exist
/// - **Missing manifest** ([`ManifestError::Missing`]): Fatal - nothing to build
/// - **Malformed manifest** ([`ManifestError::Malformed`]): Fatal - fix the JSON and retry
/// - **Incomplete manifest** ([`ManifestError::Incomplete`]): Fatal - required field absent or empty
/// - **I/O errors** ([`ManifestError::Io`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use aext_core::ManifestError;
/// use camino::Utf8PathBuf;
///
/// let error = ManifestError::Missing(Utf8PathBuf::from("/ext/package.json"));
/// assert!(error.to_string().contains("package.json"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The extension root directory does not exist or is not a directory.
    #[error("extension path is not a directory: {0}")]
    RootNotFound(Utf8PathBuf),

    /// No manifest document exists at the extension root.
    #[error("manifest not found at {0}")]
    Missing(Utf8PathBuf),

    /// The manifest could not be parsed as a JSON object.
    #[error("failed to parse manifest {path}: {source}")]
    Malformed {
        /// The path of the manifest that failed to parse.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A required manifest field is absent, empty, or invalid.
    #[error("incomplete manifest: field '{field}' {reason}")]
    Incomplete {
        /// The name of the offending field.
        field: &'static str,
        /// Explanation of what is wrong with the field.
        reason: String,
    },

    /// An I/O error occurred while reading the manifest.
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}

impl ManifestError {
    /// Creates a new [`ManifestError::Malformed`] error.
    #[inline]
    pub fn malformed(path: impl Into<Utf8PathBuf>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ManifestError::Incomplete`] error.
    #[inline]
    pub fn incomplete(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Incomplete {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::RootNotFound(path) | Self::Missing(path) => Some(path),
            Self::Malformed { path, .. } => Some(path),
            Self::Incomplete { .. } | Self::Io(_) => None,
        }
    }
}
