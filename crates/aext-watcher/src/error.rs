//! Error types for the aext-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while setting up or running a live-reload session.

use camino::Utf8PathBuf;

use aext_core::ManifestError;

/// Errors that can occur during a live-reload session.
///
/// # Error Recovery Strategy
///
/// - **Invalid extension** ([`WatchError::InvalidExtension`]): Fatal at
///   startup - the session never begins watching a broken tree. Rebuild
///   failures *after* startup are not errors of this type; they are logged
///   at the rebuild boundary and the session continues.
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - propagate immediately
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - path must exist
/// - **Channel closed** ([`WatchError::ChannelClosed`]): Fatal - communication broken
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The extension failed startup validation.
    ///
    /// Reported before any watching begins; the session fails fast rather
    /// than observing a tree that can never build.
    #[error("invalid extension: {0}")]
    InvalidExtension(#[from] ManifestError),

    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watched path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The event channel was closed unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    ///
    /// Non-UTF-8 paths in file events are logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if this error is fatal (the session should end).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_invalid_extension_is_fatal() {
        let err = WatchError::InvalidExtension(ManifestError::incomplete(
            "name",
            "must not be empty",
        ));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("invalid extension"));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_path_not_found_display() {
        let err = WatchError::path_not_found("src/missing");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "path does not exist: src/missing");
    }

    #[test]
    fn test_non_utf8_is_recoverable() {
        let err = WatchError::NonUtf8Path(std::path::PathBuf::from("x"));
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_channel_closed_display() {
        let err = WatchError::ChannelClosed;
        assert!(err.to_string().contains("channel closed"));
    }

    #[test]
    fn test_io_is_fatal() {
        let err = WatchError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(err.is_fatal());
    }
}
