//! Event types for file change notifications.
//!
//! A [`FileEvent`] represents a single file that changed under the watched
//! extension root, as delivered by the notify layer after raw-event
//! coalescing. The engine-level debounce in [`crate::engine`] decides when
//! a burst of these events has settled into a rebuild.

use camino::Utf8PathBuf;
use std::time::Instant;

/// A file change event with a UTF-8 path guarantee.
///
/// The event does not distinguish create, modify, delete, or rename - the
/// debounce contract treats every qualifying change identically, so the
/// distinction is intentionally dropped at the notify layer.
///
/// # Examples
///
/// ```
/// use aext_watcher::FileEvent;
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(Utf8PathBuf::from("scripts/grid.lua"));
/// assert_eq!(event.file_name(), Some("grid.lua"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Absolute path of the file that changed.
    pub path: Utf8PathBuf,

    /// Monotonic timestamp of when the event was received.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates a new file event for the given path, timestamped now.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            timestamp: Instant::now(),
        }
    }

    /// Creates a new file event with a specific timestamp.
    ///
    /// Useful for testing or when reconstructing events.
    #[inline]
    #[must_use]
    pub const fn with_timestamp(path: Utf8PathBuf, timestamp: Instant) -> Self {
        Self { path, timestamp }
    }

    /// Returns the file extension, if any.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}
