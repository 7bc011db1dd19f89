//! File filtering for watch events.
//!
//! Filtering happens at the source - in the blocking watcher thread -
//! before events reach the channel, so changes that can never affect a
//! build (editor swap files, generated archives) cost nothing downstream.
//!
//! # Examples
//!
//! ```
//! use aext_watcher::{FileFilter, SourceFileFilter};
//! use camino::Utf8Path;
//!
//! let filter = SourceFileFilter::new("/work/my-ext");
//!
//! // Script and manifest changes trigger rebuilds
//! assert!(filter.should_process(Utf8Path::new("/work/my-ext/extension.lua")));
//! assert!(filter.should_process(Utf8Path::new("/work/my-ext/package.json")));
//!
//! // Generated archives never do
//! assert!(!filter.should_process(Utf8Path::new("/work/my-ext/demo.aseprite-extension")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};

use aext_core::{KEYS_FILE, MANIFEST_FILE};

/// A filter for determining which file events to process.
///
/// Implementations are called for each file event detected by the watcher;
/// events that return `false` from [`should_process`] are discarded before
/// being sent to the event channel.
///
/// Filters must be [`Send`] and [`Sync`] because they run on the blocking
/// watcher thread, and `'static` to be moved into the spawned task.
///
/// [`should_process`]: FileFilter::should_process
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if a change to the file at `path` should be
    /// forwarded to the event channel.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
///
/// Useful in tests and when the caller wants raw, unfiltered events.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// The filter used by live-reload sessions.
///
/// A change qualifies for a rebuild when it touches:
///
/// - any `.lua` script,
/// - the manifest (`package.json`), or
/// - the keys companion file (`extension-keys.aseprite-keys`).
///
/// Everything else is discarded, in particular generated
/// `.aseprite-extension` archives (which would otherwise let a build
/// output trigger the next build) and files inside version-control or
/// build-output directories.
///
/// The exclusion list is matched against the path relative to the watched
/// root, so an extension that itself lives under a directory named
/// `build` or `dist` still gets its events through.
#[derive(Debug, Clone)]
pub struct SourceFileFilter {
    root: Utf8PathBuf,
}

/// Directory components under the root whose contents never qualify.
const SKIP_COMPONENTS: &[&str] = &[".git", ".hg", ".svn", "dist", "build", "target"];

impl SourceFileFilter {
    /// Creates a filter for events under the watched extension root.
    ///
    /// `root` should be the same (canonicalized) path handed to the
    /// watcher, so that event paths strip cleanly against it.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileFilter for SourceFileFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        // Only components below the root count against the exclusion
        // list; a path outside the root is matched as-is.
        let below = path.strip_prefix(&self.root).unwrap_or(path);

        if below
            .components()
            .any(|c| SKIP_COMPONENTS.contains(&c.as_str()))
        {
            return false;
        }

        if below.extension() == Some("lua") {
            return true;
        }

        matches!(below.file_name(), Some(name) if name == MANIFEST_FILE || name == KEYS_FILE)
    }
}
