//! Source file discovery for extension packaging.
//!
//! This module provides [`SourceFileSet`], the ordered, partitioned set of
//! files that make up an extension. Discovery uses the `ignore` crate to
//! walk the extension root while skipping version-control directories,
//! build output, and previously generated archives.
//!
//! # Determinism
//!
//! Discovered paths are relative to the extension root and sorted
//! lexicographically, so repeated collection over unchanged disk state
//! yields an identical ordered list. This is what makes archives
//! reproducible across runs.
//!
//! # Examples
//!
//! ```ignore
//! use aext_build::SourceFileSet;
//!
//! let files = SourceFileSet::collect(&manifest)?;
//! for path in files.all_files() {
//!     println!("including {path}");
//! }
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;

use aext_core::{ExtensionManifest, KEYS_FILE, MANIFEST_FILE};

use crate::error::CollectError;

/// Directories that never contribute files to an extension.
///
/// Covers version-control metadata and common build output locations.
const SKIP_DIRECTORIES: &[&str] = &[".git", ".hg", ".svn", "dist", "build", "target"];

/// Script file extension packaged into extensions.
const SCRIPT_EXTENSION: &str = "lua";

/// The ordered set of source files discovered under an extension root.
///
/// Files are partitioned into the manifest, the primary script, and
/// auxiliary scripts; the optional keys companion file is carried
/// separately. All paths are relative to the root, unique, and resolve
/// inside the root.
///
/// A `SourceFileSet` is built fresh for every build cycle and never cached,
/// because disk state may change between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileSet {
    /// The extension root the paths are relative to.
    root: Utf8PathBuf,

    /// Relative path of the manifest document (always `package.json`).
    manifest: Utf8PathBuf,

    /// Relative path of the primary contributed script.
    primary: Utf8PathBuf,

    /// Relative paths of all other scripts, lexicographically sorted.
    auxiliary: Vec<Utf8PathBuf>,

    /// Relative path of the keys companion file, when present on disk.
    keys: Option<Utf8PathBuf>,
}

impl SourceFileSet {
    /// Discovers the source files for the given validated manifest.
    ///
    /// Walks the manifest's root directory for `.lua` scripts, applying the
    /// fixed exclusion policy, and partitions the result around the
    /// manifest's declared primary script. If the declared primary is not
    /// on disk, the lexicographically first script takes its place.
    ///
    /// # Errors
    ///
    /// - [`CollectError::EmptyExtension`] if zero scripts survive filtering
    /// - [`CollectError::Walk`] if directory traversal fails
    /// - [`CollectError::NonUtf8Path`] for non-UTF-8 file names
    pub fn collect(manifest: &ExtensionManifest) -> Result<Self, CollectError> {
        let root = &manifest.root;
        let mut scripts = collect_scripts(root)?;

        if scripts.is_empty() {
            return Err(CollectError::EmptyExtension(root.clone()));
        }
        scripts.sort();
        scripts.dedup();

        // Prefer the declared entry point; fall back to the first script
        // when the manifest points at a file that does not exist yet.
        let declared = manifest.main_script();
        let primary_index = scripts.iter().position(|p| p == declared).unwrap_or(0);
        let primary = scripts.remove(primary_index);

        let keys = root.join(KEYS_FILE).is_file().then(|| Utf8PathBuf::from(KEYS_FILE));

        Ok(Self {
            root: root.clone(),
            manifest: Utf8PathBuf::from(MANIFEST_FILE),
            primary,
            auxiliary: scripts,
            keys,
        })
    }

    /// Returns the extension root the file set was collected from.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the relative path of the manifest document.
    #[inline]
    #[must_use]
    pub fn manifest_file(&self) -> &Utf8Path {
        &self.manifest
    }

    /// Returns the relative path of the primary script.
    #[inline]
    #[must_use]
    pub fn primary(&self) -> &Utf8Path {
        &self.primary
    }

    /// Returns the relative paths of the auxiliary scripts, sorted.
    #[inline]
    #[must_use]
    pub fn auxiliary(&self) -> &[Utf8PathBuf] {
        &self.auxiliary
    }

    /// Returns the relative path of the keys companion file, if present.
    #[inline]
    #[must_use]
    pub fn keys_file(&self) -> Option<&Utf8Path> {
        self.keys.as_deref()
    }

    /// Returns all script paths (primary first, then auxiliary).
    pub fn scripts(&self) -> impl Iterator<Item = &Utf8Path> {
        std::iter::once(self.primary.as_path()).chain(self.auxiliary.iter().map(Utf8PathBuf::as_path))
    }

    /// Returns every file in the set in deterministic lexicographic order.
    ///
    /// The list covers the manifest, all scripts, and the keys file when
    /// present. Archive entries are written in exactly this order.
    #[must_use]
    pub fn all_files(&self) -> Vec<&Utf8Path> {
        let mut files: Vec<&Utf8Path> = Vec::with_capacity(self.auxiliary.len() + 3);
        files.push(self.manifest.as_path());
        files.push(self.primary.as_path());
        files.extend(self.auxiliary.iter().map(Utf8PathBuf::as_path));
        if let Some(keys) = &self.keys {
            files.push(keys.as_path());
        }
        files.sort_unstable();
        files
    }

    /// Returns the number of files in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        // manifest + primary + auxiliary + optional keys
        2 + self.auxiliary.len() + usize::from(self.keys.is_some())
    }

    /// Returns `false`; a collected set always contains the manifest and
    /// at least one script.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Resolves a relative entry against the extension root.
    #[must_use]
    pub fn absolute(&self, relative: &Utf8Path) -> Utf8PathBuf {
        self.root.join(relative)
    }
}

/// Walks the root and returns root-relative paths of all script files.
fn collect_scripts(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, CollectError> {
    let mut scripts = Vec::new();

    let walker = WalkBuilder::new(root)
        // Do not let a stray .gitignore hide scripts from the package
        .standard_filters(false)
        .hidden(true)
        .follow_links(false)
        .threads(1)
        .require_git(false)
        .build();

    for result in walker {
        let entry = result?;

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let utf8_path =
            Utf8Path::from_path(path).ok_or_else(|| CollectError::NonUtf8Path(path.to_owned()))?;

        // Walk entries always live under the walk root; strip_prefix
        // failing would mean the entry escaped it.
        let relative = utf8_path
            .strip_prefix(root)
            .map_err(|_| CollectError::outside_root(utf8_path, root))?;

        // The exclusion policy applies below the root only; ancestor
        // directory names (an extension living under some `build/`) must
        // not hide its scripts.
        if !is_script_file(relative) || should_skip_path(relative) {
            continue;
        }

        scripts.push(relative.to_owned());
    }

    Ok(scripts)
}

/// Checks if a path is a packageable script based on extension.
fn is_script_file(path: &Utf8Path) -> bool {
    path.extension() == Some(SCRIPT_EXTENSION)
}

/// Checks if a root-relative path should be skipped based on directory name.
fn should_skip_path(path: &Utf8Path) -> bool {
    path.components()
        .any(|component| SKIP_DIRECTORIES.contains(&component.as_str()))
}
