//! Extension manifest loading and validation.
//!
//! An Aseprite extension is described by a `package.json` document at the
//! extension root. This module parses that document into a typed
//! [`ExtensionManifest`] and rejects incomplete or malformed input early,
//! before any build or install step runs.
//!
//! # Validation Rules
//!
//! - `name` (the unique identifier) must be present, non-empty, and must not
//!   contain characters that are invalid in file names (`<>:"/\|?*`), since
//!   the identifier becomes the installed directory name.
//! - `version` must be present and non-empty.
//! - `displayName` falls back to the identifier when absent, so a validated
//!   manifest always carries a display name.
//! - The primary script is taken from the first `contributes.scripts` entry,
//!   defaulting to `extension.lua`.
//!
//! # Examples
//!
//! ```no_run
//! use aext_core::ExtensionManifest;
//! use camino::Utf8Path;
//!
//! let manifest = ExtensionManifest::load(Utf8Path::new("./my-extension"))?;
//! println!("{} v{}", manifest.name, manifest.version);
//! # Ok::<(), aext_core::ManifestError>(())
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::ManifestError;

/// File name of the extension manifest at the extension root.
pub const MANIFEST_FILE: &str = "package.json";

/// File name of the optional keyboard-shortcut companion file.
pub const KEYS_FILE: &str = "extension-keys.aseprite-keys";

/// Aseprite extension API version written into generated descriptors.
pub const API_VERSION: &str = "1.3";

/// Default primary script when `contributes.scripts` is absent.
const DEFAULT_MAIN_SCRIPT: &str = "extension.lua";

/// Characters that are invalid in an extension identifier.
///
/// The identifier doubles as the installed directory name, so it must be a
/// valid file name on every supported platform.
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// The parsed and validated extension manifest.
///
/// Produced by [`ExtensionManifest::load`], which reads `package.json` fresh
/// from disk. The value is immutable; a new build cycle loads a new value
/// rather than mutating a cached one, because disk state may have changed.
///
/// # Examples
///
/// ```no_run
/// use aext_core::ExtensionManifest;
/// use camino::Utf8Path;
///
/// let manifest = ExtensionManifest::load(Utf8Path::new("./my-extension"))?;
/// assert!(!manifest.name.is_empty());
/// assert_eq!(manifest.manifest_path().file_name(), Some("package.json"));
/// # Ok::<(), aext_core::ManifestError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionManifest {
    /// Unique extension identifier (the `name` field).
    pub name: String,

    /// Extension version string.
    pub version: String,

    /// Human-readable display name (`displayName`, falling back to `name`).
    pub display_name: String,

    /// Short description of the extension.
    pub description: String,

    /// Author name (from a string or `{name, url}` object).
    pub author: String,

    /// Author or project URL.
    pub website: String,

    /// License identifier.
    pub license: String,

    /// Extension categories (defaults to `["Scripts"]`).
    pub categories: Vec<String>,

    /// Contributed script entry points, relative to the extension root.
    ///
    /// The first entry is the primary script; defaults to `extension.lua`
    /// when the manifest contributes none.
    pub scripts: Vec<Utf8PathBuf>,

    /// Absolute path of the extension root this manifest was loaded from.
    pub root: Utf8PathBuf,
}

impl ExtensionManifest {
    /// Loads and validates the manifest at `root/package.json`.
    ///
    /// Reads the document fresh from disk on every call; nothing is cached
    /// across build cycles.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::RootNotFound`] if `root` is not a directory
    /// - [`ManifestError::Missing`] if no `package.json` exists at the root
    /// - [`ManifestError::Malformed`] if the document is not a JSON object
    /// - [`ManifestError::Incomplete`] if `name` or `version` is absent,
    ///   empty, or the identifier contains invalid file name characters
    pub fn load(root: &Utf8Path) -> Result<Self, ManifestError> {
        if !root.is_dir() {
            return Err(ManifestError::RootNotFound(root.to_owned()));
        }

        let root = root.canonicalize_utf8()?;
        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(ManifestError::Missing(manifest_path));
        }

        let content = std::fs::read_to_string(&manifest_path)?;
        let raw: RawManifest = serde_json::from_str(&content)
            .map_err(|e| ManifestError::malformed(manifest_path, e))?;

        Self::from_raw(raw, root)
    }

    /// Validates the raw document and resolves defaults.
    fn from_raw(raw: RawManifest, root: Utf8PathBuf) -> Result<Self, ManifestError> {
        let name = raw.name.unwrap_or_default().trim().to_owned();
        if name.is_empty() {
            return Err(ManifestError::incomplete("name", "must not be empty"));
        }
        if name.contains(INVALID_NAME_CHARS) {
            return Err(ManifestError::incomplete(
                "name",
                format!("contains invalid characters ({})", String::from_iter(INVALID_NAME_CHARS)),
            ));
        }

        let version = raw.version.unwrap_or_default().trim().to_owned();
        if version.is_empty() {
            return Err(ManifestError::incomplete("version", "must not be empty"));
        }

        let display_name = match raw.display_name.map(|s| s.trim().to_owned()) {
            Some(s) if !s.is_empty() => s,
            _ => name.clone(),
        };

        let (author, website) = match raw.author {
            Some(RawAuthor::Name(s)) => (s.trim().to_owned(), String::new()),
            Some(RawAuthor::Info { name, url }) => (name.trim().to_owned(), url.trim().to_owned()),
            Some(RawAuthor::Other(_)) | None => (String::new(), String::new()),
        };

        let mut scripts: Vec<Utf8PathBuf> = raw
            .contributes
            .scripts
            .iter()
            .filter_map(|s| {
                let trimmed = s.path.trim().trim_start_matches("./");
                (!trimmed.is_empty()).then(|| Utf8PathBuf::from(trimmed))
            })
            .collect();
        if scripts.is_empty() {
            scripts.push(Utf8PathBuf::from(DEFAULT_MAIN_SCRIPT));
        }

        let categories = if raw.categories.is_empty() {
            vec!["Scripts".to_owned()]
        } else {
            raw.categories
        };

        Ok(Self {
            name,
            version,
            display_name,
            description: raw.description.trim().to_owned(),
            author,
            website,
            license: raw.license.trim().to_owned(),
            categories,
            scripts,
            root,
        })
    }

    /// Returns the path of the manifest document.
    #[must_use]
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Returns the path of the primary contributed script.
    #[must_use]
    pub fn main_script_path(&self) -> Utf8PathBuf {
        self.root.join(self.main_script())
    }

    /// Returns the primary contributed script, relative to the root.
    #[must_use]
    pub fn main_script(&self) -> &Utf8Path {
        // from_raw guarantees at least one entry
        self.scripts.first().map_or(Utf8Path::new(DEFAULT_MAIN_SCRIPT), Utf8PathBuf::as_path)
    }

    /// Returns the path of the optional keys companion file.
    #[must_use]
    pub fn keys_path(&self) -> Utf8PathBuf {
        self.root.join(KEYS_FILE)
    }
}

/// Loosely-typed mirror of the on-disk document.
///
/// Required fields are `Option` so that absence surfaces as
/// [`ManifestError::Incomplete`] rather than a generic parse failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    description: String,
    author: Option<RawAuthor>,
    #[serde(default)]
    license: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    contributes: RawContributes,
}

/// The `author` field accepts either a bare string or a `{name, url}` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAuthor {
    Name(String),
    Info {
        #[serde(default)]
        name: String,
        #[serde(default)]
        url: String,
    },
    // Tolerate unexpected shapes the way the host application does
    Other(serde_json::Value),
}

#[derive(Debug, Default, Deserialize)]
struct RawContributes {
    #[serde(default)]
    scripts: Vec<RawScript>,
}

#[derive(Debug, Deserialize)]
struct RawScript {
    #[serde(default)]
    path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_extension(manifest_json: &str) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(dir.path().join(MANIFEST_FILE), manifest_json)
            .expect("Failed to write manifest");
        dir
    }

    fn load(dir: &TempDir) -> Result<ExtensionManifest, ManifestError> {
        let path = Utf8Path::from_path(dir.path()).expect("Invalid path");
        ExtensionManifest::load(path)
    }

    #[test]
    fn test_load_minimal_manifest() {
        let dir = write_extension(r#"{"name": "demo", "version": "1.0"}"#);
        let manifest = load(&dir).expect("manifest should validate");

        assert_eq!(manifest.name, "demo");
        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.display_name, "demo");
        assert_eq!(manifest.main_script(), Utf8Path::new("extension.lua"));
        assert_eq!(manifest.categories, vec!["Scripts"]);
    }

    #[test]
    fn test_load_full_manifest() {
        let dir = write_extension(
            r#"{
                "name": "pixel-tools",
                "displayName": "Pixel Tools",
                "version": "2.1.0",
                "description": "Handy pixel utilities",
                "author": {"name": "Jo", "url": "https://example.com"},
                "license": "MIT",
                "categories": ["Scripts", "Utilities"],
                "contributes": {"scripts": [{"path": "./scripts/main.lua"}]}
            }"#,
        );
        let manifest = load(&dir).expect("manifest should validate");

        assert_eq!(manifest.display_name, "Pixel Tools");
        assert_eq!(manifest.author, "Jo");
        assert_eq!(manifest.website, "https://example.com");
        assert_eq!(manifest.main_script(), Utf8Path::new("scripts/main.lua"));
        assert_eq!(manifest.categories.len(), 2);
    }

    #[test]
    fn test_author_as_string() {
        let dir = write_extension(r#"{"name": "x", "version": "1.0", "author": "Sam"}"#);
        let manifest = load(&dir).expect("manifest should validate");
        assert_eq!(manifest.author, "Sam");
        assert!(manifest.website.is_empty());
    }

    #[test]
    fn test_missing_identifier_is_incomplete() {
        let dir = write_extension(r#"{"version": "1.0", "name": ""}"#);
        match load(&dir) {
            Err(ManifestError::Incomplete { field, .. }) => assert_eq!(field, "name"),
            other => panic!("Expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_identifier_is_incomplete() {
        let dir = write_extension(r#"{"version": "1.0", "displayName": "Foo"}"#);
        match load(&dir) {
            Err(ManifestError::Incomplete { field, .. }) => assert_eq!(field, "name"),
            other => panic!("Expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_version_is_incomplete() {
        let dir = write_extension(r#"{"name": "demo"}"#);
        match load(&dir) {
            Err(ManifestError::Incomplete { field, .. }) => assert_eq!(field, "version"),
            other => panic!("Expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_identifier_characters() {
        let dir = write_extension(r#"{"name": "bad/name", "version": "1.0"}"#);
        match load(&dir) {
            Err(ManifestError::Incomplete { field, .. }) => assert_eq!(field, "name"),
            other => panic!("Expected Incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_manifest_file() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8Path::from_path(dir.path()).expect("Invalid path");
        match ExtensionManifest::load(path) {
            Err(ManifestError::Missing(p)) => {
                assert_eq!(p.file_name(), Some(MANIFEST_FILE));
            }
            other => panic!("Expected Missing, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_manifest() {
        let dir = write_extension("not json at all");
        match load(&dir) {
            Err(ManifestError::Malformed { .. }) => {}
            other => panic!("Expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_non_object_manifest_is_malformed() {
        let dir = write_extension(r#"["an", "array"]"#);
        match load(&dir) {
            Err(ManifestError::Malformed { .. }) => {}
            other => panic!("Expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_root_not_found() {
        let result = ExtensionManifest::load(Utf8Path::new("/nonexistent/extension"));
        match result {
            Err(ManifestError::RootNotFound(_)) => {}
            other => panic!("Expected RootNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_fresh_load_sees_disk_changes() {
        let dir = write_extension(r#"{"name": "demo", "version": "1.0"}"#);
        let first = load(&dir).expect("manifest should validate");
        assert_eq!(first.version, "1.0");

        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"name": "demo", "version": "2.0"}"#,
        )
        .expect("Failed to rewrite manifest");

        let second = load(&dir).expect("manifest should validate");
        assert_eq!(second.version, "2.0");
    }
}
