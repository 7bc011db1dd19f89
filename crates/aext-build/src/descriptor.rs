//! Generated descriptor documents for expanded builds.
//!
//! An expanded (directly installable) build carries two generated JSON
//! documents next to the extension's own files:
//!
//! - `extension.json` - the installation descriptor the host application
//!   reads; mirrors the manifest's identity fields
//! - `__info.json` - the info descriptor recording what was installed and
//!   the build's provenance (source path and timestamp)
//!
//! The field names of both documents are a compatibility contract with
//! Aseprite and must not change.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use aext_core::{API_VERSION, ExtensionManifest, MANIFEST_FILE};

use crate::collector::SourceFileSet;

/// File name of the installation descriptor.
pub const INSTALL_DESCRIPTOR: &str = "extension.json";

/// File name of the info descriptor.
pub const INFO_DESCRIPTOR: &str = "__info.json";

/// The installation descriptor (`extension.json`) read by the host.
///
/// Mirrors the manifest's identifier, version, and display name plus the
/// descriptive fields, and points at the primary script via `main`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallDescriptor {
    /// Extension identifier.
    pub name: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Extension version.
    pub version: String,
    /// Short description.
    pub description: String,
    /// Author name.
    pub author: String,
    /// Author or project URL.
    pub website: String,
    /// Source URL (mirrors the website field).
    pub source: String,
    /// License identifier.
    pub license: String,
    /// Extension categories.
    pub categories: Vec<String>,
    /// Aseprite extension API version.
    pub api_version: String,
    /// Relative path of the primary script, `./`-prefixed.
    pub main: String,
}

impl InstallDescriptor {
    /// Builds the descriptor from a validated manifest and its collected
    /// file set.
    ///
    /// `main` is taken from the file set's resolved primary rather than
    /// the manifest's declared entry point, so both generated descriptors
    /// always agree on a script that actually exists on disk.
    #[must_use]
    pub fn new(manifest: &ExtensionManifest, files: &SourceFileSet) -> Self {
        Self {
            name: manifest.name.clone(),
            display_name: manifest.display_name.clone(),
            version: manifest.version.clone(),
            description: manifest.description.clone(),
            author: manifest.author.clone(),
            website: manifest.website.clone(),
            source: manifest.website.clone(),
            license: manifest.license.clone(),
            categories: manifest.categories.clone(),
            api_version: API_VERSION.to_owned(),
            main: format!("./{}", files.primary()),
        }
    }

    /// Serializes the descriptor as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// The info descriptor (`__info.json`) recording install contents and
/// build provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDescriptor {
    /// Every file the installed copy contains, relative to its root.
    pub installed_files: Vec<String>,
    /// Absolute path of the extension source the build came from.
    pub source: String,
    /// Build timestamp, RFC 3339.
    pub built_at: String,
}

impl InfoDescriptor {
    /// Builds the descriptor for the given file set at the given instant.
    #[must_use]
    pub fn new(files: &SourceFileSet, built_at: DateTime<Utc>) -> Self {
        // Scripts first, then the generated descriptor and the manifest,
        // then the keys file - the order the host application expects.
        let mut installed_files: Vec<String> =
            files.scripts().map(|p| p.as_str().to_owned()).collect();
        installed_files.push(INSTALL_DESCRIPTOR.to_owned());
        installed_files.push(MANIFEST_FILE.to_owned());
        if let Some(keys) = files.keys_file() {
            installed_files.push(keys.as_str().to_owned());
        }

        Self {
            installed_files,
            source: files.root().as_str().to_owned(),
            built_at: built_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Serializes the descriptor as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
