//! Configuration structures for the extension toolkit.
//!
//! This module provides configuration types for all components of the tool:
//!
//! - [`BuildConfig`] - Archive builder settings (output name/dir, clean policy)
//! - [`InstallConfig`] - Installer settings (target extensions directory)
//! - [`WatchConfig`] - Live-reload settings (debounce window, recursion)
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] with the values the original
//! Aseprite workflow expects (1 second debounce, recursive watching).

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Configuration for the archive builder.
///
/// Controls where build output lands and whether stale output is removed
/// before a new build.
///
/// # Examples
///
/// ```
/// use aext_core::BuildConfig;
///
/// let config = BuildConfig::default();
/// assert!(config.output_dir.is_none());
/// assert!(!config.clean);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Destination directory for build output.
    ///
    /// `None` means the parent directory of the extension root.
    pub output_dir: Option<Utf8PathBuf>,

    /// Base name for the artifact (without the `.aseprite-extension` suffix).
    ///
    /// `None` means the manifest identifier.
    pub output_name: Option<String>,

    /// Whether to remove previously generated archives before building.
    pub clean: bool,
}

/// Configuration for the installer.
///
/// # Examples
///
/// ```
/// use aext_core::InstallConfig;
///
/// let config = InstallConfig::default();
/// assert!(config.extensions_dir.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Target Aseprite extensions directory.
    ///
    /// `None` means the platform default is resolved at install time.
    pub extensions_dir: Option<Utf8PathBuf>,
}

/// Configuration for the live-reload watcher.
///
/// Controls how file changes are detected and debounced. The debounce
/// window here is the engine-level quiet period: a rebuild fires only after
/// this many milliseconds elapse with no further qualifying events.
///
/// # Examples
///
/// ```
/// use aext_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 1000);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// Multiple file changes within this window collapse into a single
    /// rebuild; every further change resets the window.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            recursive: true,
        }
    }
}

/// Root configuration for the extension toolkit.
///
/// Combines all component configurations into a single structure that can be
/// constructed from CLI arguments or deserialized from a configuration file.
///
/// # Examples
///
/// ```
/// use aext_core::Config;
///
/// let config = Config::default();
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("debounce_ms"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Archive builder configuration.
    pub build: BuildConfig,

    /// Installer configuration.
    pub install: InstallConfig,

    /// Live-reload watcher configuration.
    pub watch: WatchConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_defaults() {
        let config = BuildConfig::default();
        assert!(config.output_dir.is_none());
        assert!(config.output_name.is_none());
        assert!(!config.clean);
    }

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.debounce_ms, 1000);
        assert!(config.recursive);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"build": {"clean": true}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.build.clean);
        // Other fields should have defaults
        assert_eq!(config.watch.debounce_ms, 1000);
        assert!(config.install.extensions_dir.is_none());
    }
}
