//! File watching and debounced live-reload for Aseprite extensions.
//!
//! This crate detects changes to extension source files via the `notify`
//! crate (coalesced through `notify-debouncer-mini`), bridges them into an
//! async tokio context, and drives a debounced rebuild-and-install loop so
//! the installed copy of an extension tracks its sources while it is being
//! developed.
//!
//! # Overview
//!
//! Two layers cooperate:
//!
//! - [`FileWatcher`] owns the blocking `notify` thread and streams
//!   filtered [`FileEvent`]s over an mpsc channel. Its 100ms window only
//!   collapses the raw event bursts a single save produces.
//! - [`LiveReloadEngine`] consumes that stream and applies the rebuild
//!   debounce (configurable, one second by default): every event pushes the
//!   deadline back, so a burst of saves ends in exactly one rebuild.
//!
//! [`run_session`] ties the two together with startup validation and an
//! initial deploy.
//!
//! # Crate Dependencies
//!
//! ```text
//! aext-cli ──► aext-watcher ──► aext-build ──► aext-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use aext_watcher::run_session;
//! use aext_core::WatchConfig;
//! use camino::Utf8Path;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aext_watcher::WatchError> {
//!     let cancel = CancellationToken::new();
//!
//!     // Cancel on Ctrl-C
//!     let handle = cancel.clone();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.cancel();
//!     });
//!
//!     let stats = run_session(
//!         Utf8Path::new("./my-extension"),
//!         &WatchConfig::default(),
//!         None, // platform default extensions directory
//!         cancel,
//!     )
//!     .await?;
//!
//!     println!("{} rebuilds over the session", stats.rebuilds_completed);
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

pub use engine::{
    run_session, ExtensionRebuilder, LiveReloadEngine, Rebuild, SessionStats, WatchPhase,
};
pub use error::WatchError;
pub use events::FileEvent;
pub use filter::{AcceptAllFilter, FileFilter, SourceFileFilter};
pub use watcher::FileWatcher;
