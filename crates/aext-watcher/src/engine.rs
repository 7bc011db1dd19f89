//! Live-reload engine with explicit debounce phases.
//!
//! The engine sits between the [`FileWatcher`](crate::FileWatcher) event
//! channel and the build pipeline. It implements the rebuild debounce:
//!
//! ```text
//!            event                    event (deadline resets)
//!  Watching ───────► Debouncing ◄──────────────┐
//!      ▲                 │  │───────────────────┘
//!      │                 │ deadline elapses
//!      │                 ▼
//!      │            Rebuilding
//!      │                 │
//!      └─────────────────┘  (queued events re-enter Debouncing)
//! ```
//!
//! Every event received while debouncing pushes the deadline back by the
//! full window, so a burst of saves produces exactly one rebuild once the
//! burst goes quiet. Events that arrive while a rebuild is in progress
//! queue in the channel; the engine drains them afterwards and schedules
//! one follow-up rebuild rather than one per event.
//!
//! Cancellation while debouncing discards the pending rebuild. A rebuild
//! already in progress always runs to completion, so the installed
//! extension is never left half-written.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use aext_build::{InstallReport, PipelineError};
use aext_core::{ExtensionManifest, WatchConfig};

use crate::error::WatchError;
use crate::events::FileEvent;
use crate::filter::SourceFileFilter;
use crate::watcher::FileWatcher;

/// The phase the live-reload engine is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    /// Idle, waiting for the first qualifying event.
    Watching,
    /// At least one event has arrived; the rebuild fires when the
    /// debounce window elapses without further events.
    Debouncing,
    /// A rebuild-and-install cycle is running.
    Rebuilding,
    /// The session has ended.
    Stopped,
}

/// Counters accumulated over a live-reload session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Qualifying file events received.
    pub events_seen: u64,
    /// Rebuild cycles that completed and installed successfully.
    pub rebuilds_completed: u64,
    /// Rebuild cycles that failed (the session continues after these).
    pub rebuilds_failed: u64,
}

impl SessionStats {
    /// Returns `true` if any rebuild cycle failed during the session.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.rebuilds_failed > 0
    }
}

/// A rebuild action triggered by the engine when the debounce settles.
///
/// The engine is generic over this trait so the debounce logic can be
/// tested with an in-memory rebuilder; [`ExtensionRebuilder`] is the
/// production implementation.
pub trait Rebuild {
    /// Runs one rebuild-and-install cycle.
    ///
    /// # Errors
    ///
    /// Returns the pipeline error of the first failing stage. Errors are
    /// reported and counted by the engine but do not end the session.
    fn rebuild(&mut self) -> Result<InstallReport, PipelineError>;
}

/// Production rebuilder: rebuilds the extension from source and installs
/// it into the extensions directory.
///
/// The manifest is re-read from disk on every cycle, so edits to
/// `package.json` itself (renamed scripts, new contributions) take effect
/// on the next rebuild.
#[derive(Debug, Clone)]
pub struct ExtensionRebuilder {
    root: Utf8PathBuf,
    extensions_dir: Option<Utf8PathBuf>,
}

impl ExtensionRebuilder {
    /// Creates a rebuilder for the extension at `root`.
    ///
    /// When `extensions_dir` is `None`, the platform default Aseprite
    /// extensions directory is resolved on each cycle.
    #[must_use]
    pub fn new(root: Utf8PathBuf, extensions_dir: Option<Utf8PathBuf>) -> Self {
        Self {
            root,
            extensions_dir,
        }
    }
}

impl Rebuild for ExtensionRebuilder {
    fn rebuild(&mut self) -> Result<InstallReport, PipelineError> {
        aext_build::rebuild_and_install(&self.root, self.extensions_dir.as_deref())
    }
}

/// The debounce-and-rebuild loop of a live-reload session.
///
/// Drive it with [`run`](Self::run), passing the receiver side of a
/// watcher event channel. The engine owns the rebuild policy; it does not
/// own the watcher, so the caller controls watcher lifetime and shutdown.
#[derive(Debug)]
pub struct LiveReloadEngine<R: Rebuild> {
    rebuilder: R,
    window: Duration,
    cancel: CancellationToken,
    phase: WatchPhase,
    stats: SessionStats,
}

impl<R: Rebuild> LiveReloadEngine<R> {
    /// Creates an engine with the given debounce window.
    #[must_use]
    pub fn new(rebuilder: R, window: Duration, cancel: CancellationToken) -> Self {
        Self {
            rebuilder,
            window,
            cancel,
            phase: WatchPhase::Watching,
            stats: SessionStats::default(),
        }
    }

    /// Returns the engine's current phase.
    #[must_use]
    pub fn phase(&self) -> WatchPhase {
        self.phase
    }

    /// Returns the counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Runs one rebuild cycle immediately, outside the debounce.
    ///
    /// Used for the initial deploy when a session starts. Failures are
    /// logged and counted but not returned; the session goes on watching.
    pub fn rebuild_now(&mut self) {
        self.phase = WatchPhase::Rebuilding;
        match self.rebuilder.rebuild() {
            Ok(report) => {
                self.stats.rebuilds_completed += 1;
                info!(
                    identifier = %report.identifier,
                    target = %report.installed_to,
                    replaced = report.replaced_previous,
                    "Extension installed"
                );
            }
            Err(err) => {
                self.stats.rebuilds_failed += 1;
                error!(stage = err.stage(), error = %err, "Rebuild failed");
            }
        }
        self.phase = WatchPhase::Watching;
    }

    /// Runs the debounce loop until cancellation or channel close.
    ///
    /// Returns the session counters. On cancellation a pending (not yet
    /// fired) rebuild is discarded; on channel close a pending rebuild is
    /// flushed first, so the last save before watcher shutdown still
    /// deploys.
    pub async fn run(&mut self, events: &mut mpsc::Receiver<FileEvent>) -> SessionStats {
        let cancel = self.cancel.clone();
        let mut deadline: Option<Instant> = None;

        loop {
            match deadline {
                None => {
                    self.phase = WatchPhase::Watching;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        received = events.recv() => match received {
                            Some(event) => {
                                self.note_event(&event);
                                deadline = Some(Instant::now() + self.window);
                            }
                            None => break,
                        },
                    }
                }
                Some(when) => {
                    self.phase = WatchPhase::Debouncing;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            info!("Cancelled while debouncing, pending rebuild discarded");
                            break;
                        }
                        received = events.recv() => match received {
                            Some(event) => {
                                self.note_event(&event);
                                deadline = Some(Instant::now() + self.window);
                            }
                            None => {
                                self.rebuild_now();
                                break;
                            }
                        },
                        () = tokio::time::sleep_until(when) => {
                            self.rebuild_now();
                            deadline = self.drain_queued(events);
                        }
                    }
                }
            }
        }

        self.phase = WatchPhase::Stopped;
        self.stats
    }

    fn note_event(&mut self, event: &FileEvent) {
        self.stats.events_seen += 1;
        info!(path = %event.path, "Change detected");
    }

    /// Drains events that queued while a rebuild was running.
    ///
    /// Any number of queued events schedules exactly one follow-up
    /// debounce window; returns the new deadline, or `None` when the
    /// queue was empty.
    fn drain_queued(&mut self, events: &mut mpsc::Receiver<FileEvent>) -> Option<Instant> {
        let mut queued = 0_u64;
        while let Ok(event) = events.try_recv() {
            self.note_event(&event);
            queued += 1;
        }
        if queued > 0 {
            info!(queued, "Changes arrived during rebuild, scheduling follow-up");
            Some(Instant::now() + self.window)
        } else {
            None
        }
    }
}

/// Runs a complete live-reload session for the extension at `root`.
///
/// Startup sequence:
///
/// 1. Validate the extension by loading its manifest. Validation failures
///    are fatal: a session over a broken extension would never produce a
///    useful install.
/// 2. Perform an initial rebuild-and-install so the extension is current
///    before the first edit. Failures here are logged, not fatal; the
///    session continues and the next successful rebuild catches up.
/// 3. Watch the extension root and debounce rebuilds until `cancel` fires
///    or the watcher stops.
///
/// # Errors
///
/// Returns [`WatchError::InvalidExtension`] when the manifest fails to
/// load, or a watcher error when the file watcher cannot be started or
/// shut down cleanly.
pub async fn run_session(
    root: &Utf8Path,
    config: &WatchConfig,
    extensions_dir: Option<&Utf8Path>,
    cancel: CancellationToken,
) -> Result<SessionStats, WatchError> {
    let manifest = ExtensionManifest::load(root)?;
    info!(
        identifier = %manifest.name,
        version = %manifest.version,
        root = %manifest.root,
        "Live-reload session starting"
    );

    let rebuilder = ExtensionRebuilder::new(manifest.root.clone(), extensions_dir.map(Utf8Path::to_owned));
    let mut engine = LiveReloadEngine::new(
        rebuilder,
        Duration::from_millis(config.debounce_ms),
        cancel,
    );

    // Initial deploy so the installed copy matches the sources from the
    // first moment of the session.
    engine.rebuild_now();

    let mut watcher = FileWatcher::new(
        &manifest.root,
        config.recursive,
        SourceFileFilter::new(manifest.root.clone()),
    )
    .await?;
    info!(
        path = %watcher.watch_path(),
        debounce_ms = config.debounce_ms,
        "Watching for changes"
    );

    let stats = engine.run(watcher.events()).await;

    if let Err(err) = watcher.shutdown().await {
        warn!(error = %err, "Watcher shutdown reported an error");
    }

    info!(
        events = stats.events_seen,
        rebuilds = stats.rebuilds_completed,
        failures = stats.rebuilds_failed,
        "Live-reload session ended"
    );
    Ok(stats)
}
