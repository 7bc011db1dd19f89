//! File watcher with async event streaming.
//!
//! This module provides the [`FileWatcher`] type that bridges the synchronous
//! `notify` file watching crate to the async tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Debouncer      │ -> │ Callback   │  │
//! │  │ (notify)         │    │ (100ms window) │    │ (filtering)│  │
//! │  └──────────────────┘    └────────────────┘    └─────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                                        │
//!                                          blocking_send │
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ FileWatcher      │    │ mpsc::Receiver │ -> live-reload loop │
//! │  │ (shutdown ctrl)  │    │ (events)       │                     │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The 100ms window here only coalesces the raw bursts that editors and
//! operating systems produce for a single save. The rebuild debounce -
//! the user-visible, configurable one - is applied downstream by the
//! live-reload engine.
//!
//! # Usage
//!
//! ```no_run
//! use aext_watcher::{FileWatcher, SourceFileFilter};
//! use camino::Utf8Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let path = Utf8Path::new("/path/to/extension");
//!     let filter = SourceFileFilter::new(path);
//!
//!     let mut watcher = FileWatcher::new(path, true, filter).await?;
//!
//!     // Receive events in an async context
//!     while let Some(event) = watcher.recv().await {
//!         println!("File changed: {}", event.path);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::WatchError;
use crate::events::FileEvent;
use crate::filter::FileFilter;

/// Default channel capacity for file events.
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Coalescing window for raw filesystem notifications.
///
/// A single editor save can emit several create/modify/rename events;
/// this window collapses them into one. It is intentionally much shorter
/// than the rebuild debounce applied by the engine.
const RAW_COALESCE_MS: u64 = 100;

/// A file watcher that streams events to an async context.
///
/// `FileWatcher` manages a background thread that runs the `notify` file
/// watcher with raw-event coalescing. File change events are filtered and
/// sent through a tokio mpsc channel for consumption in async code.
///
/// # Lifecycle
///
/// 1. **Creation**: `FileWatcher::new()` validates the path, creates channels,
///    and spawns a blocking task with the notify watcher.
///
/// 2. **Event Reception**: Use `recv()` or `try_recv()` to receive events.
///    Events are already filtered according to the provided filter.
///
/// 3. **Shutdown**: Call `shutdown()` for graceful shutdown, or simply drop
///    the watcher. Dropping sends a shutdown signal and awaits task completion.
///
/// # Thread Safety
///
/// The watcher can be used from any async task. The underlying notify watcher
/// runs in a dedicated blocking thread managed by tokio's blocking pool.
///
/// # Examples
///
/// ```no_run
/// use aext_watcher::{FileWatcher, SourceFileFilter};
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), aext_watcher::WatchError> {
/// let mut watcher = FileWatcher::new(
///     Utf8Path::new("./my-extension"),
///     true,
///     SourceFileFilter::new("./my-extension"),
/// ).await?;
///
/// // Process events
/// while let Some(event) = watcher.recv().await {
///     println!("Changed: {}", event.path);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Shutdown signal sender.
    ///
    /// Sending on this channel signals the blocking task to stop.
    /// Set to `None` after shutdown is initiated.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking watcher task.
    ///
    /// Used to await completion during shutdown.
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    /// Event receiver for async consumption.
    event_rx: mpsc::Receiver<FileEvent>,

    /// The path being watched.
    watch_path: Utf8PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_path", &self.watch_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Creates a new file watcher for the specified path.
    ///
    /// This method:
    /// 1. Validates that the path exists
    /// 2. Creates the event channel
    /// 3. Spawns a blocking task with the notify watcher
    /// 4. Starts watching the path recursively (if configured)
    ///
    /// # Arguments
    ///
    /// * `path` - The path to watch (must exist)
    /// * `recursive` - Whether to watch subdirectories
    /// * `filter` - Filter to determine which events to process
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist.
    /// Returns [`WatchError::Notify`] if the watcher fails to initialize.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn new<F: FileFilter>(
        path: &Utf8Path,
        recursive: bool,
        filter: F,
    ) -> Result<Self, WatchError> {
        Self::with_capacity(path, recursive, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Creates a file watcher with a custom channel capacity.
    ///
    /// Use this when you need to handle bursts of file changes and want
    /// to prevent backpressure from blocking the watcher thread.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to watch
    /// * `recursive` - Whether to watch subdirectories
    /// * `filter` - Event filter
    /// * `channel_capacity` - Capacity of the event channel
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist.
    /// Returns [`WatchError::Notify`] if the watcher fails to initialize.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn with_capacity<F: FileFilter>(
        path: &Utf8Path,
        recursive: bool,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        // Validate path exists
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }

        // Canonicalize the path to get absolute path
        let watch_path = path.canonicalize_utf8().map_err(WatchError::Io)?;

        // Create channels
        let (event_tx, event_rx) = mpsc::channel(channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Clone values for the blocking task
        let task_path = watch_path.clone();

        // Spawn blocking task for notify
        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(task_path, recursive, event_tx, shutdown_rx, filter)
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            watch_path,
        })
    }

    /// Receives the next file event asynchronously.
    ///
    /// Returns `None` when the watcher has been shut down or the channel
    /// is closed.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.event_rx.recv().await
    }

    /// Tries to receive a file event without blocking.
    ///
    /// Returns `Ok(event)` if an event is available, `Err(TryRecvError::Empty)`
    /// if the channel is empty, or `Err(TryRecvError::Disconnected)` if the
    /// watcher has been shut down.
    pub fn try_recv(&mut self) -> Result<FileEvent, mpsc::error::TryRecvError> {
        self.event_rx.try_recv()
    }

    /// Returns a mutable reference to the event receiver.
    ///
    /// This is useful when you need to use the receiver directly with
    /// `tokio::select!` or other channel operations.
    pub fn events(&mut self) -> &mut mpsc::Receiver<FileEvent> {
        &mut self.event_rx
    }

    /// Returns the path being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` if the watcher is still running.
    ///
    /// The watcher may stop running if the shutdown signal is sent or
    /// if an error occurs in the blocking task.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Gracefully shuts down the watcher.
    ///
    /// This method:
    /// 1. Sends the shutdown signal to the blocking task
    /// 2. Awaits the task to complete
    /// 3. Returns any error from the watcher thread
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher thread panicked or encountered
    /// an error during operation.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        // Send shutdown signal
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if receiver is already dropped
            let _ = tx.send(());
        }

        // Await task completion
        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(WatchError::ChannelClosed),
            }
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        // Send shutdown signal on drop
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Note: We don't await the task here since Drop is sync.
        // The task will stop when it receives the shutdown signal.
    }
}

/// Runs the notify watcher loop in a blocking context.
///
/// This function is called from `spawn_blocking` and runs the synchronous
/// notify debouncer, forwarding filtered events to the async channel.
#[allow(clippy::needless_pass_by_value)] // Path must be owned for the blocking task lifetime
fn run_watcher_loop<F: FileFilter>(
    path: Utf8PathBuf,
    recursive: bool,
    event_tx: mpsc::Sender<FileEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) -> Result<(), WatchError> {
    let timeout = Duration::from_millis(RAW_COALESCE_MS);

    // Create the debouncer with a callback that sends events
    let tx = event_tx;
    let debouncer_result: Result<Debouncer<notify::RecommendedWatcher>, notify::Error> =
        new_debouncer(timeout, move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for event in events {
                    // Convert PathBuf to Utf8PathBuf
                    let utf8_path = match Utf8PathBuf::try_from(event.path) {
                        Ok(p) => p,
                        Err(e) => {
                            let invalid_path = e.into_path_buf();
                            tracing::warn!(
                                path = %invalid_path.display(),
                                "Skipping non-UTF-8 path in file event"
                            );
                            continue;
                        }
                    };

                    // Apply filter
                    if !filter.should_process(&utf8_path) {
                        tracing::trace!(path = %utf8_path, "Filtered out file event");
                        continue;
                    }

                    let file_event = FileEvent::new(utf8_path);

                    // Send via blocking_send for sync context
                    if tx.blocking_send(file_event).is_err() {
                        tracing::debug!("Event channel closed, stopping watcher");
                        break;
                    }
                }
            } else if let Err(error) = res {
                tracing::warn!(error = %error, "Debouncer error");
            }
        });

    let mut debouncer = debouncer_result?;

    // Configure recursive mode
    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    // Start watching
    debouncer.watcher().watch(path.as_std_path(), mode)?;

    tracing::info!(path = %path, recursive = recursive, "File watcher started");

    // Block until shutdown signal is received
    // Using blocking_recv since we're in a sync context
    let _ = shutdown_rx.blocking_recv();

    tracing::info!(path = %path, "File watcher stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AcceptAllFilter;
    use std::fs;
    use tempfile::TempDir;

    // Helper to create a temp directory for testing
    fn create_temp_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp directory")
    }

    #[tokio::test]
    async fn test_watcher_creation() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        let watcher = FileWatcher::new(path, true, AcceptAllFilter).await;

        assert!(watcher.is_ok());
        let watcher = watcher.expect("Watcher should be created");
        assert!(watcher.is_running());
    }

    #[tokio::test]
    async fn test_watcher_path_not_found() {
        let path = Utf8Path::new("/nonexistent/path/that/does/not/exist");

        let result = FileWatcher::new(path, true, AcceptAllFilter).await;

        assert!(result.is_err());
        match result {
            Err(WatchError::PathNotFound(_)) => {}
            other => panic!("Expected PathNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_watcher_shutdown() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        let watcher = FileWatcher::new(path, true, AcceptAllFilter)
            .await
            .expect("Failed to create watcher");

        let result = watcher.shutdown().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_watcher_receives_events() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        let mut watcher = FileWatcher::new(path, true, AcceptAllFilter)
            .await
            .expect("Failed to create watcher");

        // Create a file to trigger an event
        let file_path = temp_dir.path().join("test.lua");
        fs::write(&file_path, "-- hello").expect("Failed to write file");

        // Wait for the event with timeout
        let event = tokio::time::timeout(Duration::from_secs(2), watcher.recv()).await;

        // Shutdown cleanly
        watcher.shutdown().await.expect("Shutdown failed");

        // Verify we got an event (timing-dependent, may not always work in CI)
        if let Ok(Some(event)) = event {
            assert!(event.path.as_str().contains("test.lua"));
        }
    }

    #[tokio::test]
    async fn test_watcher_filters_events() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        // Match the watcher's canonicalized root so event paths strip
        let canonical = path.canonicalize_utf8().expect("Failed to canonicalize");
        let mut watcher = FileWatcher::new(path, true, crate::SourceFileFilter::new(canonical))
            .await
            .expect("Failed to create watcher");

        // A generated archive must never come through the channel
        let file_path = temp_dir.path().join("demo.aseprite-extension");
        fs::write(&file_path, b"PK").expect("Failed to write file");

        let event = tokio::time::timeout(Duration::from_millis(500), watcher.recv()).await;

        watcher.shutdown().await.expect("Shutdown failed");

        assert!(event.is_err(), "Filtered event should not be delivered");
    }

    #[tokio::test]
    async fn test_watcher_watch_path() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        let watcher = FileWatcher::new(path, true, AcceptAllFilter)
            .await
            .expect("Failed to create watcher");

        assert!(!watcher.watch_path().as_str().is_empty());
    }

    #[tokio::test]
    async fn test_watcher_with_capacity() {
        let temp_dir = create_temp_dir();
        let path = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");

        let watcher = FileWatcher::with_capacity(path, true, AcceptAllFilter, 50)
            .await
            .expect("Failed to create watcher");

        assert!(watcher.is_running());
    }
}
