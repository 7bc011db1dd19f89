//! CLI entry point for the Aseprite extension toolkit.
//!
//! This binary packages Aseprite extensions into installable
//! `.aseprite-extension` archives and runs live-reload sessions that keep
//! an installed extension in sync with its sources during development.
//!
//! # Usage
//!
//! ```bash
//! aext [OPTIONS] <COMMAND>
//!
//! # Build an installable archive next to the extension directory
//! aext pack ./my-extension
//!
//! # Build and install into the Aseprite extensions directory
//! aext pack ./my-extension --install
//!
//! # Watch sources and reinstall on every settled burst of changes
//! aext live-reload ./my-extension --debounce 0.5
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use aext_build::{BuildOptions, PackOutcome, default_extensions_dir, pack};
use aext_core::WatchConfig;
use aext_watcher::run_session;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Packaging and live-reload tool for Aseprite extensions.
///
/// Reads the extension's `package.json`, collects its Lua scripts, and
/// either produces a `.aseprite-extension` archive or keeps an installed
/// copy in sync while you edit.
#[derive(Parser)]
#[command(name = "aext", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build a `.aseprite-extension` archive from an extension directory.
    Pack {
        /// Path to the extension root (the directory with `package.json`).
        extension_path: Utf8PathBuf,

        /// Override the archive base name (defaults to the extension's
        /// `name` field).
        #[arg(short, long)]
        output: Option<String>,

        /// Directory to place the archive in (defaults to the extension
        /// root's parent directory).
        #[arg(long)]
        output_dir: Option<Utf8PathBuf>,

        /// Remove previously built archives from the output directory
        /// before building.
        #[arg(long)]
        clean: bool,

        /// Install the archive into the Aseprite extensions directory
        /// after building.
        #[arg(short, long)]
        install: bool,

        /// Extensions directory to install into (defaults to the platform
        /// Aseprite configuration directory; ignored without `--install`).
        #[arg(long, env = "AEXT_EXTENSIONS_DIR")]
        extensions_dir: Option<Utf8PathBuf>,
    },

    /// Watch an extension directory and reinstall it on changes.
    LiveReload {
        /// Path to the extension root (the directory with `package.json`).
        extension_path: Utf8PathBuf,

        /// Debounce window in seconds; rebuilds fire after this much
        /// quiet time following a change.
        #[arg(short, long, default_value_t = 1.0)]
        debounce: f64,

        /// Extensions directory to install into (defaults to the platform
        /// Aseprite configuration directory).
        #[arg(long, env = "AEXT_EXTENSIONS_DIR")]
        extensions_dir: Option<Utf8PathBuf>,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Noisy crates like `notify` are filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,mio=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Validates that the extension path exists and is a directory.
fn validate_extension_path(path: &Utf8PathBuf) -> color_eyre::Result<()> {
    if !path.exists() {
        return Err(color_eyre::eyre::eyre!("Path does not exist: {}", path));
    }
    if !path.is_dir() {
        return Err(color_eyre::eyre::eyre!("Path is not a directory: {}", path));
    }
    Ok(())
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Arguments to the `pack` command after CLI parsing.
struct PackArgs {
    extension_path: Utf8PathBuf,
    output: Option<String>,
    output_dir: Option<Utf8PathBuf>,
    clean: bool,
    install: bool,
    extensions_dir: Option<Utf8PathBuf>,
}

/// Runs a one-shot pack, optionally installing the result.
///
/// # Errors
///
/// Returns an error if validation, collection, building, or installation
/// fails; the process exits non-zero on any of them.
fn run_pack(args: PackArgs) -> color_eyre::Result<()> {
    validate_extension_path(&args.extension_path)?;

    let options = BuildOptions {
        output_name: args.output,
        output_dir: args.output_dir,
        clean: args.clean,
    };

    let install_to = if args.install {
        let dir = match args.extensions_dir {
            Some(dir) => dir,
            None => default_extensions_dir().ok_or_else(|| {
                color_eyre::eyre::eyre!(
                    "No default extensions directory on this platform; pass --extensions-dir"
                )
            })?,
        };
        Some(dir)
    } else {
        None
    };

    info!(path = %args.extension_path, "Packing extension");
    let outcome = pack(&args.extension_path, &options, install_to.as_deref())?;

    print_pack_summary(&outcome)?;
    Ok(())
}

/// Runs a live-reload session until Ctrl-C or SIGTERM.
///
/// Rebuild failures during the session are reported and the session
/// continues; only startup validation failures exit non-zero.
async fn run_live_reload(
    extension_path: Utf8PathBuf,
    debounce: f64,
    extensions_dir: Option<Utf8PathBuf>,
) -> color_eyre::Result<()> {
    validate_extension_path(&extension_path)?;

    if !debounce.is_finite() || debounce <= 0.0 {
        return Err(color_eyre::eyre::eyre!(
            "Debounce must be a positive number of seconds, got {debounce}"
        ));
    }

    let config = WatchConfig {
        debounce_ms: Duration::from_secs_f64(debounce).as_millis().try_into()?,
        ..WatchConfig::default()
    };

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone())?;

    let stats = run_session(
        &extension_path,
        &config,
        extensions_dir.as_deref(),
        cancel,
    )
    .await?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle)?;
    writeln!(handle, "Session summary")?;
    writeln!(handle, "  Changes seen:      {}", stats.events_seen)?;
    writeln!(handle, "  Rebuilds:          {}", stats.rebuilds_completed)?;
    writeln!(handle, "  Failed rebuilds:   {}", stats.rebuilds_failed)?;

    Ok(())
}

/// Cancels the token on Ctrl-C, and on SIGTERM where available.
fn spawn_signal_handler(cancel: CancellationToken) -> color_eyre::Result<()> {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
                        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                    }
                }
                Err(_) => {
                    let _ = ctrl_c.await;
                    info!("Received Ctrl-C, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("Received Ctrl-C, shutting down");
        }

        cancel.cancel();
    });
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints the pack result to stdout.
fn print_pack_summary(outcome: &PackOutcome) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle)?;
    writeln!(
        handle,
        "Packed {} v{}",
        outcome.manifest.display_name, outcome.manifest.version
    )?;
    writeln!(handle, "  Archive: {}", outcome.artifact.path())?;

    if let Some(report) = &outcome.installed {
        let action = if report.replaced_previous {
            "Replaced"
        } else {
            "Installed"
        };
        writeln!(handle, "  {action}: {}", report.installed_to)?;
    }

    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match cli.command {
        Commands::Pack {
            extension_path,
            output,
            output_dir,
            clean,
            install,
            extensions_dir,
        } => run_pack(PackArgs {
            extension_path,
            output,
            output_dir,
            clean,
            install,
            extensions_dir,
        }),
        Commands::LiveReload {
            extension_path,
            debounce,
            extensions_dir,
        } => run_live_reload(extension_path, debounce, extensions_dir).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pack_short_o_is_output_name() {
        let cli = Cli::try_parse_from(["aext", "pack", "./ext", "-o", "custom"])
            .expect("arguments should parse");
        match cli.command {
            Commands::Pack {
                output, output_dir, ..
            } => {
                assert_eq!(output.as_deref(), Some("custom"));
                assert!(output_dir.is_none());
            }
            Commands::LiveReload { .. } => panic!("Expected pack subcommand"),
        }
    }

    #[test]
    fn test_pack_output_dir_is_long_only() {
        let cli = Cli::try_parse_from(["aext", "pack", "./ext", "--output-dir", "/tmp/out"])
            .expect("arguments should parse");
        match cli.command {
            Commands::Pack { output_dir, .. } => {
                assert_eq!(output_dir.as_deref(), Some(camino::Utf8Path::new("/tmp/out")));
            }
            Commands::LiveReload { .. } => panic!("Expected pack subcommand"),
        }
    }
}
