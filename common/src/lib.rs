//! Common library for the `rsel` file selection tool
//!
//! `rsel` picks files out of a large directory tree by name and copies them into a single
//! destination directory. This crate holds the whole engine; the binary only parses arguments and
//! loads the configuration.
//!
//! # Pipeline
//!
//! 1. [`selection::read_targets`] reads the wanted names, one per line.
//! 2. [`scan::scan`] lists every file under the source root.
//! 3. [`select::match_targets`] splits the targets into chunks ([`chunk::partition`]) and checks
//!    each chunk against the full file list on the [`pool::WorkerPool`], using
//!    [`matcher::matches_name`].
//! 4. [`copy::copy_matches`] splits the matches into chunks and copies each chunk on the same
//!    pool through a [`copy::Copier`].
//!
//! [`select::run_selection`] runs all of the above and returns a [`select::Summary`].
//!
//! # Matching
//!
//! A name matches a file either exactly or through the "sign" embedded in generated names, see
//! [`matcher`].
//!
//! # Error handling
//!
//! Nothing in a selection run is fatal: unreadable directories are skipped, failed copies are
//! logged and counted, and an interrupted wait (Ctrl-C) ends one phase with partial results.
//!
//! # Configuration
//!
//! Settings come from a `.properties` file, see [`properties`] and [`config::SelectSettings`].

use std::sync::Arc;

use anyhow::Context;

pub mod chunk;
pub mod config;
pub mod copy;
pub mod matcher;
pub mod pool;
pub mod progress;
pub mod properties;
pub mod scan;
pub mod select;
pub mod selection;

mod testutils;

pub use config::{OutputConfig, RuntimeConfig, SelectSettings};
pub use properties::{Properties, PropertySource};

/// Periodic progress reporting settings
#[derive(Debug, Clone, Copy)]
pub struct ProgressSettings {
    pub delay: std::time::Duration,
}

impl ProgressSettings {
    pub const DEFAULT_DELAY: std::time::Duration = std::time::Duration::from_secs(10);

    /// Parse a human readable delay such as "500ms" or "1min".
    pub fn from_delay(delay: Option<&str>) -> anyhow::Result<Self> {
        let delay = match delay {
            Some(delay) => humantime::parse_duration(delay)
                .with_context(|| format!("invalid progress delay: {delay:?}"))?,
            None => Self::DEFAULT_DELAY,
        };
        Ok(Self { delay })
    }
}

fn log_filter(output: &OutputConfig) -> tracing_subscriber::EnvFilter {
    if let Ok(filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if output.quiet {
        "error"
    } else {
        match output.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::EnvFilter::new(level)
}

fn build_runtime(runtime: &RuntimeConfig) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    builder.build()
}

/// Set up logging and the tokio runtime, then run `func` to completion.
///
/// `func` receives the shared progress counters and an interrupt triggered on every Ctrl-C.
/// Returns `None` if the run could not be started or `func` failed; the error has been logged.
pub fn run<Fut, Summary>(
    progress: Option<ProgressSettings>,
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: impl FnOnce(Arc<progress::Progress>, pool::Interrupt) -> Fut,
) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
{
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&output))
        .with_target(false)
        .try_init()
    {
        eprintln!("failed to initialize logging: {error}");
    }
    let runtime = match build_runtime(&runtime) {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("failed to start tokio runtime: {:#}", error);
            return None;
        }
    };
    let res = runtime.block_on(async move {
        let prog_track = Arc::new(progress::Progress::new());
        let interrupt = pool::Interrupt::new();
        let watcher = {
            let interrupt = interrupt.clone();
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted, finishing the current phase");
                    interrupt.trigger();
                }
            })
        };
        let progress_done = tokio_util::sync::CancellationToken::new();
        let reporter = progress.map(|settings| {
            let prog_track = prog_track.clone();
            let done = progress_done.clone();
            tokio::spawn(async move {
                progress::report_progress(&prog_track, settings.delay, done).await;
            })
        });
        let res = func(prog_track, interrupt).await;
        progress_done.cancel();
        let reported = match reporter {
            Some(reporter) => reporter.await,
            None => Ok(()),
        };
        if let Err(error) = reported {
            tracing::debug!("progress reporter failed: {}", error);
        }
        watcher.abort();
        res
    });
    // blocking tasks abandoned by an interrupted join must not hold up the exit
    runtime.shutdown_background();
    match res {
        Ok(summary) => {
            if output.print_summary {
                println!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{:#}", error);
            None
        }
    }
}
