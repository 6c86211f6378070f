use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rsel",
    version,
    about = "Select files by name from a large tree and copy them into one directory",
    long_about = "`rsel` reads a list of wanted file names, finds every file under a source tree whose name matches one of them and copies the matches, flattened, into a destination directory.

A name matches a file when it equals the file's name, or when it equals the \"sign\" of a generated name: for `ISR-03-44-nb-sbyq1-9g931q103q-utt.wav` the sign is `9g931q103q-utt`.

Settings are read from a properties file:

    select_file_list=/data/wanted.txt
    file_location=/data/corpus
    destination_file_name=/data/selected
    # optional
    worker_pool_size=200
    match_chunk_size=25
    copy_chunk_size=100

EXAMPLE:
    # Run with a custom configuration file and print a summary
    rsel --config /etc/rsel/config.properties --summary"
)]
struct Args {
    // Configuration
    /// Path of the properties file holding the selection settings
    #[arg(
        long,
        default_value = "config.properties",
        value_name = "PATH",
        help_heading = "Configuration"
    )]
    config: std::path::PathBuf,

    // Progress & output
    /// Show progress
    #[arg(long, help_heading = "Progress & output")]
    progress: bool,

    /// Sets the delay between progress updates, default is 10s
    ///
    /// If specified, --progress flag is implied.
    ///
    /// This option accepts a human readable duration, e.g. "200ms", "10s", "5min" etc.
    #[arg(long, value_name = "DELAY", value_parser = parse_progress_delay, help_heading = "Progress & output")]
    progress_delay: Option<std::time::Duration>,

    /// Verbose level: -v DEBUG / -vv TRACE (default: INFO)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, only report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Number of worker threads, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,
}

fn parse_progress_delay(delay: &str) -> Result<std::time::Duration, String> {
    common::ProgressSettings::from_delay(Some(delay))
        .map(|settings| settings.delay)
        .map_err(|error| format!("{error:#}"))
}

#[instrument(skip(prog_track, interrupt))]
async fn async_main(
    args: Args,
    prog_track: Arc<common::progress::Progress>,
    interrupt: common::pool::Interrupt,
) -> Result<common::select::Summary> {
    let properties = common::Properties::from_file(&args.config)?;
    if properties.is_empty() {
        tracing::warn!("{:?} defines no properties", &args.config);
    }
    let settings = common::SelectSettings::from_properties(&properties)
        .with_context(|| format!("invalid configuration in {:?}", &args.config))?;
    tracing::info!(
        "selecting from {:?} into {:?} with {} workers",
        &settings.file_location,
        &settings.destination,
        settings.worker_pool_size
    );
    let copier = Arc::new(common::copy::FsCopier);
    Ok(common::select::run_selection(&prog_track, &settings, copier, &interrupt).await)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let progress = if args.progress || args.progress_delay.is_some() {
        Some(common::ProgressSettings {
            delay: args
                .progress_delay
                .unwrap_or(common::ProgressSettings::DEFAULT_DELAY),
        })
    } else {
        None
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let func = {
        let args = args.clone();
        |prog_track, interrupt| async_main(args, prog_track, interrupt)
    };
    // configuration and runtime errors were already logged, they do not change the exit status
    let _ = common::run(progress, output, runtime, func);
    Ok(())
}
