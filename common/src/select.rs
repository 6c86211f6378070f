use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::chunk;
use crate::config::SelectSettings;
use crate::copy;
use crate::matcher;
use crate::pool::{Interrupt, WorkerPool};
use crate::progress;
use crate::scan::{self, SourceIndex};
use crate::selection::{self, TargetList};

/// Candidate paths selected by at least one target.
///
/// A path appears once per target that selected it, so the same file can be present more than
/// once. Order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    paths: Vec<PathBuf>,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of different paths, ignoring repeats.
    pub fn distinct(&self) -> usize {
        self.paths.iter().collect::<HashSet<_>>().len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

impl FromIterator<PathBuf> for MatchSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Outcome of the matching phase.
#[derive(Debug, Default)]
pub struct Matched {
    pub match_set: MatchSet,
    /// the wait was cancelled, `match_set` only holds the chunks that finished
    pub interrupted: bool,
}

/// Scan the whole index for every target in `targets`.
pub fn match_chunk(
    prog_track: &progress::Progress,
    targets: chunk::Chunk<String>,
    candidates: &[scan::Candidate],
) -> Vec<PathBuf> {
    let _guard = prog_track.tasks.guard();
    let mut found = Vec::new();
    for target in targets {
        for candidate in candidates {
            if matcher::matches_name(&target, &candidate.name) {
                found.push(candidate.path.clone());
            }
        }
        prog_track.targets_checked.inc();
    }
    prog_track.files_matched.add(found.len() as u64);
    found
}

/// Match every target against every candidate, one pool task per chunk of `chunk_size` targets.
#[instrument(skip_all, fields(targets = targets.len(), candidates = candidates.len()))]
pub async fn match_targets(
    prog_track: &Arc<progress::Progress>,
    pool: &WorkerPool,
    targets: &TargetList,
    candidates: &SourceIndex,
    chunk_size: NonZeroUsize,
    cancel: &CancellationToken,
) -> Matched {
    let chunks = chunk::partition(targets.to_vec(), chunk_size);
    tracing::info!(
        "matching {} targets in {} chunks ({} after partition)",
        targets.len(),
        chunks.len(),
        chunk::total_len(&chunks)
    );
    let mut group = pool.task_group();
    for chunk in chunks {
        let prog_track = prog_track.clone();
        let candidates = candidates.clone();
        group.spawn_blocking(move || match_chunk(&prog_track, chunk, &candidates));
    }
    let joined = group.join(cancel).await;
    Matched {
        interrupted: joined.interrupted,
        match_set: joined.results.into_iter().flatten().collect(),
    }
}

/// Counters describing a finished selection run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub targets: usize,
    pub candidates: usize,
    pub matches: usize,
    pub distinct_matches: usize,
    pub copy_chunks: usize,
    pub copy: copy::Summary,
    pub interrupted: bool,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "targets: {}\n\
            candidates: {}\n\
            matches: {}\n\
            distinct matches: {}\n\
            copy chunks: {}\n\
            {}",
            self.targets,
            self.candidates,
            self.matches,
            self.distinct_matches,
            self.copy_chunks,
            &self.copy,
        )?;
        if self.interrupted {
            write!(f, "\ninterrupted: partial results")?;
        }
        Ok(())
    }
}

/// Run the whole pipeline: read targets, scan, match, copy.
///
/// Nothing here is fatal. Problems are logged and reflected in the returned [`Summary`]. An
/// interrupt ends only the phase it arrives in: interrupted matching still copies the matches
/// found so far.
#[instrument(skip(prog_track, copier, interrupt))]
pub async fn run_selection<C: copy::Copier>(
    prog_track: &Arc<progress::Progress>,
    settings: &SelectSettings,
    copier: Arc<C>,
    interrupt: &Interrupt,
) -> Summary {
    let mut summary = Summary::default();
    let phase_start = std::time::Instant::now();
    let targets = selection::read_targets(&settings.select_file_list).await;
    summary.targets = targets.len();
    tracing::info!("reading selection list took {:?}", phase_start.elapsed());
    let phase_start = std::time::Instant::now();
    let candidates = scan::scan(prog_track, &settings.file_location).await;
    summary.candidates = candidates.len();
    tracing::info!("scanning {:?} took {:?}", &settings.file_location, phase_start.elapsed());
    if targets.is_empty() || candidates.is_empty() {
        tracing::info!(
            "nothing to select: {} targets, {} candidate files",
            targets.len(),
            candidates.len()
        );
        return summary;
    }
    let pool = WorkerPool::new(settings.worker_pool_size);
    let phase_start = std::time::Instant::now();
    let Matched {
        match_set,
        interrupted,
    } = match_targets(
        prog_track,
        &pool,
        &targets,
        &candidates,
        settings.match_chunk_size,
        &interrupt.token(),
    )
    .await;
    if interrupted {
        tracing::warn!("matching was interrupted, continuing with the matches found so far");
        summary.interrupted = true;
        interrupt.clear();
    }
    summary.matches = match_set.len();
    summary.distinct_matches = match_set.distinct();
    tracing::info!(
        "matching took {:?}, matched files: {}",
        phase_start.elapsed(),
        summary.matches
    );
    tracing::info!("distinct matched files: {}", summary.distinct_matches);
    let phase_start = std::time::Instant::now();
    let chunks = chunk::partition(match_set.into_paths(), settings.copy_chunk_size);
    summary.copy_chunks = chunks.len();
    tracing::info!(
        "partitioning matches took {:?}, {} chunks",
        phase_start.elapsed(),
        chunks.len()
    );
    tracing::info!(
        "files before partition: {}, after partition: {}",
        summary.matches,
        chunk::total_len(&chunks)
    );
    let phase_start = std::time::Instant::now();
    tracing::info!("copying to {:?}", &settings.destination);
    let joined = copy::copy_chunks(
        prog_track,
        &pool,
        &copier,
        chunks,
        &settings.destination,
        &interrupt.token(),
    )
    .await;
    if joined.interrupted {
        tracing::warn!("copying was interrupted");
        summary.interrupted = true;
        interrupt.clear();
    }
    summary.copy = joined.results.into_iter().sum();
    tracing::info!(
        "copying took {:?}, copied: {}, failed: {}",
        phase_start.elapsed(),
        summary.copy.files_copied,
        summary.copy.failures
    );
    summary
}
