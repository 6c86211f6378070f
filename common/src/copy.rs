use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::chunk;
use crate::pool::{Joined, WorkerPool};
use crate::progress;

/// Error returned by a [`Copier`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed copying {src:?} to {dst:?}")]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot derive a file name from {0:?}")]
    NoFileName(PathBuf),
}

/// The file copy primitive used to replicate matches.
///
/// Implementations must overwrite an existing `dst`. The returned value is the number of bytes
/// copied.
pub trait Copier: Send + Sync + 'static {
    fn copy(&self, src: &Path, dst: &Path) -> impl Future<Output = Result<u64, Error>> + Send;
}

/// Copies through the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCopier;

impl Copier for FsCopier {
    async fn copy(&self, src: &Path, dst: &Path) -> Result<u64, Error> {
        tokio::fs::copy(src, dst).await.map_err(|source| Error::Copy {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source,
        })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes_copied: u64,
    pub files_copied: usize,
    pub failures: usize,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            bytes_copied: self.bytes_copied + other.bytes_copied,
            files_copied: self.files_copied + other.files_copied,
            failures: self.failures + other.failures,
        }
    }
}

impl std::iter::Sum for Summary {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, summary| acc + summary)
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "bytes copied: {}\n\
            files copied: {}\n\
            copy failures: {}",
            bytesize::ByteSize(self.bytes_copied),
            self.files_copied,
            self.failures,
        )
    }
}

/// Where a matched file lands: its own final path segment under `destination`, byte for byte.
pub fn destination_path(destination: &Path, src: &Path) -> Result<PathBuf, Error> {
    match src.file_name() {
        Some(name) => Ok(destination.join(name)),
        None => Err(Error::NoFileName(src.to_path_buf())),
    }
}

/// Copy one chunk of matches, file by file. A failure is logged and the next file is attempted.
#[instrument(skip_all, fields(start = chunk.start, len = chunk.len()))]
pub async fn copy_chunk<C: Copier>(
    prog_track: &progress::Progress,
    copier: &C,
    chunk: chunk::Chunk<PathBuf>,
    destination: &Path,
) -> Summary {
    let _guard = prog_track.tasks.guard();
    let mut summary = Summary::default();
    for src in chunk {
        let result = match destination_path(destination, &src) {
            Ok(dst) => copier.copy(&src, &dst).await,
            Err(error) => Err(error),
        };
        match result {
            Ok(bytes) => {
                tracing::trace!("copied {:?}", &src);
                prog_track.files_copied.inc();
                prog_track.bytes_copied.add(bytes);
                summary.files_copied += 1;
                summary.bytes_copied += bytes;
            }
            Err(error) => {
                tracing::error!("{:#}", anyhow::Error::from(error));
                prog_track.copy_failures.inc();
                summary.failures += 1;
            }
        }
    }
    summary
}

/// Replicate every matched path into `destination`, one pool task per chunk of `chunk_size`.
///
/// Same-name files overwrite each other; duplicates in `matches` are copied again.
#[instrument(skip(prog_track, pool, copier, matches, cancel), fields(matches = matches.len()))]
pub async fn copy_matches<C: Copier>(
    prog_track: &Arc<progress::Progress>,
    pool: &WorkerPool,
    copier: &Arc<C>,
    matches: Vec<PathBuf>,
    destination: &Path,
    chunk_size: NonZeroUsize,
    cancel: &CancellationToken,
) -> Joined<Summary> {
    let chunks = chunk::partition(matches, chunk_size);
    copy_chunks(prog_track, pool, copier, chunks, destination, cancel).await
}

/// Same as [`copy_matches`] for input that is already partitioned.
pub async fn copy_chunks<C: Copier>(
    prog_track: &Arc<progress::Progress>,
    pool: &WorkerPool,
    copier: &Arc<C>,
    chunks: Vec<chunk::Chunk<PathBuf>>,
    destination: &Path,
    cancel: &CancellationToken,
) -> Joined<Summary> {
    let mut group = pool.task_group();
    for chunk in chunks {
        let prog_track = prog_track.clone();
        let copier = copier.clone();
        let destination = destination.to_path_buf();
        group.spawn(async move {
            copy_chunk(&prog_track, copier.as_ref(), chunk, &destination).await
        });
    }
    group.join(cancel).await
}
