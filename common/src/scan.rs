use std::collections::HashSet;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::instrument;

use crate::matcher;
use crate::progress;

/// A file found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// absolute path of the file
    pub path: PathBuf,
    /// final path segment, extracted once so matching does not re-split paths
    pub name: String,
}

impl Candidate {
    pub fn new(path: PathBuf) -> Self {
        let name = matcher::file_name(&path.to_string_lossy()).to_string();
        Self { path, name }
    }
}

/// Every file under a root, in discovery order.
pub type SourceIndex = Arc<Vec<Candidate>>;

async fn list_dir(dir: &Path, dirs: &mut Vec<PathBuf>, files: &mut Vec<Candidate>) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) => {
            tracing::debug!("cannot list {:?}, skipping: {}", dir, error);
            return;
        }
    };
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(error) => {
                tracing::debug!("failed traversing {:?}, skipping the rest: {}", dir, error);
                return;
            }
        };
        let entry_path = entry.path();
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(error) => {
                tracing::debug!("failed reading file type of {:?}: {}", entry_path, error);
                continue;
            }
        };
        if file_type.is_dir() {
            dirs.push(entry_path);
            continue;
        }
        if file_type.is_symlink() {
            let points_to_dir = tokio::fs::metadata(&entry_path)
                .await
                .map(|metadata| metadata.is_dir())
                .unwrap_or(false);
            if points_to_dir {
                tracing::trace!("following directory symlink {:?}", entry_path);
                dirs.push(entry_path);
                continue;
            }
        }
        files.push(Candidate::new(entry_path));
    }
}

/// Collect every non-directory entry under `root`.
///
/// Directory symlinks are followed and each directory is listed once, however many links lead
/// to it. Unreadable directories are treated as empty. A root that is not a directory produces an
/// empty index.
#[instrument(skip(prog_track))]
pub async fn scan(prog_track: &progress::Progress, root: &Path) -> SourceIndex {
    let root = match std::path::absolute(root) {
        Ok(root) => root,
        Err(error) => {
            tracing::info!("cannot resolve scan root {:?}: {}", root, error);
            return Arc::default();
        }
    };
    match tokio::fs::metadata(&root).await {
        Ok(metadata) if metadata.is_dir() => {}
        _ => {
            tracing::info!("scan root {:?} is not a directory", root);
            return Arc::default();
        }
    }
    let mut files = Vec::new();
    let mut dirs = vec![root];
    // directories already listed, by (device, inode); symlinks may lead back into the tree
    let mut visited = HashSet::new();
    while let Some(dir) = dirs.pop() {
        match tokio::fs::metadata(&dir).await {
            Ok(metadata) => {
                if !visited.insert((metadata.dev(), metadata.ino())) {
                    tracing::debug!("{:?} was already scanned, skipping", dir);
                    continue;
                }
            }
            Err(error) => {
                tracing::debug!("cannot stat {:?}, skipping: {}", dir, error);
                continue;
            }
        }
        let before = files.len();
        list_dir(&dir, &mut dirs, &mut files).await;
        prog_track.dirs_scanned.inc();
        prog_track.files_scanned.add((files.len() - before) as u64);
    }
    tracing::info!("candidate files found: {}", files.len());
    Arc::new(files)
}
