use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tracing::instrument;

/// Names to select, in file order, duplicates kept.
pub type TargetList = Arc<Vec<String>>;

/// Read the selection list at `path`, one target per line.
///
/// A path that is not an existing regular file yields an empty list. A read failure keeps the
/// lines read so far.
#[instrument]
pub async fn read_targets(path: &Path) -> TargetList {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => {
            tracing::info!("selection list {:?} is not a regular file", path);
            return Arc::default();
        }
        Err(error) => {
            tracing::info!("selection list {:?} is not readable: {}", path, error);
            return Arc::default();
        }
    }
    let mut targets = Vec::new();
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(error) => {
            tracing::error!("failed opening selection list {:?}: {}", path, error);
            return Arc::default();
        }
    };
    // invalid UTF-8 is replaced per line, only I/O errors end the read
    let mut lines = tokio::io::BufReader::new(file).split(b'\n');
    loop {
        match lines.next_segment().await {
            Ok(Some(line)) => {
                let target = String::from_utf8_lossy(&line).trim().to_string();
                tracing::trace!("target: {:?}", &target);
                targets.push(target);
            }
            Ok(None) => break,
            Err(error) => {
                tracing::error!(
                    "failed reading selection list {:?} after {} lines: {}",
                    path,
                    targets.len(),
                    error
                );
                break;
            }
        }
    }
    tracing::info!("targets to select: {}", targets.len());
    Arc::new(targets)
}
