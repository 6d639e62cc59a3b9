use crate::config::TagIndexConfig;
use crate::error::Result;
use crate::error::TagIndexError;
use crate::index::Entries;
use crate::index::merge_definitions;
use crate::index::model::MarkerOccurrence;
use crate::scanner::scan_text;
use crate::walker::TreeWalker;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

/// Counters for one full build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub files_discovered: usize,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub definitions: usize,
}

pub(crate) struct BuildRun {
    pub report: BuildReport,
    pub cancelled: bool,
}

pub(crate) enum FileOutcome {
    Scanned { definitions: usize },
    Skipped,
}

pub(crate) struct IndexBuilder {
    root: PathBuf,
    config: Arc<TagIndexConfig>,
    entries: Arc<Entries>,
}

impl IndexBuilder {
    pub(crate) fn new(root: &Path, config: Arc<TagIndexConfig>, entries: Arc<Entries>) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            entries,
        }
    }

    /// Walk the tree and scan every file on a bounded pool. Cancellation is
    /// observed between files; files already handed to a worker finish.
    pub(crate) async fn build(&self, cancel: &CancellationToken) -> BuildRun {
        let mut report = BuildReport::default();
        let files = self.discover_files().await;
        report.files_discovered = files.len();
        debug!("scanning {} files under {}", files.len(), self.root.display());

        let permits = self.config.max_concurrent.clamp(1, Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut tasks: Vec<(PathBuf, JoinHandle<Result<FileOutcome>>)> =
            Vec::with_capacity(files.len());
        let mut cancelled = false;

        for path in files {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                cancelled = true;
                break;
            };

            let entries = self.entries.clone();
            let max_file_bytes = self.config.max_file_bytes;
            let task_path = path.clone();
            let task = tokio::task::spawn_blocking(move || {
                let outcome = index_file(&entries, &task_path, max_file_bytes);
                drop(permit);
                outcome
            });
            tasks.push((path, task));
        }

        for (path, task) in tasks {
            match join_scan(task).await {
                Ok(FileOutcome::Scanned { definitions }) => {
                    report.files_scanned += 1;
                    report.definitions += definitions;
                }
                Ok(FileOutcome::Skipped) => report.files_skipped += 1,
                Err(err) => {
                    warn!("failed to scan {}: {err}", path.display());
                    report.files_failed += 1;
                }
            }
        }

        BuildRun { report, cancelled }
    }

    async fn discover_files(&self) -> Vec<PathBuf> {
        let walker = TreeWalker::new(&self.root, self.config.clone());
        match tokio::task::spawn_blocking(move || walker.files().collect::<Vec<_>>()).await {
            Ok(files) => files,
            Err(err) => {
                warn!("file discovery under {} failed: {err}", self.root.display());
                Vec::new()
            }
        }
    }
}

/// Flatten a scan task's panic or cancellation into the scan's own result.
pub(crate) async fn join_scan(task: JoinHandle<Result<FileOutcome>>) -> Result<FileOutcome> {
    task.await.map_err(TagIndexError::from)?
}

/// Scan one file and merge its definitions.
pub(crate) fn index_file(
    entries: &Entries,
    path: &Path,
    max_file_bytes: u64,
) -> Result<FileOutcome> {
    let Some(occurrences) = scan_file(path, max_file_bytes)? else {
        return Ok(FileOutcome::Skipped);
    };
    let definitions = merge_definitions(entries, occurrences);
    Ok(FileOutcome::Scanned { definitions })
}

/// `Ok(None)` for files that are too large or not UTF-8.
pub(crate) fn scan_file(path: &Path, max_file_bytes: u64) -> Result<Option<Vec<MarkerOccurrence>>> {
    let metadata = fs::metadata(path)?;
    if metadata.len() > max_file_bytes {
        debug!("skipping {} ({} bytes)", path.display(), metadata.len());
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let Ok(content) = std::str::from_utf8(&bytes) else {
        debug!("skipping non-utf8 file {}", path.display());
        return Ok(None);
    };
    Ok(Some(scan_text(path, content)))
}
