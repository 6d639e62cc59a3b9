mod builder;
pub(crate) mod model;

pub use builder::BuildReport;

use crate::config::TagIndexConfig;
use crate::index::builder::FileOutcome;
use crate::index::builder::IndexBuilder;
use crate::index::builder::index_file;
use crate::index::builder::join_scan;
use crate::index::model::IndexStats;
use crate::index::model::Location;
use crate::index::model::MarkerKind;
use crate::index::model::MarkerOccurrence;
use crate::walker::PathFilter;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Key to definition locations. Each slice is replaced wholesale on change so
/// readers holding an `Arc` never observe a partial merge.
pub(crate) type Entries = DashMap<String, Arc<[Location]>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// This call performed the full build.
    Built(BuildReport),
    /// A previous (or concurrent) call already built the index.
    AlreadyBuilt,
    /// The build was cancelled; the index stays unbuilt.
    Cancelled,
}

impl BuildOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, BuildOutcome::Built(_) | BuildOutcome::AlreadyBuilt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The index was never built, nothing to refresh.
    NotBuilt,
    Updated { removed: usize, added: usize },
}

/// Concurrent, lazily built map from marker key to definition locations for
/// one project root.
///
/// The index starts unbuilt; [`TagIndex::ensure_built`] performs exactly one
/// full walk no matter how many callers race on it, and [`TagIndex::clear`]
/// returns it to the unbuilt state.
pub struct TagIndex {
    config: Arc<TagIndexConfig>,
    entries: Arc<Entries>,
    built: AtomicBool,
    /// Held for builds, updates and clears; holds the root of the last
    /// successful build.
    build_lock: Mutex<Option<PathBuf>>,
    builds: AtomicUsize,
}

impl TagIndex {
    pub fn new(config: TagIndexConfig) -> Self {
        Self {
            config: Arc::new(config),
            entries: Arc::new(DashMap::new()),
            built: AtomicBool::new(false),
            build_lock: Mutex::new(None),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &TagIndexConfig {
        &self.config
    }

    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    /// Number of full builds that have run to completion or cancellation.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Acquire)
    }

    pub async fn ensure_built(&self, root: &Path, cancel: &CancellationToken) -> BuildOutcome {
        if self.is_built() {
            return BuildOutcome::AlreadyBuilt;
        }
        let mut built_root = tokio::select! {
            biased;
            _ = cancel.cancelled() => return BuildOutcome::Cancelled,
            guard = self.build_lock.lock() => guard,
        };
        if self.is_built() {
            return BuildOutcome::AlreadyBuilt;
        }

        let started = Instant::now();
        info!("building tag index for {}", root.display());
        let builder = IndexBuilder::new(root, self.config.clone(), self.entries.clone());
        let run = builder.build(cancel).await;
        self.builds.fetch_add(1, Ordering::AcqRel);

        if run.cancelled {
            info!(
                "tag index build for {} cancelled after {} files",
                root.display(),
                run.report.files_scanned
            );
            return BuildOutcome::Cancelled;
        }

        *built_root = Some(root.to_path_buf());
        self.built.store(true, Ordering::Release);
        let stats = self.stats();
        info!(
            "tag index built in {}ms: {} files scanned, {} failed, {} unique tags",
            started.elapsed().as_millis(),
            run.report.files_scanned,
            run.report.files_failed,
            stats.key_count
        );
        BuildOutcome::Built(run.report)
    }

    /// First location recorded for `key`. Never waits for a build; always
    /// `None` while the index is unbuilt.
    pub fn lookup(&self, key: &str) -> Option<Location> {
        if !self.is_built() {
            return None;
        }
        self.entries
            .get(key)
            .and_then(|locations| locations.first().cloned())
    }

    /// Every location recorded for `key`, in merge order.
    pub fn lookup_all(&self, key: &str) -> Vec<Location> {
        if !self.is_built() {
            return Vec::new();
        }
        self.entries
            .get(key)
            .map(|locations| locations.to_vec())
            .unwrap_or_default()
    }

    /// Re-scan a single file after it changed on disk. Entries for `path` are
    /// dropped first (case-insensitive path match). The file is re-read only
    /// if it still exists and a full build would have scanned it.
    pub async fn update_file(&self, path: &Path) -> UpdateOutcome {
        if !self.is_built() {
            return UpdateOutcome::NotBuilt;
        }
        let built_root = self.build_lock.lock().await;
        let Some(root) = built_root.as_deref() else {
            return UpdateOutcome::NotBuilt;
        };

        let removed = drop_file(&self.entries, path);
        let added = if self.is_indexable(root, path)
            && tokio::fs::try_exists(path).await.unwrap_or(false)
        {
            let entries = self.entries.clone();
            let owned = path.to_path_buf();
            let max_file_bytes = self.config.max_file_bytes;
            let task =
                tokio::task::spawn_blocking(move || index_file(&entries, &owned, max_file_bytes));
            match join_scan(task).await {
                Ok(FileOutcome::Scanned { definitions }) => definitions,
                Ok(FileOutcome::Skipped) => 0,
                Err(err) => {
                    warn!("failed to rescan {}: {err}", path.display());
                    0
                }
            }
        } else {
            0
        };
        debug!(
            "updated tag index for {}: {removed} removed, {added} added",
            path.display()
        );
        UpdateOutcome::Updated { removed, added }
    }

    // Same extension and ignore rules as the tree walk.
    fn is_indexable(&self, root: &Path, path: &Path) -> bool {
        if !self.config.allows_extension(path) {
            return false;
        }
        match PathFilter::new(root, &self.config.ignore_patterns) {
            Ok(filter) => !filter.is_ignored_path(path, Some(false)),
            Err(err) => {
                warn!("invalid ignore pattern, not filtering {}: {err}", path.display());
                true
            }
        }
    }

    /// Empty the index and return it to the unbuilt state. Waits for an
    /// in-flight build or update to finish first.
    pub async fn clear(&self) {
        let mut built_root = self.build_lock.lock().await;
        *built_root = None;
        self.entries.clear();
        self.built.store(false, Ordering::Release);
        info!("tag index cleared");
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats::default();
        for entry in self.entries.iter() {
            stats.key_count += 1;
            stats.location_count += entry.value().len();
        }
        stats
    }

    /// All keys with their definition counts, sorted by key.
    pub fn keys(&self) -> Vec<(String, usize)> {
        let mut keys: Vec<(String, usize)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect();
        keys.sort();
        keys
    }
}

impl Default for TagIndex {
    fn default() -> Self {
        Self::new(TagIndexConfig::default())
    }
}

/// Append every definition to its key's list. Locations already present are
/// skipped, so merging the same file twice is harmless.
pub(crate) fn merge_definitions(
    entries: &Entries,
    occurrences: impl IntoIterator<Item = MarkerOccurrence>,
) -> usize {
    let mut added = 0;
    for occurrence in occurrences {
        if occurrence.kind != MarkerKind::Definition {
            continue;
        }
        let location = occurrence.location();
        match entries.entry(occurrence.key) {
            Entry::Occupied(mut slot) => {
                if slot.get().contains(&location) {
                    continue;
                }
                let mut next = Vec::with_capacity(slot.get().len() + 1);
                next.extend(slot.get().iter().cloned());
                next.push(location);
                slot.insert(Arc::from(next));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::from(vec![location]));
            }
        }
        added += 1;
    }
    added
}

/// Remove every location in `path`; keys left empty are removed.
pub(crate) fn drop_file(entries: &Entries, path: &Path) -> usize {
    let mut removed = 0;
    entries.retain(|_, locations| {
        if locations.iter().any(|location| location.is_in_file(path)) {
            let kept: Vec<Location> = locations
                .iter()
                .filter(|location| !location.is_in_file(path))
                .cloned()
                .collect();
            removed += locations.len() - kept.len();
            *locations = Arc::from(kept);
        }
        !locations.is_empty()
    });
    removed
}
