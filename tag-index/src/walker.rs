use crate::config::TagIndexConfig;
use crate::error::Result;
use ignore::Match;
use ignore::WalkBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

const DEFAULT_PATTERNS: &[&str] = &[".git/", "node_modules/", "target/", "bin/", "obj/"];

#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    matcher: Gitignore,
}

impl PathFilter {
    pub fn new(root: &Path, extra_patterns: &[String]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in DEFAULT_PATTERNS {
            builder.add_line(None, pattern)?;
        }
        for pattern in extra_patterns {
            builder.add_line(None, pattern)?;
        }
        let matcher = builder.build()?;
        Ok(Self {
            root: root.to_path_buf(),
            matcher,
        })
    }

    fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            matcher: Gitignore::empty(),
        }
    }

    pub fn is_ignored_path(&self, path: &Path, is_dir_hint: Option<bool>) -> bool {
        let abs = if path.starts_with(&self.root) {
            path.to_path_buf()
        } else if path.is_absolute() {
            return false;
        } else {
            self.root.join(path)
        };
        let is_dir = is_dir_hint.unwrap_or_else(|| abs.is_dir());
        matches!(
            self.matcher.matched_path_or_any_parents(&abs, is_dir),
            Match::Ignore(_)
        )
    }
}

/// Enumerates candidate files below a root. Unreadable entries are reported
/// through `tracing` and skipped; the walk itself never fails.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
    config: Arc<TagIndexConfig>,
    filter: Arc<PathFilter>,
}

impl TreeWalker {
    pub fn new(root: &Path, config: Arc<TagIndexConfig>) -> Self {
        let filter = match PathFilter::new(root, &config.ignore_patterns) {
            Ok(filter) => filter,
            Err(err) => {
                warn!("invalid ignore pattern, walking {} unfiltered: {err}", root.display());
                PathFilter::empty(root)
            }
        };
        Self {
            root: root.to_path_buf(),
            config,
            filter: Arc::new(filter),
        }
    }

    /// Lazily yields allow-listed files in no particular order.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + use<> {
        let filter = self.filter.clone();
        let config = self.config.clone();
        let respect_gitignore = config.respect_gitignore;
        WalkBuilder::new(&self.root)
            .hidden(false)
            .follow_links(false)
            .parents(false)
            .ignore(respect_gitignore)
            .git_ignore(respect_gitignore)
            .git_exclude(respect_gitignore)
            .git_global(false)
            .require_git(false)
            .filter_entry(move |entry| {
                let is_dir_hint = entry.file_type().map(|ft| ft.is_dir());
                !filter.is_ignored_path(entry.path(), is_dir_hint)
            })
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("skipping entry: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(move |path| config.allows_extension(path))
    }
}

/// Allow-listed files under `root`, recursively.
pub fn list_files(root: &Path, config: &TagIndexConfig) -> impl Iterator<Item = PathBuf> + use<> {
    TreeWalker::new(root, Arc::new(config.clone())).files()
}
