//! Reference resolution: the open document first, then the project index.

use crate::index::BuildOutcome;
use crate::index::TagIndex;
use crate::index::model::Location;
use crate::scanner::find_definition;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// The document the caret is in. `content` is the live buffer, which may
/// differ from what is on disk.
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    pub path: &'a Path,
    pub content: &'a str,
}

impl<'a> Document<'a> {
    pub fn new(path: &'a Path, content: &'a str) -> Self {
        Self { path, content }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    CurrentDocument,
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Found {
        location: Location,
        source: ResolutionSource,
    },
    NotFound,
}

impl Resolution {
    pub fn location(&self) -> Option<&Location> {
        match self {
            Resolution::Found { location, .. } => Some(location),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

/// Host-side "open file, move caret, reveal" collaborator.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate_to(&self, location: &Location) -> anyhow::Result<()>;
}

pub struct Resolver {
    index: Arc<TagIndex>,
    cancel: Mutex<CancellationToken>,
}

impl Resolver {
    pub fn new(index: Arc<TagIndex>) -> Self {
        Self {
            index,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn index(&self) -> &Arc<TagIndex> {
        &self.index
    }

    /// Abort any build started by an in-flight `resolve`. Later calls start
    /// with a fresh token.
    pub fn cancel(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn resolve(
        &self,
        key: &str,
        document: &Document<'_>,
        project_root: Option<&Path>,
    ) -> Resolution {
        if let Some(occurrence) = find_definition(document.path, document.content, key) {
            debug!("resolved {key} in current document {}", document.path.display());
            return Resolution::Found {
                location: occurrence.location(),
                source: ResolutionSource::CurrentDocument,
            };
        }

        let Some(root) = project_root else {
            return Resolution::NotFound;
        };
        let cancel = self.current_token();
        if let BuildOutcome::Cancelled = self.index.ensure_built(root, &cancel).await {
            debug!("index build cancelled while resolving {key}");
            return Resolution::NotFound;
        }
        match self.index.lookup(key) {
            Some(location) => Resolution::Found {
                location,
                source: ResolutionSource::Index,
            },
            None => Resolution::NotFound,
        }
    }

    /// Resolve and hand a hit to `navigator`. Navigation failures are logged
    /// and do not change the returned resolution.
    pub async fn navigate(
        &self,
        key: &str,
        document: &Document<'_>,
        project_root: Option<&Path>,
        navigator: &dyn Navigator,
    ) -> Resolution {
        let resolution = self.resolve(key, document, project_root).await;
        match resolution.location() {
            Some(location) => {
                if let Err(err) = navigator.navigate_to(location).await {
                    warn!("failed to navigate to {location}: {err:#}");
                }
            }
            None => info!("tag not found: tag:#{key}"),
        }
        resolution
    }
}
