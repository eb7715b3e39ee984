use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use gitdoc_core::{FileContent, RemoteError, RemoteRepo, RepoId};

/// Monotonic request sequence. A result is applied only if no newer request
/// began (or the guard was invalidated) while it was in flight.
#[derive(Debug, Default)]
pub struct LoadGuard {
    seq: AtomicU64,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.seq.load(Ordering::SeqCst) == ticket
    }

    /// Supersede everything in flight.
    pub fn invalidate(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
    }
}

/// The file the consumer currently has open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub path: String,
    /// `None` until loaded, or after a failed load.
    pub content: Option<FileContent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    Loaded(FileContent),
    /// A newer request or a selection change overtook this one; nothing was
    /// applied.
    Superseded,
    Failed(RemoteError),
}

/// Loads file content for one repository, discarding stale responses.
pub struct FileLoader {
    remote: Arc<dyn RemoteRepo>,
    repo: RepoId,
    guard: LoadGuard,
    open: Mutex<Option<OpenFile>>,
}

impl FileLoader {
    pub fn new(remote: Arc<dyn RemoteRepo>, repo: RepoId) -> Self {
        Self {
            remote,
            repo,
            guard: LoadGuard::new(),
            open: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenFile>> {
        self.open.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn open_file(&self) -> Option<OpenFile> {
        self.lock().clone()
    }

    pub fn selected_path(&self) -> Option<String> {
        self.lock().as_ref().map(|f| f.path.clone())
    }

    /// Switch the selection to `path` and load it.
    pub async fn select(&self, path: &str) -> LoadResult {
        *self.lock() = Some(OpenFile {
            path: path.to_string(),
            content: None,
        });
        self.load(path).await
    }

    /// Reload the selected file, e.g. after a remote change.
    pub async fn reload(&self) -> Option<LoadResult> {
        let path = self.selected_path()?;
        Some(self.load(&path).await)
    }

    async fn load(&self, path: &str) -> LoadResult {
        let ticket = self.guard.begin();
        let fetched = self.remote.content_at(&self.repo, path, None).await;

        let mut open = self.lock();
        let still_selected = open.as_ref().is_some_and(|f| f.path == path);
        if !self.guard.is_current(ticket) || !still_selected {
            tracing::trace!(path, "discarding superseded load");
            return LoadResult::Superseded;
        }
        let Some(file) = open.as_mut() else {
            return LoadResult::Superseded;
        };
        match fetched {
            Ok(content) => {
                file.content = Some(content.clone());
                LoadResult::Loaded(content)
            }
            Err(e) => {
                tracing::debug!(path, error = %e, "file load failed");
                file.content = None;
                LoadResult::Failed(e)
            }
        }
    }

    /// Apply a version this client just wrote, if `path` is still open.
    pub fn record_saved(&self, content: FileContent) {
        let mut open = self.lock();
        if let Some(file) = open.as_mut().filter(|f| f.path == content.path) {
            file.content = Some(content);
        }
    }

    /// Close `path` if it is open and cancel its in-flight load.
    pub fn close_if(&self, path: &str) -> bool {
        let mut open = self.lock();
        if open.as_ref().is_some_and(|f| f.path == path) {
            self.guard.invalidate();
            *open = None;
            return true;
        }
        false
    }

    /// Clear the selection and cancel any in-flight load.
    pub fn reset(&self) {
        self.guard.invalidate();
        *self.lock() = None;
    }
}
