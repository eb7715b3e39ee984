use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use gitdoc_core::{RemoteRepo, RemoteResult, RepoId, TreeEntry, TreeId};
use gitdoc_store::SessionFile;

const TREE_KEY_PREFIX: &str = "gitdoc_tree:";

/// Session-scoped string storage. Failures are absorbed by the caller, so
/// implementations report them rather than panic.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Lives as long as the process.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("session store poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Survives process restarts that share a session name.
pub struct FileSessionStore {
    file: SessionFile,
}

impl FileSessionStore {
    pub fn open(root: &Path, session: &str) -> Self {
        Self {
            file: SessionFile::open(root, session),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.file.get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.file.set(key, value)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.file.remove(key)
    }
}

/// Last-known tree reference per repository.
pub struct SnapshotCache {
    store: Box<dyn SessionStore>,
}

impl SnapshotCache {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySessionStore::new()))
    }

    fn key(repo: &RepoId) -> String {
        format!("{TREE_KEY_PREFIX}{repo}")
    }

    pub fn get(&self, repo: &RepoId) -> Option<TreeId> {
        match self.store.get(&Self::key(repo)) {
            Ok(v) => v.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::debug!(repo = %repo, error = %e, "tree cache read failed");
                None
            }
        }
    }

    pub fn set(&self, repo: &RepoId, tree_id: &str) {
        if tree_id.is_empty() {
            return;
        }
        if let Err(e) = self.store.set(&Self::key(repo), tree_id) {
            tracing::debug!(repo = %repo, error = %e, "tree cache write failed");
        }
    }

    pub fn clear(&self, repo: &RepoId) {
        if let Err(e) = self.store.remove(&Self::key(repo)) {
            tracing::debug!(repo = %repo, error = %e, "tree cache clear failed");
        }
    }

    /// Root structure fetch: cached tree first, else the default branch
    /// HEAD's tree. An explicit `tree_id` bypasses the lookup. The tree used
    /// is cached either way.
    pub async fn fetch_tree(
        &self,
        remote: &dyn RemoteRepo,
        repo: &RepoId,
        tree_id: Option<&str>,
    ) -> RemoteResult<(TreeId, Vec<TreeEntry>)> {
        let tree_id = match tree_id.map(str::to_string).or_else(|| self.get(repo)) {
            Some(t) => t,
            None => remote.default_tree(repo).await?,
        };
        self.set(repo, &tree_id);
        let entries = remote.tree(repo, &tree_id).await?;
        Ok((tree_id, entries))
    }
}
