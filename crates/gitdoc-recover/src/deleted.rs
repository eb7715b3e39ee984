use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use gitdoc_core::{DeletionRecord, RemoteRepo, RemoteResult, RepoId};

use crate::scanner::find_deleted;

/// Live set of deleted paths for one repository, plus the paths currently
/// being restored.
#[derive(Debug, Default)]
pub struct DeletedFiles {
    records: Mutex<Vec<DeletionRecord>>,
    restoring: Mutex<HashSet<String>>,
}

/// Marks a path as being restored until dropped.
#[derive(Debug)]
pub struct RestoreTicket<'a> {
    owner: &'a DeletedFiles,
    path: String,
}

impl Drop for RestoreTicket<'_> {
    fn drop(&mut self) {
        lock(&self.owner.restoring).remove(&self.path);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl DeletedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan the newest `window` commits and replace the set.
    pub async fn refresh(
        &self,
        remote: Arc<dyn RemoteRepo>,
        repo: &RepoId,
        window: usize,
        concurrency: usize,
    ) -> RemoteResult<usize> {
        let records = find_deleted(remote, repo, window, concurrency).await?;
        let count = records.len();
        self.replace(records);
        Ok(count)
    }

    pub fn replace(&self, records: Vec<DeletionRecord>) {
        *lock(&self.records) = records;
    }

    pub fn list(&self) -> Vec<DeletionRecord> {
        lock(&self.records).clone()
    }

    pub fn get(&self, path: &str) -> Option<DeletionRecord> {
        lock(&self.records).iter().find(|r| r.path == path).cloned()
    }

    pub fn remove(&self, path: &str) -> Option<DeletionRecord> {
        let mut records = lock(&self.records);
        let idx = records.iter().position(|r| r.path == path)?;
        Some(records.remove(idx))
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_restoring(&self, path: &str) -> bool {
        lock(&self.restoring).contains(path)
    }

    /// Claim `path` for a restore. `None` if one is already running.
    pub fn begin_restore(&self, path: &str) -> Option<RestoreTicket<'_>> {
        if !lock(&self.restoring).insert(path.to_string()) {
            return None;
        }
        Some(RestoreTicket {
            owner: self,
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> DeletionRecord {
        DeletionRecord {
            path: path.into(),
            commit_id: "c2".into(),
            parent_id: "c1".into(),
            author: "ada".into(),
            timestamp: String::new(),
        }
    }

    #[test]
    fn replace_get_remove() {
        let set = DeletedFiles::new();
        set.replace(vec![record("a.md"), record("b.md")]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("b.md").unwrap().path, "b.md");

        assert!(set.remove("a.md").is_some());
        assert!(set.remove("a.md").is_none());
        assert_eq!(set.list(), vec![record("b.md")]);
    }

    #[test]
    fn ticket_is_exclusive_until_dropped() {
        let set = DeletedFiles::new();
        let ticket = set.begin_restore("a.md").unwrap();
        assert!(set.is_restoring("a.md"));
        assert!(set.begin_restore("a.md").is_none());
        assert!(set.begin_restore("b.md").is_some());

        drop(ticket);
        assert!(!set.is_restoring("a.md"));
        assert!(set.begin_restore("a.md").is_some());
    }
}
