//! Scripted in-memory [`RemoteRepo`] for tests.
//!
//! History is kept newest first. Writes and deletes append real commits so a
//! later scan sees them; tests that only exercise scanning can seed history
//! directly with [`FakeRemote::push_commit`].

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{RemoteError, RemoteResult};
use crate::remote::RemoteRepo;
use crate::types::{
    ChangeStatus, CommitId, CommitRef, CommitSummary, EntryKind, FileChange, FileContent,
    FilePatch, RepoId, TreeEntry, TreeId, WriteOutcome, WriteRequest,
};

#[derive(Debug, Clone)]
struct Blob {
    bytes: Vec<u8>,
    sha: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub detail: usize,
    pub content: usize,
    pub write: usize,
    pub head: usize,
    pub default_tree: usize,
    pub tree: usize,
}

#[derive(Default)]
struct FakeState {
    history: Vec<CommitRef>,
    snapshots: HashMap<CommitId, BTreeMap<String, Blob>>,
    patches: HashMap<(CommitId, String), FilePatch>,
    files: BTreeMap<String, Blob>,
    head: CommitId,
    tree: TreeId,
    seq: u64,
    head_script: VecDeque<RemoteResult<CommitId>>,
    head_latency: Duration,
    content_latency: Duration,
    detail_latency: HashMap<CommitId, Duration>,
    failing_details: HashSet<CommitId>,
    fail_next_write: Option<RemoteError>,
    fail_content: Option<RemoteError>,
    calls: CallCounts,
}

impl FakeState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn commit(&mut self, message: String, change: FileChange) -> WriteOutcome {
        let n = self.next_seq();
        let commit_id = format!("commit-{n}");
        let tree_id = format!("tree-{n}");
        let parent_id = self.head.clone();
        self.history.insert(
            0,
            CommitRef {
                id: commit_id.clone(),
                parent_id,
                author: "gitdoc".into(),
                timestamp: String::new(),
                message,
                changes: vec![change],
            },
        );
        self.snapshots.insert(commit_id.clone(), self.files.clone());
        self.head = commit_id.clone();
        self.tree = tree_id.clone();
        WriteOutcome {
            commit_id,
            tree_id,
            file_sha: String::new(),
        }
    }
}

pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        let state = FakeState {
            tree: "tree-0".into(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed history with a commit newer than everything seen so far.
    pub fn push_commit(&self, commit: CommitRef) {
        let mut s = self.lock();
        s.head = commit.id.clone();
        s.history.insert(0, commit);
    }

    /// Seed the content `path` had at `commit_id`.
    pub fn put_content_at(&self, commit_id: &str, path: &str, bytes: &[u8]) {
        let mut s = self.lock();
        let sha = format!("blob-{}", s.next_seq());
        s.snapshots.entry(commit_id.to_string()).or_default().insert(
            path.to_string(),
            Blob {
                bytes: bytes.to_vec(),
                sha,
            },
        );
    }

    /// Seed the patch `commit_id` made to `path`. Touched paths without a
    /// seeded patch report an empty one.
    pub fn put_patch(&self, commit_id: &str, path: &str, patch: FilePatch) {
        self.lock()
            .patches
            .insert((commit_id.to_string(), path.to_string()), patch);
    }

    /// Seed a file in the current tree without creating a commit.
    pub fn put_file(&self, path: &str, bytes: &[u8]) -> String {
        let mut s = self.lock();
        let sha = format!("blob-{}", s.next_seq());
        s.files.insert(
            path.to_string(),
            Blob {
                bytes: bytes.to_vec(),
                sha: sha.clone(),
            },
        );
        sha
    }

    pub fn set_head(&self, head: &str) {
        self.lock().head = head.to_string();
    }

    pub fn set_default_tree(&self, tree: &str) {
        self.lock().tree = tree.to_string();
    }

    /// Queue results for the next `head` calls; afterwards the real head is
    /// returned.
    pub fn script_heads<I>(&self, heads: I)
    where
        I: IntoIterator<Item = RemoteResult<CommitId>>,
    {
        self.lock().head_script.extend(heads);
    }

    pub fn set_head_latency(&self, latency: Duration) {
        self.lock().head_latency = latency;
    }

    pub fn set_content_latency(&self, latency: Duration) {
        self.lock().content_latency = latency;
    }

    pub fn set_detail_latency(&self, commit_id: &str, latency: Duration) {
        self.lock()
            .detail_latency
            .insert(commit_id.to_string(), latency);
    }

    pub fn fail_detail(&self, commit_id: &str) {
        self.lock().failing_details.insert(commit_id.to_string());
    }

    pub fn fail_next_write(&self, err: RemoteError) {
        self.lock().fail_next_write = Some(err);
    }

    pub fn fail_content(&self, err: RemoteError) {
        self.lock().fail_content = Some(err);
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn file_bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).map(|b| b.bytes.clone())
    }

    pub fn head_now(&self) -> CommitId {
        self.lock().head.clone()
    }
}

#[async_trait::async_trait]
impl RemoteRepo for FakeRemote {
    async fn list_commits(
        &self,
        _repo: &RepoId,
        path: Option<&str>,
        limit: usize,
    ) -> RemoteResult<Vec<CommitSummary>> {
        let mut s = self.lock();
        s.calls.list += 1;
        Ok(s.history
            .iter()
            .filter(|c| match path {
                Some(p) => c
                    .changes
                    .iter()
                    .any(|ch| ch.path == p || ch.previous_path.as_deref() == Some(p)),
                None => true,
            })
            .take(limit)
            .map(|c| CommitSummary {
                id: c.id.clone(),
                message: c.message.clone(),
                author: c.author.clone(),
                timestamp: c.timestamp.clone(),
            })
            .collect())
    }

    async fn commit_detail(&self, _repo: &RepoId, commit_id: &str) -> RemoteResult<CommitRef> {
        let (latency, result) = {
            let mut s = self.lock();
            s.calls.detail += 1;
            let latency = s.detail_latency.get(commit_id).copied();
            let result = if s.failing_details.contains(commit_id) {
                Err(RemoteError::Transport(format!("injected failure for {commit_id}")))
            } else {
                s.history
                    .iter()
                    .find(|c| c.id == commit_id)
                    .cloned()
                    .ok_or_else(|| RemoteError::NotFound(commit_id.to_string()))
            };
            (latency, result)
        };
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
        result
    }

    async fn commit_file_patch(
        &self,
        _repo: &RepoId,
        commit_id: &str,
        path: &str,
    ) -> RemoteResult<Option<FilePatch>> {
        let mut s = self.lock();
        s.calls.detail += 1;
        let commit = s
            .history
            .iter()
            .find(|c| c.id == commit_id)
            .ok_or_else(|| RemoteError::NotFound(commit_id.to_string()))?;
        if !commit.changes.iter().any(|ch| ch.path == path) {
            return Ok(None);
        }
        let key = (commit_id.to_string(), path.to_string());
        Ok(Some(s.patches.get(&key).cloned().unwrap_or_default()))
    }

    async fn content_at(
        &self,
        _repo: &RepoId,
        path: &str,
        git_ref: Option<&str>,
    ) -> RemoteResult<FileContent> {
        let (latency, result) = {
            let mut s = self.lock();
            s.calls.content += 1;
            let result = match s.fail_content.take() {
                Some(err) => Err(err),
                None => {
                    let blob = match git_ref {
                        Some(r) => s.snapshots.get(r).and_then(|snap| snap.get(path)),
                        None => s.files.get(path),
                    };
                    blob.map(|b| FileContent {
                        path: path.to_string(),
                        sha: b.sha.clone(),
                        is_text: crate::content::is_text(&b.bytes),
                        bytes: b.bytes.clone(),
                    })
                    .ok_or_else(|| RemoteError::NotFound(path.to_string()))
                }
            };
            (s.content_latency, result)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        result
    }

    async fn write_file(
        &self,
        _repo: &RepoId,
        req: WriteRequest<'_>,
    ) -> RemoteResult<WriteOutcome> {
        let mut s = self.lock();
        s.calls.write += 1;
        if let Some(err) = s.fail_next_write.take() {
            return Err(err);
        }
        let existing = s.files.get(req.path).map(|b| b.sha.clone());
        match (req.prior_sha, existing.as_deref()) {
            (None, Some(_)) => {
                return Err(RemoteError::Conflict {
                    path: req.path.to_string(),
                    detail: "path already exists".into(),
                })
            }
            (Some(prior), Some(current)) if prior != current => {
                return Err(RemoteError::Conflict {
                    path: req.path.to_string(),
                    detail: "sha does not match".into(),
                })
            }
            (Some(_), None) => return Err(RemoteError::NotFound(req.path.to_string())),
            _ => {}
        }
        let sha = format!("blob-{}", s.next_seq());
        s.files.insert(
            req.path.to_string(),
            Blob {
                bytes: req.bytes.to_vec(),
                sha: sha.clone(),
            },
        );
        let status = if existing.is_some() {
            ChangeStatus::Modified
        } else {
            ChangeStatus::Added
        };
        let change = FileChange {
            path: req.path.to_string(),
            status,
            previous_path: None,
        };
        let mut outcome = s.commit(req.message.to_string(), change);
        outcome.file_sha = sha;
        Ok(outcome)
    }

    async fn delete_file(
        &self,
        _repo: &RepoId,
        path: &str,
        sha: &str,
        message: &str,
    ) -> RemoteResult<WriteOutcome> {
        let mut s = self.lock();
        s.calls.write += 1;
        if let Some(err) = s.fail_next_write.take() {
            return Err(err);
        }
        match s.files.get(path) {
            None => return Err(RemoteError::NotFound(path.to_string())),
            Some(b) if b.sha != sha => {
                return Err(RemoteError::Conflict {
                    path: path.to_string(),
                    detail: "sha does not match".into(),
                })
            }
            Some(_) => {}
        }
        s.files.remove(path);
        Ok(s.commit(message.to_string(), FileChange::removed(path)))
    }

    async fn head(&self, _repo: &RepoId) -> RemoteResult<CommitId> {
        let latency = {
            let mut s = self.lock();
            s.calls.head += 1;
            s.head_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut s = self.lock();
        match s.head_script.pop_front() {
            Some(result) => result,
            None => Ok(s.head.clone()),
        }
    }

    async fn default_tree(&self, _repo: &RepoId) -> RemoteResult<TreeId> {
        let mut s = self.lock();
        s.calls.default_tree += 1;
        Ok(s.tree.clone())
    }

    async fn tree(&self, _repo: &RepoId, _tree_id: &str) -> RemoteResult<Vec<TreeEntry>> {
        let mut s = self.lock();
        s.calls.tree += 1;
        Ok(s.files
            .iter()
            .map(|(path, blob)| TreeEntry {
                path: path.clone(),
                kind: EntryKind::File,
                sha: blob.sha.clone(),
                size: Some(blob.bytes.len() as u64),
            })
            .collect())
    }
}
