use std::sync::Arc;
use std::time::Duration;

use gitdoc_core::{
    delete_message, restore_message, update_message, CommitSummary, FileContent, FilePatch,
    RemoteRepo, RemoteResult, RepoId, TreeEntry, TreeId, WriteOutcome, WriteRequest,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cache::SnapshotCache;
use crate::monitor::{self, StalenessMonitor, Wake};
use crate::notify::Notifier;

/// Everything the engine shares across operations, keyed by repository
/// inside each component. Constructed once per client session and passed
/// by reference.
pub struct SyncContext {
    pub remote: Arc<dyn RemoteRepo>,
    pub cache: Arc<SnapshotCache>,
    pub monitor: Arc<StalenessMonitor>,
    pub notifier: Arc<dyn Notifier>,
}

impl SyncContext {
    pub fn new(
        remote: Arc<dyn RemoteRepo>,
        cache: Arc<SnapshotCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let monitor = Arc::new(StalenessMonitor::new(
            remote.clone(),
            cache.clone(),
            notifier.clone(),
        ));
        Self {
            remote,
            cache,
            monitor,
            notifier,
        }
    }

    /// Bookkeeping after any successful local mutation: cache the new tree
    /// and make the monitor expect the new HEAD.
    pub fn record_write(&self, repo: &RepoId, outcome: &WriteOutcome) {
        self.cache.set(repo, &outcome.tree_id);
        self.monitor.note_head(repo, &outcome.commit_id);
        tracing::debug!(
            repo = %repo,
            commit = %outcome.commit_id,
            tree = %outcome.tree_id,
            "recorded local write"
        );
    }

    pub async fn fetch_tree(
        &self,
        repo: &RepoId,
        tree_id: Option<&str>,
    ) -> RemoteResult<(TreeId, Vec<TreeEntry>)> {
        self.cache.fetch_tree(self.remote.as_ref(), repo, tree_id).await
    }

    /// Write `bytes` over the version identified by `prior_sha`; `None`
    /// creates a new file.
    pub async fn save(
        &self,
        repo: &RepoId,
        path: &str,
        bytes: &[u8],
        prior_sha: Option<&str>,
    ) -> RemoteResult<WriteOutcome> {
        let message = update_message(path);
        let outcome = self
            .remote
            .write_file(
                repo,
                WriteRequest {
                    path,
                    bytes,
                    prior_sha,
                    message: &message,
                },
            )
            .await?;
        self.record_write(repo, &outcome);
        Ok(outcome)
    }

    pub async fn delete(&self, repo: &RepoId, path: &str, sha: &str) -> RemoteResult<WriteOutcome> {
        let outcome = self
            .remote
            .delete_file(repo, path, sha, &delete_message(path))
            .await?;
        self.record_write(repo, &outcome);
        Ok(outcome)
    }

    /// Commits touching `path`, newest first.
    pub async fn file_history(
        &self,
        repo: &RepoId,
        path: &str,
        limit: usize,
    ) -> RemoteResult<Vec<CommitSummary>> {
        self.remote.list_commits(repo, Some(path), limit).await
    }

    pub async fn file_patch(
        &self,
        repo: &RepoId,
        commit_id: &str,
        path: &str,
    ) -> RemoteResult<Option<FilePatch>> {
        self.remote.commit_file_patch(repo, commit_id, path).await
    }

    /// Put back the version of `path` from `commit_id` over the current one
    /// (`current_sha`). Returns the write and the content now in place.
    pub async fn restore_version(
        &self,
        repo: &RepoId,
        path: &str,
        commit_id: &str,
        current_sha: Option<&str>,
    ) -> RemoteResult<(WriteOutcome, FileContent)> {
        let old = self.remote.content_at(repo, path, Some(commit_id)).await?;
        let message = restore_message(path);
        let outcome = self
            .remote
            .write_file(
                repo,
                WriteRequest {
                    path,
                    bytes: &old.bytes,
                    prior_sha: current_sha,
                    message: &message,
                },
            )
            .await?;
        self.record_write(repo, &outcome);
        let restored = FileContent {
            sha: outcome.file_sha.clone(),
            ..old
        };
        Ok((outcome, restored))
    }

    /// Run the HEAD poll loop for `repo` until `cancel` fires.
    pub async fn watch(
        &self,
        repo: RepoId,
        interval: Duration,
        wake: mpsc::Receiver<Wake>,
        cancel: CancellationToken,
    ) {
        monitor::watch(self.monitor.clone(), repo, interval, wake, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::CheckOutcome;
    use crate::notify::CollectNotifier;
    use gitdoc_core::testing::FakeRemote;
    use gitdoc_core::RemoteError;

    fn repo() -> RepoId {
        RepoId::new("octo", "notes")
    }

    fn setup() -> (Arc<FakeRemote>, Arc<CollectNotifier>, SyncContext) {
        let remote = Arc::new(FakeRemote::new());
        let notifier = Arc::new(CollectNotifier::new());
        let ctx = SyncContext::new(
            remote.clone(),
            Arc::new(SnapshotCache::in_memory()),
            notifier.clone(),
        );
        (remote, notifier, ctx)
    }

    #[tokio::test]
    async fn save_updates_cache_and_known_head() {
        let (remote, notifier, ctx) = setup();
        let sha = remote.put_file("a.md", b"v1");
        ctx.monitor.check(&repo()).await;

        let outcome = ctx.save(&repo(), "a.md", b"v2", Some(&sha)).await.unwrap();
        assert_eq!(ctx.cache.get(&repo()), Some(outcome.tree_id.clone()));
        assert_eq!(ctx.monitor.known_head(&repo()), Some(outcome.commit_id));

        assert_eq!(ctx.monitor.check(&repo()).await, CheckOutcome::Unchanged);
        assert_eq!(notifier.divergences(), 0);
    }

    #[tokio::test]
    async fn stale_save_is_conflict_and_changes_nothing() {
        let (remote, _notifier, ctx) = setup();
        remote.put_file("a.md", b"v1");
        ctx.cache.set(&repo(), "tree-before");

        let err = ctx
            .save(&repo(), "a.md", b"v2", Some("outdated"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(ctx.cache.get(&repo()).as_deref(), Some("tree-before"));
        assert_eq!(ctx.monitor.known_head(&repo()), None);
    }

    #[tokio::test]
    async fn delete_records_write() {
        let (remote, _notifier, ctx) = setup();
        let sha = remote.put_file("a.md", b"v1");

        let outcome = ctx.delete(&repo(), "a.md", &sha).await.unwrap();
        assert!(remote.file_bytes("a.md").is_none());
        assert_eq!(ctx.cache.get(&repo()), Some(outcome.tree_id));
    }

    #[tokio::test]
    async fn restore_version_writes_old_content() {
        let (remote, _notifier, ctx) = setup();
        let v1 = remote.put_file("a.md", b"first");
        let first = ctx.save(&repo(), "a.md", b"first!", Some(&v1)).await.unwrap();
        let current = remote.put_file("a.md", b"second");

        let (outcome, restored) = ctx
            .restore_version(&repo(), "a.md", &first.commit_id, Some(&current))
            .await
            .unwrap();
        assert_eq!(remote.file_bytes("a.md").unwrap(), b"first!");
        assert_eq!(restored.sha, outcome.file_sha);
        assert_eq!(ctx.monitor.known_head(&repo()), Some(outcome.commit_id));
    }

    #[tokio::test]
    async fn restore_version_missing_ref_fails_cleanly() {
        let (remote, _notifier, ctx) = setup();
        let sha = remote.put_file("a.md", b"now");

        let err = ctx
            .restore_version(&repo(), "a.md", "no-such-commit", Some(&sha))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(_)));
        assert_eq!(remote.calls().write, 0);
        assert_eq!(ctx.cache.get(&repo()), None);
    }

    #[tokio::test]
    async fn history_filters_by_path() {
        let (_remote, _notifier, ctx) = setup();
        ctx.save(&repo(), "a.md", b"a", None).await.unwrap();
        ctx.save(&repo(), "b.md", b"b", None).await.unwrap();

        let commits = ctx.file_history(&repo(), "a.md", 50).await.unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "Update a.md");
    }

    #[tokio::test]
    async fn file_patch_for_history_entry() {
        let (remote, _notifier, ctx) = setup();
        let outcome = ctx.save(&repo(), "a.md", b"a", None).await.unwrap();
        ctx.save(&repo(), "b.md", b"b", None).await.unwrap();
        let patch = FilePatch {
            additions: 1,
            deletions: 0,
            patch: "@@ -0,0 +1 @@\n+a".into(),
        };
        remote.put_patch(&outcome.commit_id, "a.md", patch.clone());

        let commits = ctx.file_history(&repo(), "a.md", 50).await.unwrap();
        assert_eq!(
            ctx.file_patch(&repo(), &commits[0].id, "a.md").await.unwrap(),
            Some(patch)
        );
        assert_eq!(
            ctx.file_patch(&repo(), &commits[0].id, "b.md").await.unwrap(),
            None
        );
        assert!(ctx.file_patch(&repo(), "nope", "a.md").await.is_err());
    }
}
