use std::fmt;

use gitdoc_core::{
    restore_message, CommitId, DeletionRecord, RemoteError, RepoId, TreeId, WriteRequest,
};
use gitdoc_sync::SyncContext;
use thiserror::Error;

use crate::deleted::DeletedFiles;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    FetchContent,
    Write,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreStage::FetchContent => f.write_str("fetching content"),
            RestoreStage::Write => f.write_str("writing"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("a restore of {path} is already running")]
    InFlight { path: String },

    #[error("restoring {path} failed while {stage}: {source}")]
    Failed {
        path: String,
        stage: RestoreStage,
        #[source]
        source: RemoteError,
    },
}

impl RestoreError {
    pub fn path(&self) -> &str {
        match self {
            RestoreError::InFlight { path } | RestoreError::Failed { path, .. } => path,
        }
    }

    /// The path exists again on the remote, or changed under us.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RestoreError::Failed { source, .. } if source.is_conflict())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, RestoreError::Failed { source, .. } if source.is_auth())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub path: String,
    pub commit_id: CommitId,
    pub tree_id: TreeId,
}

/// Bring back a deleted file with the content it had in the snapshot before
/// its removal.
///
/// The write is create-only, so a file that reappeared since the scan fails
/// with a conflict. On failure nothing changes and the record stays listed.
pub async fn restore_deleted(
    ctx: &SyncContext,
    deleted: &DeletedFiles,
    repo: &RepoId,
    record: &DeletionRecord,
) -> Result<RestoreOutcome, RestoreError> {
    let path = record.path.as_str();
    let _ticket = deleted
        .begin_restore(path)
        .ok_or_else(|| RestoreError::InFlight {
            path: path.to_string(),
        })?;

    let failed = |stage: RestoreStage| {
        move |source: RemoteError| {
            tracing::warn!(repo = %repo, path, %stage, error = %source, "restore failed");
            RestoreError::Failed {
                path: path.to_string(),
                stage,
                source,
            }
        }
    };

    let content = ctx
        .remote
        .content_at(repo, path, Some(&record.parent_id))
        .await
        .map_err(failed(RestoreStage::FetchContent))?;

    let message = restore_message(path);
    let outcome = ctx
        .remote
        .write_file(
            repo,
            WriteRequest {
                path,
                bytes: &content.bytes,
                prior_sha: None,
                message: &message,
            },
        )
        .await
        .map_err(failed(RestoreStage::Write))?;

    ctx.record_write(repo, &outcome);
    deleted.remove(path);
    ctx.notifier.restore_complete(repo, path).await;
    tracing::info!(repo = %repo, path, commit = %outcome.commit_id, "restored deleted file");

    Ok(RestoreOutcome {
        path: path.to_string(),
        commit_id: outcome.commit_id,
        tree_id: outcome.tree_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitdoc_core::testing::FakeRemote;
    use gitdoc_core::{CommitRef, FileChange};
    use gitdoc_sync::{CollectNotifier, Notice, SnapshotCache};
    use std::sync::Arc;
    use std::time::Duration;

    fn repo() -> RepoId {
        RepoId::new("octo", "notes")
    }

    struct Fixture {
        remote: Arc<FakeRemote>,
        notifier: Arc<CollectNotifier>,
        ctx: Arc<SyncContext>,
        deleted: Arc<DeletedFiles>,
    }

    /// `notes/a.md` added in P1 and removed in C2.
    async fn fixture() -> Fixture {
        let remote = Arc::new(FakeRemote::new());
        remote.push_commit(CommitRef {
            id: "P1".into(),
            parent_id: "P0".into(),
            author: "ada".into(),
            timestamp: "2024-03-01T10:00:00Z".into(),
            message: "add a".into(),
            changes: vec![FileChange::added("notes/a.md")],
        });
        remote.put_content_at("P1", "notes/a.md", b"# a\n");
        remote.push_commit(CommitRef {
            id: "C2".into(),
            parent_id: "P1".into(),
            author: "bob".into(),
            timestamp: "2024-03-02T10:00:00Z".into(),
            message: "remove a".into(),
            changes: vec![FileChange::removed("notes/a.md")],
        });

        let notifier = Arc::new(CollectNotifier::new());
        let ctx = Arc::new(SyncContext::new(
            remote.clone(),
            Arc::new(SnapshotCache::in_memory()),
            notifier.clone(),
        ));
        let deleted = Arc::new(DeletedFiles::new());
        deleted.refresh(remote.clone(), &repo(), 100, 6).await.unwrap();
        Fixture {
            remote,
            notifier,
            ctx,
            deleted,
        }
    }

    #[tokio::test]
    async fn restore_removes_record_and_caches_tree() {
        let f = fixture().await;
        let record = f.deleted.get("notes/a.md").unwrap();
        assert_eq!(record.parent_id, "P1");
        assert_eq!(record.author, "bob");

        let outcome = restore_deleted(&f.ctx, &f.deleted, &repo(), &record)
            .await
            .unwrap();
        assert!(f.deleted.get("notes/a.md").is_none());
        assert_eq!(f.ctx.cache.get(&repo()), Some(outcome.tree_id.clone()));
        assert_eq!(f.ctx.monitor.known_head(&repo()), Some(outcome.commit_id));
        assert_eq!(f.remote.file_bytes("notes/a.md").unwrap(), b"# a\n");
        assert_eq!(
            f.notifier.notices(),
            vec![Notice::RestoreComplete(repo(), "notes/a.md".into())]
        );
    }

    #[tokio::test]
    async fn restored_file_is_not_found_again_by_rescan() {
        let f = fixture().await;
        let record = f.deleted.get("notes/a.md").unwrap();
        restore_deleted(&f.ctx, &f.deleted, &repo(), &record)
            .await
            .unwrap();

        f.deleted
            .refresh(f.remote.clone(), &repo(), 100, 6)
            .await
            .unwrap();
        assert!(f.deleted.is_empty());
    }

    #[tokio::test]
    async fn content_failure_keeps_record() {
        let f = fixture().await;
        let record = f.deleted.get("notes/a.md").unwrap();
        f.remote
            .fail_content(RemoteError::Transport("connection reset".into()));

        let err = restore_deleted(&f.ctx, &f.deleted, &repo(), &record)
            .await
            .unwrap_err();
        match &err {
            RestoreError::Failed { path, stage, .. } => {
                assert_eq!(path, "notes/a.md");
                assert_eq!(*stage, RestoreStage::FetchContent);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(f.deleted.get("notes/a.md").is_some());
        assert!(!f.deleted.is_restoring("notes/a.md"));
        assert_eq!(f.remote.calls().write, 0);
        assert_eq!(f.ctx.cache.get(&repo()), None);
        assert!(f.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn existing_path_is_a_write_conflict() {
        let f = fixture().await;
        let record = f.deleted.get("notes/a.md").unwrap();
        f.remote.put_file("notes/a.md", b"someone re-created it");

        let err = restore_deleted(&f.ctx, &f.deleted, &repo(), &record)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(matches!(
            err,
            RestoreError::Failed {
                stage: RestoreStage::Write,
                ..
            }
        ));
        assert!(f.deleted.get("notes/a.md").is_some());
        assert_eq!(
            f.remote.file_bytes("notes/a.md").unwrap(),
            b"someone re-created it"
        );
    }

    #[tokio::test]
    async fn auth_failure_is_surfaced() {
        let f = fixture().await;
        let record = f.deleted.get("notes/a.md").unwrap();
        f.remote
            .fail_next_write(RemoteError::Unauthorized("bad credentials".into()));

        let err = restore_deleted(&f.ctx, &f.deleted, &repo(), &record)
            .await
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.path(), "notes/a.md");
    }

    #[tokio::test]
    async fn concurrent_restore_of_same_path_is_rejected() {
        let f = fixture().await;
        let record = f.deleted.get("notes/a.md").unwrap();
        f.remote.set_content_latency(Duration::from_millis(50));

        let first = {
            let ctx = f.ctx.clone();
            let deleted = f.deleted.clone();
            let record = record.clone();
            tokio::spawn(async move { restore_deleted(&ctx, &deleted, &repo(), &record).await })
        };
        for _ in 0..200 {
            if f.deleted.is_restoring("notes/a.md") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let second = restore_deleted(&f.ctx, &f.deleted, &repo(), &record).await;
        assert!(matches!(second, Err(RestoreError::InFlight { .. })));

        assert!(first.await.unwrap().is_ok());
        assert!(!f.deleted.is_restoring("notes/a.md"));
        assert_eq!(f.remote.calls().write, 1);
    }
}
