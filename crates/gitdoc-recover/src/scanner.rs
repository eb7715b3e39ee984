//! Reconcile recent history into the set of currently deleted paths.
//!
//! Commits are walked newest to oldest. The first change seen for a path
//! decides it: a removal (in a commit with a parent) makes a record, anything
//! else marks the path as still alive. A rename marks both sides alive, so a
//! rename newer than a removal of its old name hides that removal even though
//! the content now lives elsewhere.

use std::collections::HashSet;
use std::sync::Arc;

use gitdoc_core::{ChangeStatus, CommitRef, DeletionRecord, RemoteRepo, RemoteResult, RepoId};

use crate::fetcher::fetch_details;

/// Deletion records for `details` (newest first). Absent details are
/// skipped. Records come out newest removal first, one per path.
pub fn scan(details: &[Option<CommitRef>]) -> Vec<DeletionRecord> {
    let mut touched: HashSet<&str> = HashSet::new();
    let mut recorded: HashSet<&str> = HashSet::new();
    let mut records = Vec::new();

    for commit in details.iter().flatten() {
        for change in &commit.changes {
            match change.status {
                ChangeStatus::Removed => {
                    let path = change.path.as_str();
                    if !touched.contains(path) && commit.has_parent() && recorded.insert(path) {
                        records.push(DeletionRecord {
                            path: path.to_string(),
                            commit_id: commit.id.clone(),
                            parent_id: commit.parent_id.clone(),
                            author: commit.author.clone(),
                            timestamp: commit.timestamp.clone(),
                        });
                    }
                    touched.insert(path);
                }
                ChangeStatus::Renamed => {
                    if let Some(prev) = change.previous_path.as_deref() {
                        touched.insert(prev);
                    }
                    touched.insert(&change.path);
                }
                ChangeStatus::Added | ChangeStatus::Modified => {
                    touched.insert(&change.path);
                }
            }
        }
    }
    records
}

/// List the newest `window` commits, fetch their details `concurrency` at a
/// time, and scan them.
///
/// A failed listing is returned as an error; failed detail fetches only
/// narrow the scan.
pub async fn find_deleted(
    remote: Arc<dyn RemoteRepo>,
    repo: &RepoId,
    window: usize,
    concurrency: usize,
) -> RemoteResult<Vec<DeletionRecord>> {
    let listed = remote.list_commits(repo, None, window).await?;
    let ids: Vec<_> = listed.into_iter().map(|c| c.id).collect();
    let details = fetch_details(remote, repo, &ids, concurrency).await;
    let missing = details.iter().filter(|d| d.is_none()).count();
    let records = scan(&details);
    tracing::info!(
        repo = %repo,
        commits = ids.len(),
        missing,
        deleted = records.len(),
        "deletion scan finished"
    );
    Ok(records)
}
