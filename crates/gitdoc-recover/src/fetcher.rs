use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gitdoc_core::{CommitId, CommitRef, RemoteRepo, RepoId};
use tokio::task::JoinSet;

/// Fetch the detail of every commit in `ids` with at most `limit` requests
/// in flight.
///
/// The result has one slot per input id, in input order. A failed fetch
/// leaves `None` in its own slot and does not stop the other workers. A
/// `limit` of 0 is treated as 1.
pub async fn fetch_details(
    remote: Arc<dyn RemoteRepo>,
    repo: &RepoId,
    ids: &[CommitId],
    limit: usize,
) -> Vec<Option<CommitRef>> {
    let n = ids.len();
    let mut slots: Vec<Option<CommitRef>> = vec![None; n];
    if n == 0 {
        return slots;
    }

    let workers = limit.max(1).min(n);
    let ids: Arc<[CommitId]> = ids.into();
    let cursor = Arc::new(AtomicUsize::new(0));

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let remote = remote.clone();
        let repo = repo.clone();
        let ids = ids.clone();
        let cursor = cursor.clone();
        set.spawn(async move {
            let mut done = Vec::new();
            loop {
                let idx = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(id) = ids.get(idx) else { break };
                match remote.commit_detail(&repo, id).await {
                    Ok(detail) => done.push((idx, detail)),
                    Err(e) => {
                        tracing::warn!(
                            repo = %repo,
                            commit = %id,
                            error = %e,
                            "commit detail fetch failed"
                        );
                    }
                }
            }
            done
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(done) => {
                for (idx, detail) in done {
                    slots[idx] = Some(detail);
                }
            }
            Err(e) => tracing::warn!(error = %e, "detail worker did not finish"),
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitdoc_core::testing::FakeRemote;
    use gitdoc_core::FileChange;
    use rand::Rng;
    use std::time::Duration;

    fn repo() -> RepoId {
        RepoId::new("octo", "notes")
    }

    fn seed(remote: &FakeRemote, count: usize) -> Vec<CommitId> {
        let mut parent = String::new();
        let mut ids = Vec::new();
        for i in 0..count {
            let id = format!("c{i}");
            remote.push_commit(CommitRef {
                id: id.clone(),
                parent_id: parent.clone(),
                author: "ada".into(),
                timestamp: String::new(),
                message: format!("edit {i}"),
                changes: vec![FileChange::modified(&format!("f{i}.md"))],
            });
            parent = id.clone();
            ids.push(id);
        }
        ids.reverse();
        ids
    }

    #[tokio::test]
    async fn results_follow_input_order_under_random_latency() {
        let remote = Arc::new(FakeRemote::new());
        let ids = seed(&remote, 10);
        {
            let mut rng = rand::thread_rng();
            for id in &ids {
                remote.set_detail_latency(id, Duration::from_millis(rng.gen_range(0..25)));
            }
        }

        let details = fetch_details(remote.clone(), &repo(), &ids, 6).await;
        assert_eq!(details.len(), 10);
        for (id, detail) in ids.iter().zip(&details) {
            assert_eq!(&detail.as_ref().unwrap().id, id);
        }
        assert_eq!(remote.calls().detail, 10);
    }

    #[tokio::test]
    async fn failure_is_absent_only_at_its_index() {
        let remote = Arc::new(FakeRemote::new());
        let ids = seed(&remote, 5);
        remote.fail_detail(&ids[2]);

        let details = fetch_details(remote, &repo(), &ids, 3).await;
        assert!(details[2].is_none());
        for i in [0, 1, 3, 4] {
            assert_eq!(details[i].as_ref().unwrap().id, ids[i]);
        }
    }

    #[tokio::test]
    async fn zero_limit_still_fetches_everything() {
        let remote = Arc::new(FakeRemote::new());
        let ids = seed(&remote, 3);

        let details = fetch_details(remote, &repo(), &ids, 0).await;
        assert!(details.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn empty_input_makes_no_requests() {
        let remote = Arc::new(FakeRemote::new());
        let details = fetch_details(remote.clone(), &repo(), &[], 6).await;
        assert!(details.is_empty());
        assert_eq!(remote.calls().detail, 0);
    }
}
