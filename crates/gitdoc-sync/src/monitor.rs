use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use gitdoc_core::{CommitId, RemoteRepo, RepoId};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cache::SnapshotCache;
use crate::notify::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Checking,
}

/// What a single HEAD check concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// First successful observation of this repository.
    Initialized(CommitId),
    Unchanged,
    /// Notification fired and the tree reference was cleared.
    Diverged { from: CommitId, to: CommitId },
    /// Another check for this repository was already in flight.
    Skipped,
    /// A local write moved known-HEAD while the fetch was in flight; the
    /// fetched value predates it and was discarded.
    Superseded,
    /// Fetch failed. Known-HEAD untouched; the next tick retries.
    Failed,
}

/// Out-of-band re-check triggers, handled exactly like a timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Focus,
    Visible,
    Manual,
}

#[derive(Debug, Default)]
struct RepoWatch {
    known_head: Option<CommitId>,
    checking: bool,
    /// Bumped by every local write.
    epoch: u64,
}

/// Detects remote HEAD movement per repository.
pub struct StalenessMonitor {
    remote: Arc<dyn RemoteRepo>,
    cache: Arc<SnapshotCache>,
    notifier: Arc<dyn Notifier>,
    watches: Mutex<HashMap<RepoId, RepoWatch>>,
}

/// Returns the repository to `Idle` even if the check future is dropped.
struct CheckingGuard<'a> {
    monitor: &'a StalenessMonitor,
    repo: &'a RepoId,
}

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        if let Some(w) = self.monitor.lock().get_mut(self.repo) {
            w.checking = false;
        }
    }
}

impl StalenessMonitor {
    pub fn new(
        remote: Arc<dyn RemoteRepo>,
        cache: Arc<SnapshotCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            remote,
            cache,
            notifier,
            watches: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RepoId, RepoWatch>> {
        self.watches.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn known_head(&self, repo: &RepoId) -> Option<CommitId> {
        self.lock().get(repo).and_then(|w| w.known_head.clone())
    }

    pub fn state(&self, repo: &RepoId) -> MonitorState {
        match self.lock().get(repo) {
            Some(w) if w.checking => MonitorState::Checking,
            _ => MonitorState::Idle,
        }
    }

    /// Record a HEAD produced by this client's own write so the next poll
    /// does not report it as an external change.
    pub fn note_head(&self, repo: &RepoId, commit_id: &str) {
        if commit_id.is_empty() {
            return;
        }
        let mut watches = self.lock();
        let w = watches.entry(repo.clone()).or_default();
        w.known_head = Some(commit_id.to_string());
        w.epoch += 1;
    }

    /// Drop all state for a repository the consumer stopped viewing.
    pub fn forget(&self, repo: &RepoId) {
        self.lock().remove(repo);
    }

    /// One HEAD comparison. Overlapping calls for the same repository are
    /// dropped; network failures are absorbed.
    pub async fn check(&self, repo: &RepoId) -> CheckOutcome {
        let epoch = {
            let mut watches = self.lock();
            let w = watches.entry(repo.clone()).or_default();
            if w.checking {
                tracing::trace!(repo = %repo, "check already in flight");
                return CheckOutcome::Skipped;
            }
            w.checking = true;
            w.epoch
        };
        let guard = CheckingGuard {
            monitor: self,
            repo,
        };

        let fetched = self.remote.head(repo).await;

        let outcome = {
            let mut watches = self.lock();
            match (fetched, watches.get_mut(repo)) {
                (Err(e), _) => {
                    tracing::debug!(repo = %repo, error = %e, "HEAD poll failed");
                    CheckOutcome::Failed
                }
                (Ok(head), _) if head.is_empty() => CheckOutcome::Unchanged,
                // Forgotten while the fetch was in flight.
                (Ok(_), None) => CheckOutcome::Superseded,
                (Ok(_), Some(w)) if w.epoch != epoch => CheckOutcome::Superseded,
                (Ok(head), Some(w)) => match w.known_head.replace(head.clone()) {
                    None => CheckOutcome::Initialized(head),
                    Some(prev) if prev == head => CheckOutcome::Unchanged,
                    Some(prev) => CheckOutcome::Diverged {
                        from: prev,
                        to: head,
                    },
                },
            }
        };
        drop(guard);

        if let CheckOutcome::Diverged { from, to } = &outcome {
            tracing::info!(repo = %repo, from = %from, to = %to, "remote HEAD diverged");
            self.cache.clear(repo);
            self.notifier.divergence(repo).await;
        }
        outcome
    }
}

/// Poll loop: one check immediately, then one per `interval` tick and one
/// per wake signal, until `cancel` fires. Checks run as tasks so a tick that
/// lands during a slow check is dropped by the in-flight guard.
pub async fn watch(
    monitor: Arc<StalenessMonitor>,
    repo: RepoId,
    interval: Duration,
    mut wake: mpsc::Receiver<Wake>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut checks = JoinSet::new();
    let mut wake_open = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                spawn_check(&mut checks, &monitor, &repo);
            }
            w = wake.recv(), if wake_open => match w {
                Some(w) => {
                    tracing::trace!(repo = %repo, wake = ?w, "wake signal");
                    spawn_check(&mut checks, &monitor, &repo);
                }
                None => wake_open = false,
            },
            Some(done) = checks.join_next(), if !checks.is_empty() => {
                if let Err(e) = done {
                    tracing::warn!(repo = %repo, error = %e, "check task failed");
                }
            }
        }
    }
    checks.shutdown().await;
}

fn spawn_check(checks: &mut JoinSet<CheckOutcome>, monitor: &Arc<StalenessMonitor>, repo: &RepoId) {
    let monitor = Arc::clone(monitor);
    let repo = repo.clone();
    checks.spawn(async move { monitor.check(&repo).await });
}
