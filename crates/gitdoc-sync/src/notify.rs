use gitdoc_core::RepoId;

/// Callbacks into the surrounding application.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Remote HEAD moved out-of-band; the consumer should reload.
    async fn divergence(&self, repo: &RepoId);

    /// A deleted file was written back.
    async fn restore_complete(&self, repo: &RepoId, path: &str);
}

/// Logs through `tracing`.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn divergence(&self, repo: &RepoId) {
        tracing::info!(repo = %repo, "remote changed");
    }

    async fn restore_complete(&self, repo: &RepoId, path: &str) {
        tracing::info!(repo = %repo, path, "restored");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Divergence(RepoId),
    RestoreComplete(RepoId, String),
}

/// Collects notices in memory (for testing).
#[derive(Default)]
pub struct CollectNotifier {
    notices: std::sync::Mutex<Vec<Notice>>,
}

impl CollectNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn divergences(&self) -> usize {
        self.notices()
            .iter()
            .filter(|n| matches!(n, Notice::Divergence(_)))
            .count()
    }

    fn push(&self, notice: Notice) {
        if let Ok(mut n) = self.notices.lock() {
            n.push(notice);
        }
    }
}

#[async_trait::async_trait]
impl Notifier for CollectNotifier {
    async fn divergence(&self, repo: &RepoId) {
        self.push(Notice::Divergence(repo.clone()));
    }

    async fn restore_complete(&self, repo: &RepoId, path: &str) {
        self.push(Notice::RestoreComplete(repo.clone(), path.to_string()));
    }
}
