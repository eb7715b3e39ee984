use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use gitdoc_core::config::token_from_env;
use gitdoc_core::{GitdocConfig, RepoId};
use gitdoc_github::GithubRemote;
use gitdoc_sync::{FileSessionStore, LogNotifier, Notifier, SnapshotCache, SyncContext};

const SESSION_ENV: &str = "GITDOC_SESSION";

/// Options shared by every subcommand.
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub session: Option<String>,
}

impl GlobalOpts {
    fn session(&self) -> Option<String> {
        self.session
            .clone()
            .or_else(|| std::env::var(SESSION_ENV).ok())
            .filter(|s| !s.trim().is_empty())
    }
}

/// A resolved repository plus everything needed to talk to it.
pub struct App {
    pub config: GitdocConfig,
    pub repo: RepoId,
    pub ctx: SyncContext,
}

pub fn parse_repo(s: &str) -> Result<RepoId> {
    RepoId::parse(s).with_context(|| format!("expected a repository as owner/name, got {s:?}"))
}

fn snapshot_cache(opts: &GlobalOpts) -> SnapshotCache {
    match opts.session() {
        Some(session) => {
            let root = gitdoc_store::store_root();
            SnapshotCache::new(Box::new(FileSessionStore::open(&root, &session)))
        }
        None => SnapshotCache::in_memory(),
    }
}

impl App {
    pub fn open(opts: &GlobalOpts, repo: &str) -> Result<Self> {
        Self::open_with(opts, repo, Arc::new(LogNotifier))
    }

    pub fn open_with(opts: &GlobalOpts, repo: &str, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let repo = parse_repo(repo)?;
        let config = GitdocConfig::load_or_default(opts.config.as_deref())?;
        let token = token_from_env()
            .context("no API token: set GITDOC_TOKEN or GITHUB_TOKEN")?;
        let remote = GithubRemote::new(&config.api_base, token)?;
        let ctx = SyncContext::new(Arc::new(remote), Arc::new(snapshot_cache(opts)), notifier);
        Ok(Self { config, repo, ctx })
    }

    pub fn window(&self, override_window: Option<usize>) -> usize {
        override_window.unwrap_or(self.config.history_window)
    }
}

/// Execute `gitdoc session purge`
pub fn purge_session(opts: &GlobalOpts) -> Result<()> {
    let Some(session) = opts.session() else {
        println!("No session selected (use --session or {SESSION_ENV}).");
        return Ok(());
    };
    gitdoc_store::purge_session(&gitdoc_store::store_root(), &session)?;
    println!("Purged session {session}.");
    Ok(())
}

/// Short form of a commit id for display.
pub fn short(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("starting async runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repo_reports_bad_input() {
        assert_eq!(parse_repo("octo/notes").unwrap().to_string(), "octo/notes");
        let err = parse_repo("notes").unwrap_err();
        assert!(err.to_string().contains("owner/name"));
    }

    #[test]
    fn short_id() {
        assert_eq!(short("0123456789abcdef"), "0123456");
        assert_eq!(short("abc"), "abc");
    }
}
