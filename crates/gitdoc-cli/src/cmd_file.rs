use std::path::Path;

use anyhow::{bail, Context, Result};
use gitdoc_core::{CommitSummary, FilePatch, RemoteError, RepoId};
use gitdoc_sync::SyncContext;

use crate::age::age_now;
use crate::app::{runtime, short, App, GlobalOpts};

/// Sha of the current version of `path`, `None` if it does not exist.
async fn current_sha(ctx: &SyncContext, repo: &RepoId, path: &str) -> Result<Option<String>> {
    match ctx.remote.content_at(repo, path, None).await {
        Ok(content) => Ok(Some(content.sha)),
        Err(RemoteError::NotFound(_)) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading current version of {path}")),
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

fn render_history(commits: &[CommitSummary]) -> String {
    commits
        .iter()
        .map(|c| {
            format!(
                "{}  {:<12}  {}  {}",
                short(&c.id),
                age_now(&c.timestamp),
                c.author,
                first_line(&c.message)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_patch(patch: &FilePatch) -> String {
    let counts = format!("+{} -{}", patch.additions, patch.deletions);
    if patch.patch.is_empty() {
        format!("{counts}\n(no textual diff)")
    } else {
        format!("{counts}\n{}", patch.patch)
    }
}

/// Execute `gitdoc history <repo> <path>`
pub fn history(opts: &GlobalOpts, repo: &str, path: &str, limit: usize, json: bool) -> Result<()> {
    let app = App::open(opts, repo)?;
    let commits = runtime()?.block_on(app.ctx.file_history(&app.repo, path, limit))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&commits)?);
        return Ok(());
    }
    if commits.is_empty() {
        println!("No history for {path}.");
        return Ok(());
    }
    println!("{}", render_history(&commits));
    Ok(())
}

/// Execute `gitdoc history <repo> <path> --patch <commit>`
pub fn patch(opts: &GlobalOpts, repo: &str, path: &str, commit: &str, json: bool) -> Result<()> {
    let app = App::open(opts, repo)?;
    let Some(patch) = runtime()?.block_on(app.ctx.file_patch(&app.repo, commit, path))? else {
        bail!("{} did not change {path}", short(commit));
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&patch)?);
        return Ok(());
    }
    println!("{}", render_patch(&patch));
    Ok(())
}

/// Execute `gitdoc revert <repo> <path> <commit>`
pub fn revert(opts: &GlobalOpts, repo: &str, path: &str, commit: &str) -> Result<()> {
    let app = App::open(opts, repo)?;
    let outcome = runtime()?.block_on(async {
        let sha = current_sha(&app.ctx, &app.repo, path).await?;
        let (outcome, _) = app
            .ctx
            .restore_version(&app.repo, path, commit, sha.as_deref())
            .await?;
        Ok::<_, anyhow::Error>(outcome)
    })?;
    println!(
        "Restored {path} to its version at {} ({})",
        short(commit),
        short(&outcome.commit_id)
    );
    Ok(())
}

/// Execute `gitdoc put <repo> <path> --from <file>`
pub fn put(opts: &GlobalOpts, repo: &str, path: &str, from: &Path) -> Result<()> {
    let bytes =
        std::fs::read(from).with_context(|| format!("reading {}", from.display()))?;
    let app = App::open(opts, repo)?;
    let (created, outcome) = runtime()?.block_on(async {
        let sha = current_sha(&app.ctx, &app.repo, path).await?;
        let outcome = app.ctx.save(&app.repo, path, &bytes, sha.as_deref()).await?;
        Ok::<_, anyhow::Error>((sha.is_none(), outcome))
    })?;
    let verb = if created { "Created" } else { "Updated" };
    println!("{verb} {path} ({})", short(&outcome.commit_id));
    Ok(())
}

/// Execute `gitdoc rm <repo> <path>`
pub fn rm(opts: &GlobalOpts, repo: &str, path: &str) -> Result<()> {
    let app = App::open(opts, repo)?;
    let outcome = runtime()?.block_on(async {
        let sha = current_sha(&app.ctx, &app.repo, path)
            .await?
            .with_context(|| format!("{path} does not exist"))?;
        let outcome = app.ctx.delete(&app.repo, path, &sha).await?;
        Ok::<_, anyhow::Error>(outcome)
    })?;
    println!("Deleted {path} ({})", short(&outcome.commit_id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitdoc_core::testing::FakeRemote;
    use gitdoc_sync::{LogNotifier, SnapshotCache};
    use std::sync::Arc;

    #[test]
    fn history_shows_first_line_only() {
        let commits = vec![CommitSummary {
            id: "0123456789".into(),
            message: "Update a.md\n\nlonger body".into(),
            author: "ada".into(),
            timestamp: String::new(),
        }];
        let out = render_history(&commits);
        assert!(out.starts_with("0123456  "));
        assert!(out.ends_with("ada  Update a.md"));
    }

    #[test]
    fn patch_view_shows_counts_then_diff() {
        let patch = FilePatch {
            additions: 2,
            deletions: 1,
            patch: "@@ -1 +1,2 @@\n-old\n+new\n+more".into(),
        };
        assert_eq!(
            render_patch(&patch),
            "+2 -1\n@@ -1 +1,2 @@\n-old\n+new\n+more"
        );
        assert_eq!(
            render_patch(&FilePatch::default()),
            "+0 -0\n(no textual diff)"
        );
    }

    #[tokio::test]
    async fn current_sha_distinguishes_missing_files() {
        let remote = Arc::new(FakeRemote::new());
        let sha = remote.put_file("a.md", b"x");
        let ctx = SyncContext::new(
            remote.clone(),
            Arc::new(SnapshotCache::in_memory()),
            Arc::new(LogNotifier),
        );
        let repo = RepoId::new("octo", "notes");

        assert_eq!(current_sha(&ctx, &repo, "a.md").await.unwrap(), Some(sha));
        assert_eq!(current_sha(&ctx, &repo, "b.md").await.unwrap(), None);

        remote.fail_content(RemoteError::Unauthorized("expired".into()));
        assert!(current_sha(&ctx, &repo, "a.md").await.is_err());
    }
}
