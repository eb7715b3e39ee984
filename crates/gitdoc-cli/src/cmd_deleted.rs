use anyhow::{bail, Result};
use gitdoc_core::DeletionRecord;
use gitdoc_recover::{restore_deleted, DeletedFiles};

use crate::age::age_now;
use crate::app::{runtime, short, App, GlobalOpts};

async fn scan(app: &App, window: usize) -> Result<DeletedFiles> {
    let deleted = DeletedFiles::new();
    deleted
        .refresh(
            app.ctx.remote.clone(),
            &app.repo,
            window,
            app.config.detail_concurrency,
        )
        .await?;
    Ok(deleted)
}

fn render(records: &[DeletionRecord]) -> String {
    let width = records.iter().map(|r| r.path.len()).max().unwrap_or(0);
    records
        .iter()
        .map(|r| {
            format!(
                "{:<width$}  {} deleted {}  ({})",
                r.path,
                r.author,
                age_now(&r.timestamp),
                short(&r.commit_id),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Execute `gitdoc deleted <repo>`
pub fn list(opts: &GlobalOpts, repo: &str, window: Option<usize>, json: bool) -> Result<()> {
    let app = App::open(opts, repo)?;
    let window = app.window(window);
    let deleted = runtime()?.block_on(scan(&app, window))?;
    let records = deleted.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No files deleted in the last {window} commits.");
        return Ok(());
    }
    println!("{}", render(&records));
    Ok(())
}

/// Execute `gitdoc restore <repo> <path>`
pub fn restore(opts: &GlobalOpts, repo: &str, path: &str, window: Option<usize>) -> Result<()> {
    let app = App::open(opts, repo)?;
    let window = app.window(window);

    let outcome = runtime()?.block_on(async {
        let deleted = scan(&app, window).await?;
        let Some(record) = deleted.get(path) else {
            bail!("{path} is not among the files deleted in the last {window} commits");
        };
        match restore_deleted(&app.ctx, &deleted, &app.repo, &record).await {
            Ok(outcome) => Ok::<_, anyhow::Error>(outcome),
            Err(e) if e.is_conflict() => {
                bail!("{path} exists again on the remote; nothing was restored")
            }
            Err(e) => Err(e.into()),
        }
    })?;

    println!("Restored {} ({})", outcome.path, short(&outcome.commit_id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_aligns_paths() {
        let records = vec![
            DeletionRecord {
                path: "a.md".into(),
                commit_id: "0123456789".into(),
                parent_id: "p".into(),
                author: "ada".into(),
                timestamp: String::new(),
            },
            DeletionRecord {
                path: "notes/long.md".into(),
                commit_id: "abcdef0123".into(),
                parent_id: "p".into(),
                author: "bob".into(),
                timestamp: String::new(),
            },
        ];
        let out = render(&records);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines[0],
            "a.md           ada deleted at an unknown time  (0123456)"
        );
        assert!(lines[1].starts_with("notes/long.md  bob deleted"));
    }
}
