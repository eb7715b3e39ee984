use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gitdoc_core::RepoId;
use gitdoc_sync::{FileLoader, LoadResult, Notice, Notifier, Wake};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app::{runtime, short, App, GlobalOpts};

/// Prints notices and hands them to the watch loop.
struct ForwardNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

#[async_trait::async_trait]
impl Notifier for ForwardNotifier {
    async fn divergence(&self, repo: &RepoId) {
        println!("{repo}: remote changed");
        let _ = self.tx.send(Notice::Divergence(repo.clone()));
    }

    async fn restore_complete(&self, repo: &RepoId, path: &str) {
        println!("{repo}: restored {path}");
        let _ = self.tx.send(Notice::RestoreComplete(repo.clone(), path.to_string()));
    }
}

fn report(path: &str, result: LoadResult) {
    match result {
        LoadResult::Loaded(content) => match content.text() {
            Some(text) => println!("{path}: {} lines", text.lines().count()),
            None => println!("{path}: {} bytes (binary)", content.bytes.len()),
        },
        LoadResult::Superseded => tracing::debug!(path, "load superseded by a newer one"),
        LoadResult::Failed(e) => tracing::warn!(path, error = %e, "loading open file failed"),
    }
}

/// Forward each line on stdin as a manual wake-up.
fn stdin_wakes(tx: mpsc::Sender<Wake>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if line.is_err() || tx.blocking_send(Wake::Manual).is_err() {
                break;
            }
        }
    });
}

fn ctrlc_cancel(cancel: CancellationToken) {
    let _ = ctrlc::set_handler(move || {
        cancel.cancel();
    });
}

/// Execute `gitdoc watch <repo>`
pub fn execute(
    opts: &GlobalOpts,
    repo: &str,
    interval: Option<u64>,
    open: Option<String>,
) -> Result<()> {
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let app = App::open_with(opts, repo, Arc::new(ForwardNotifier { tx: notice_tx }))?;
    let interval = interval
        .map(|s| Duration::from_secs(s.max(1)))
        .unwrap_or_else(|| app.config.poll_interval());

    let cancel = CancellationToken::new();
    ctrlc_cancel(cancel.clone());
    let (wake_tx, wake_rx) = mpsc::channel(8);
    stdin_wakes(wake_tx);

    eprintln!(
        "Watching {} every {}s. Press Enter to check now, Ctrl-C to stop.",
        app.repo,
        interval.as_secs()
    );
    runtime()?.block_on(run(&app, interval, open, wake_rx, notice_rx, cancel));
    Ok(())
}

async fn run(
    app: &App,
    interval: Duration,
    open: Option<String>,
    wake: mpsc::Receiver<Wake>,
    mut notices: mpsc::UnboundedReceiver<Notice>,
    cancel: CancellationToken,
) {
    let loader = FileLoader::new(app.ctx.remote.clone(), app.repo.clone());
    if let Some(path) = &open {
        report(path, loader.select(path).await);
    }

    let poll = app
        .ctx
        .watch(app.repo.clone(), interval, wake, cancel.clone());

    let react = async {
        loop {
            let notice = tokio::select! {
                _ = cancel.cancelled() => break,
                notice = notices.recv() => match notice {
                    Some(n) => n,
                    None => break,
                },
            };
            let Notice::Divergence(repo) = notice else {
                continue;
            };
            match app.ctx.fetch_tree(&repo, None).await {
                Ok((tree, entries)) => {
                    println!("tree {}  ({} entries)", short(&tree), entries.len())
                }
                Err(e) => tracing::warn!(repo = %repo, error = %e, "reloading tree failed"),
            }
            if let (Some(path), Some(result)) = (&open, loader.reload().await) {
                report(path, result);
            }
        }
    };

    tokio::join!(poll, react);
    tracing::info!(repo = %app.repo, "watch stopped");
}
