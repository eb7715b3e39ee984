mod age;
mod app;
mod cmd_deleted;
mod cmd_file;
mod cmd_tree;
mod cmd_watch;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gitdoc",
    version,
    about = "Find and restore deleted files in GitHub-backed document repositories"
)]
struct Cli {
    /// Config file (default: <config_dir>/gitdoc/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Session name; keeps the tree reference between invocations
    /// (default: $GITDOC_SESSION)
    #[arg(long, global = true)]
    session: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List files deleted within the recent history window
    Deleted {
        /// Repository as owner/name
        repo: String,
        /// Number of recent commits to scan
        #[arg(long)]
        window: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore a deleted file from the snapshot before its deletion
    Restore {
        repo: String,
        path: String,
        #[arg(long)]
        window: Option<usize>,
    },
    /// Show commits that touched a file
    History {
        repo: String,
        path: String,
        #[arg(long, default_value = "50")]
        limit: usize,
        /// Show the change this commit made to the file instead
        #[arg(long, value_name = "COMMIT")]
        patch: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Put back the version of a file from an earlier commit
    Revert {
        repo: String,
        path: String,
        /// Commit whose version of the file to restore
        commit: String,
    },
    /// Upload a local file over the remote one (or create it)
    Put {
        repo: String,
        path: String,
        /// Local file to upload
        #[arg(long)]
        from: PathBuf,
    },
    /// Delete a file on the remote
    Rm { repo: String, path: String },
    /// List the repository tree
    Tree {
        repo: String,
        /// Tree to list instead of the cached or default-branch one
        #[arg(long)]
        tree: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Poll the remote HEAD and report remote changes (Enter forces a check)
    Watch {
        repo: String,
        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
        /// File to keep open and reload on remote changes
        #[arg(long)]
        open: Option<String>,
    },
    /// Session storage management
    Session {
        #[command(subcommand)]
        cmd: SessionCmd,
    },
}

#[derive(Subcommand)]
enum SessionCmd {
    /// Remove everything stored for the current session
    Purge,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("GITDOC_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let opts = app::GlobalOpts {
        config: cli.config,
        session: cli.session,
    };

    match cli.cmd {
        Command::Deleted { repo, window, json } => cmd_deleted::list(&opts, &repo, window, json),
        Command::Restore { repo, path, window } => {
            cmd_deleted::restore(&opts, &repo, &path, window)
        }
        Command::History {
            repo,
            path,
            limit,
            patch,
            json,
        } => match patch {
            Some(commit) => cmd_file::patch(&opts, &repo, &path, &commit, json),
            None => cmd_file::history(&opts, &repo, &path, limit, json),
        },
        Command::Revert { repo, path, commit } => cmd_file::revert(&opts, &repo, &path, &commit),
        Command::Put { repo, path, from } => cmd_file::put(&opts, &repo, &path, &from),
        Command::Rm { repo, path } => cmd_file::rm(&opts, &repo, &path),
        Command::Tree { repo, tree, json } => cmd_tree::execute(&opts, &repo, tree.as_deref(), json),
        Command::Watch {
            repo,
            interval,
            open,
        } => cmd_watch::execute(&opts, &repo, interval, open),
        Command::Session { cmd } => match cmd {
            SessionCmd::Purge => app::purge_session(&opts),
        },
    }
}
