use anyhow::Result;
use gitdoc_core::{EntryKind, TreeEntry};

use crate::app::{runtime, short, App, GlobalOpts};

fn render(entries: &[TreeEntry]) -> String {
    entries
        .iter()
        .map(|e| match e.kind {
            EntryKind::Dir => format!("{}/", e.path),
            EntryKind::File => match e.size {
                Some(size) => format!("{}  {size} B", e.path),
                None => e.path.clone(),
            },
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Execute `gitdoc tree <repo>`
pub fn execute(opts: &GlobalOpts, repo: &str, tree: Option<&str>, json: bool) -> Result<()> {
    let app = App::open(opts, repo)?;
    let (tree_id, entries) = runtime()?.block_on(app.ctx.fetch_tree(&app.repo, tree))?;

    if json {
        let out = serde_json::json!({ "tree": tree_id, "entries": entries });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    println!("tree {}  ({} entries)", short(&tree_id), entries.len());
    if !entries.is_empty() {
        println!("{}", render(&entries));
    }
    Ok(())
}
