//! GitHub REST response shapes and their mapping onto the gitdoc model.

use gitdoc_core::content::file_content_from_base64;
use gitdoc_core::{
    ChangeStatus, CommitRef, CommitSummary, EntryKind, FileChange, FileContent, FilePatch,
    RemoteError, TreeEntry, WriteOutcome,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ShaRef {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRef {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitPerson {
    pub name: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitBody {
    #[serde(default)]
    pub message: String,
    pub author: Option<GitPerson>,
}

/// An entry of `GET /repos/{o}/{r}/commits`.
#[derive(Debug, Deserialize)]
pub(crate) struct CommitListItem {
    pub sha: String,
    pub commit: CommitBody,
    pub author: Option<UserRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitFile {
    pub filename: String,
    pub status: Option<String>,
    pub previous_filename: Option<String>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    pub patch: Option<String>,
}

/// `GET /repos/{o}/{r}/commits/{sha}`.
#[derive(Debug, Deserialize)]
pub(crate) struct CommitDetail {
    pub sha: String,
    pub commit: CommitBody,
    pub author: Option<UserRef>,
    #[serde(default)]
    pub parents: Vec<ShaRef>,
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub sha: String,
    pub content: Option<String>,
    pub encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WrittenCommit {
    pub sha: String,
    pub tree: ShaRef,
}

/// Response of a contents PUT or DELETE.
#[derive(Debug, Deserialize)]
pub(crate) struct WriteResponse {
    pub content: Option<ShaRef>,
    pub commit: WrittenCommit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepoInfo {
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchCommitInner {
    pub tree: ShaRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchCommit {
    pub commit: BranchCommitInner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchInfo {
    pub commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeItem {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeResponse {
    #[serde(default)]
    pub tree: Vec<TreeItem>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn author_name(body: &CommitBody, user: Option<&UserRef>) -> String {
    body.author
        .as_ref()
        .and_then(|a| a.name.clone())
        .filter(|n| !n.is_empty())
        .or_else(|| user.map(|u| u.login.clone()))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn commit_date(body: &CommitBody) -> String {
    body.author
        .as_ref()
        .and_then(|a| a.date.clone())
        .unwrap_or_default()
}

impl CommitListItem {
    pub fn into_summary(self) -> CommitSummary {
        CommitSummary {
            author: author_name(&self.commit, self.author.as_ref()),
            timestamp: commit_date(&self.commit),
            id: self.sha,
            message: self.commit.message,
        }
    }
}

impl CommitDetail {
    /// Only the first parent is kept; merge commits are treated as linear.
    pub fn into_commit_ref(self) -> CommitRef {
        let changes = self
            .files
            .into_iter()
            .map(|f| FileChange {
                status: ChangeStatus::from_remote(f.status.as_deref().unwrap_or("modified")),
                path: f.filename,
                previous_path: f.previous_filename,
            })
            .collect();
        CommitRef {
            author: author_name(&self.commit, self.author.as_ref()),
            timestamp: commit_date(&self.commit),
            parent_id: self
                .parents
                .into_iter()
                .next()
                .map(|p| p.sha)
                .unwrap_or_default(),
            id: self.sha,
            message: self.commit.message,
            changes,
        }
    }

    pub fn into_file_patch(self, path: &str) -> Option<FilePatch> {
        self.files
            .into_iter()
            .find(|f| f.filename == path)
            .map(|f| FilePatch {
                additions: f.additions,
                deletions: f.deletions,
                patch: f.patch.unwrap_or_default(),
            })
    }
}

/// Decode a contents response. Directories come back as arrays.
pub fn file_content(path: &str, value: serde_json::Value) -> Result<FileContent, RemoteError> {
    if value.is_array() {
        return Err(RemoteError::NotAFile(path.to_string()));
    }
    let item: ContentItem =
        serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))?;
    if item.kind != "file" {
        return Err(RemoteError::NotAFile(item.path));
    }
    if item.encoding.as_deref() == Some("none") {
        return Err(RemoteError::Decode(format!(
            "{} is too large for the contents API",
            item.path
        )));
    }
    file_content_from_base64(&item.path, &item.sha, item.content.as_deref().unwrap_or(""))
}

impl WriteResponse {
    pub fn into_outcome(self) -> WriteOutcome {
        WriteOutcome {
            commit_id: self.commit.sha,
            tree_id: self.commit.tree.sha,
            file_sha: self.content.map(|c| c.sha).unwrap_or_default(),
        }
    }
}

/// Submodule entries (`commit`) are dropped.
pub fn tree_entries(items: Vec<TreeItem>) -> Vec<TreeEntry> {
    items
        .into_iter()
        .filter_map(|item| {
            let kind = match item.kind.as_str() {
                "blob" => EntryKind::File,
                "tree" => EntryKind::Dir,
                _ => return None,
            };
            Some(TreeEntry {
                path: item.path,
                kind,
                sha: item.sha,
                size: item.size,
            })
        })
        .collect()
}

/// Map a non-success response. `subject` names what was requested.
pub fn status_error(
    status: u16,
    ratelimit_remaining: Option<&str>,
    subject: &str,
    body: &str,
) -> RemoteError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string());
    match status {
        401 => RemoteError::Unauthorized(message),
        403 | 429 if ratelimit_remaining == Some("0") || status == 429 => RemoteError::RateLimited,
        403 => RemoteError::Unauthorized(message),
        404 => RemoteError::NotFound(subject.to_string()),
        409 | 422 => RemoteError::Conflict {
            path: subject.to_string(),
            detail: message,
        },
        _ => RemoteError::Status { status, message },
    }
}
