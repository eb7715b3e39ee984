use serde::{Deserialize, Serialize};
use std::fmt;

/// Commit identifier (opaque content hash).
pub type CommitId = String;

/// Tree identifier: a complete directory-structure snapshot.
pub type TreeId = String;

/// A repository on the remote service, addressed as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`. Both halves must be non-empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, name) = s.trim().split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self::new(owner, name))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// How a single file was affected by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl ChangeStatus {
    /// Map a status string reported by the remote. `copied` counts as an
    /// addition; anything unrecognized is a modification.
    pub fn from_remote(status: &str) -> Self {
        match status {
            "added" | "copied" => ChangeStatus::Added,
            "removed" => ChangeStatus::Removed,
            "renamed" => ChangeStatus::Renamed,
            _ => ChangeStatus::Modified,
        }
    }
}

/// One file's change within one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub status: ChangeStatus,
    /// Only present for renames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
}

impl FileChange {
    pub fn added(path: &str) -> Self {
        Self::with_status(path, ChangeStatus::Added)
    }

    pub fn modified(path: &str) -> Self {
        Self::with_status(path, ChangeStatus::Modified)
    }

    pub fn removed(path: &str) -> Self {
        Self::with_status(path, ChangeStatus::Removed)
    }

    pub fn renamed(from: &str, to: &str) -> Self {
        Self {
            path: to.to_string(),
            status: ChangeStatus::Renamed,
            previous_path: Some(from.to_string()),
        }
    }

    fn with_status(path: &str, status: ChangeStatus) -> Self {
        Self {
            path: path.to_string(),
            status,
            previous_path: None,
        }
    }
}

/// A commit as returned by the history listing (no file changes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub id: CommitId,
    pub message: String,
    pub author: String,
    /// RFC 3339, empty when the remote did not report one.
    pub timestamp: String,
}

/// Full commit detail with its ordered file changes. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub id: CommitId,
    /// Empty for a root commit.
    #[serde(default)]
    pub parent_id: CommitId,
    pub author: String,
    pub timestamp: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub changes: Vec<FileChange>,
}

impl CommitRef {
    pub fn has_parent(&self) -> bool {
        !self.parent_id.is_empty()
    }
}

/// A path that is deleted as of the newest scanned commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub path: String,
    /// Commit that removed the file.
    pub commit_id: CommitId,
    /// Snapshot in which the file last existed.
    pub parent_id: CommitId,
    pub author: String,
    pub timestamp: String,
}

/// How one commit changed one file: line counts and the unified diff hunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatch {
    pub additions: u64,
    pub deletions: u64,
    /// Empty for binary files and diffs too large for the remote to return.
    #[serde(default)]
    pub patch: String,
}

/// File content at some ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: String,
    /// Blob sha of this version.
    pub sha: String,
    pub bytes: Vec<u8>,
    pub is_text: bool,
}

impl FileContent {
    /// UTF-8 view of the content, `None` for binary files.
    pub fn text(&self) -> Option<&str> {
        if !self.is_text {
            return None;
        }
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// A write or delete request against a single path.
#[derive(Debug, Clone)]
pub struct WriteRequest<'a> {
    pub path: &'a str,
    pub bytes: &'a [u8],
    /// `None` means create-only; `Some` enforces optimistic concurrency.
    pub prior_sha: Option<&'a str>,
    pub message: &'a str,
}

/// Result of a successful write: the new commit and the tree it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub commit_id: CommitId,
    pub tree_id: TreeId,
    /// Blob sha of the written file; empty for deletions.
    #[serde(default)]
    pub file_sha: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
    pub sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Default commit message for a restore.
pub fn restore_message(path: &str) -> String {
    format!("Restore {path}")
}

/// Default commit message for a content update.
pub fn update_message(path: &str) -> String {
    format!("Update {path}")
}

/// Default commit message for a deletion.
pub fn delete_message(path: &str) -> String {
    format!("Delete {path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_parse() {
        let repo = RepoId::parse("octo/notes").unwrap();
        assert_eq!(repo.owner, "octo");
        assert_eq!(repo.name, "notes");
        assert_eq!(repo.to_string(), "octo/notes");
    }

    #[test]
    fn repo_id_rejects_malformed() {
        assert!(RepoId::parse("notes").is_none());
        assert!(RepoId::parse("/notes").is_none());
        assert!(RepoId::parse("octo/").is_none());
        assert!(RepoId::parse("a/b/c").is_none());
    }

    #[test]
    fn status_normalization() {
        assert_eq!(ChangeStatus::from_remote("added"), ChangeStatus::Added);
        assert_eq!(ChangeStatus::from_remote("copied"), ChangeStatus::Added);
        assert_eq!(ChangeStatus::from_remote("removed"), ChangeStatus::Removed);
        assert_eq!(ChangeStatus::from_remote("renamed"), ChangeStatus::Renamed);
        assert_eq!(ChangeStatus::from_remote("changed"), ChangeStatus::Modified);
        assert_eq!(ChangeStatus::from_remote("unchanged"), ChangeStatus::Modified);
    }

    #[test]
    fn rename_keeps_previous_path() {
        let c = FileChange::renamed("old.md", "new.md");
        assert_eq!(c.path, "new.md");
        assert_eq!(c.previous_path.as_deref(), Some("old.md"));
    }

    #[test]
    fn deletion_record_serializes_snake_case() {
        let rec = DeletionRecord {
            path: "notes/a.md".into(),
            commit_id: "c2".into(),
            parent_id: "c1".into(),
            author: "Ada".into(),
            timestamp: "2024-05-01T10:00:00Z".into(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["commit_id"], "c2");
        assert_eq!(json["parent_id"], "c1");
    }

    #[test]
    fn binary_content_has_no_text() {
        let content = FileContent {
            path: "img.png".into(),
            sha: "s".into(),
            bytes: vec![0xff, 0xfe],
            is_text: false,
        };
        assert!(content.text().is_none());
    }
}
