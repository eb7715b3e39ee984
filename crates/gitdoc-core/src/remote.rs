use crate::error::RemoteResult;
use crate::types::{
    CommitId, CommitRef, CommitSummary, FileContent, FilePatch, RepoId, TreeEntry, TreeId,
    WriteOutcome, WriteRequest,
};

/// Read/write file API of the remote repository service.
///
/// Implemented by `gitdoc_github::GithubRemote` and, for tests, by
/// [`crate::testing::FakeRemote`]. Every method is a suspension point.
#[async_trait::async_trait]
pub trait RemoteRepo: Send + Sync {
    /// Commits newest first, optionally only those touching `path`.
    async fn list_commits(
        &self,
        repo: &RepoId,
        path: Option<&str>,
        limit: usize,
    ) -> RemoteResult<Vec<CommitSummary>>;

    async fn commit_detail(&self, repo: &RepoId, commit_id: &str) -> RemoteResult<CommitRef>;

    /// Change `commit_id` made to `path`; `None` when the commit did not
    /// touch it.
    async fn commit_file_patch(
        &self,
        repo: &RepoId,
        commit_id: &str,
        path: &str,
    ) -> RemoteResult<Option<FilePatch>>;

    /// Content of `path` at `git_ref`, or at the default branch when `None`.
    async fn content_at(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: Option<&str>,
    ) -> RemoteResult<FileContent>;

    async fn write_file(&self, repo: &RepoId, req: WriteRequest<'_>)
        -> RemoteResult<WriteOutcome>;

    async fn delete_file(
        &self,
        repo: &RepoId,
        path: &str,
        sha: &str,
        message: &str,
    ) -> RemoteResult<WriteOutcome>;

    /// Current HEAD commit. Empty for a repository without commits.
    async fn head(&self, repo: &RepoId) -> RemoteResult<CommitId>;

    /// Tree of the default branch HEAD.
    async fn default_tree(&self, repo: &RepoId) -> RemoteResult<TreeId>;

    /// Recursive listing of a tree.
    async fn tree(&self, repo: &RepoId, tree_id: &str) -> RemoteResult<Vec<TreeEntry>>;
}
