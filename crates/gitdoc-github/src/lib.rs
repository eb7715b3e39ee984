//! [`RemoteRepo`] over the GitHub REST API.

mod wire;

use std::time::Duration;

use gitdoc_core::content::encode_base64;
use gitdoc_core::{
    CommitId, CommitRef, CommitSummary, FileContent, FilePatch, RemoteError, RemoteRepo,
    RemoteResult, RepoId, TreeEntry, TreeId, WriteOutcome, WriteRequest,
};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

const TIMEOUT: Duration = Duration::from_secs(30);
const MAX_PER_PAGE: usize = 100;
const API_VERSION: &str = "2022-11-28";

pub struct GithubRemote {
    client: reqwest::Client,
    api_base: Url,
    token: String,
}

#[derive(Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

impl GithubRemote {
    pub fn new(api_base: &str, token: impl Into<String>) -> RemoteResult<Self> {
        let api_base = Url::parse(api_base)
            .map_err(|e| RemoteError::Transport(format!("invalid api base {api_base}: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(RemoteError::Transport(format!(
                "invalid api base {api_base}"
            )));
        }
        let client = Self::client_builder().build().map_err(transport)?;
        Ok(Self {
            client,
            api_base,
            token: token.into(),
        })
    }

    fn client_builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(TIMEOUT)
            .user_agent(concat!("gitdoc/", env!("CARGO_PKG_VERSION")))
    }

    /// `{base}/repos/{owner}/{name}/{segments...}`, each segment escaped.
    fn url<'a, I>(&self, repo: &RepoId, segments: I) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["repos", repo.owner.as_str(), repo.name.as_str()])
                .extend(segments);
        }
        url
    }

    fn contents_url(&self, repo: &RepoId, path: &str) -> Url {
        self.url(
            repo,
            std::iter::once("contents").chain(path.split('/').filter(|s| !s.is_empty())),
        )
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, subject: &str) -> RemoteResult<T> {
        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let remaining = resp
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = resp.text().await.unwrap_or_default();
            let err = wire::status_error(status.as_u16(), remaining.as_deref(), subject, &body);
            tracing::debug!(subject, status = status.as_u16(), error = %err, "github request failed");
            return Err(err);
        }
        resp.json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RemoteRepo for GithubRemote {
    async fn list_commits(
        &self,
        repo: &RepoId,
        path: Option<&str>,
        limit: usize,
    ) -> RemoteResult<Vec<CommitSummary>> {
        // GitHub pages by offset, so every page must use the same size.
        let per_page = limit.min(MAX_PER_PAGE);
        let mut out = Vec::new();
        let mut page = 1usize;
        while out.len() < limit {
            let mut req = self.request(Method::GET, self.url(repo, ["commits"])).query(&[
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ]);
            if let Some(p) = path {
                req = req.query(&[("path", p)]);
            }
            let items: Vec<wire::CommitListItem> =
                self.send(req, path.unwrap_or("commits")).await?;
            let got = items.len();
            out.extend(items.into_iter().map(wire::CommitListItem::into_summary));
            if got < per_page {
                break;
            }
            page += 1;
        }
        out.truncate(limit);
        Ok(out)
    }

    async fn commit_detail(&self, repo: &RepoId, commit_id: &str) -> RemoteResult<CommitRef> {
        let req = self.request(Method::GET, self.url(repo, ["commits", commit_id]));
        let detail: wire::CommitDetail = self.send(req, commit_id).await?;
        Ok(detail.into_commit_ref())
    }

    async fn commit_file_patch(
        &self,
        repo: &RepoId,
        commit_id: &str,
        path: &str,
    ) -> RemoteResult<Option<FilePatch>> {
        let req = self.request(Method::GET, self.url(repo, ["commits", commit_id]));
        let detail: wire::CommitDetail = self.send(req, commit_id).await?;
        Ok(detail.into_file_patch(path))
    }

    async fn content_at(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: Option<&str>,
    ) -> RemoteResult<FileContent> {
        let mut req = self.request(Method::GET, self.contents_url(repo, path));
        if let Some(r) = git_ref {
            req = req.query(&[("ref", r)]);
        }
        let value: serde_json::Value = self.send(req, path).await?;
        wire::file_content(path, value)
    }

    async fn write_file(
        &self,
        repo: &RepoId,
        req: WriteRequest<'_>,
    ) -> RemoteResult<WriteOutcome> {
        let body = PutBody {
            message: req.message,
            content: encode_base64(req.bytes),
            sha: req.prior_sha,
        };
        let http = self
            .request(Method::PUT, self.contents_url(repo, req.path))
            .json(&body);
        let resp: wire::WriteResponse = self.send(http, req.path).await?;
        Ok(resp.into_outcome())
    }

    async fn delete_file(
        &self,
        repo: &RepoId,
        path: &str,
        sha: &str,
        message: &str,
    ) -> RemoteResult<WriteOutcome> {
        let http = self
            .request(Method::DELETE, self.contents_url(repo, path))
            .json(&DeleteBody { message, sha });
        let resp: wire::WriteResponse = self.send(http, path).await?;
        Ok(resp.into_outcome())
    }

    async fn head(&self, repo: &RepoId) -> RemoteResult<CommitId> {
        match self.list_commits(repo, None, 1).await {
            Ok(commits) => Ok(commits.into_iter().next().map(|c| c.id).unwrap_or_default()),
            // GitHub answers 409 for a repository without commits.
            Err(RemoteError::Conflict { .. }) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    async fn default_tree(&self, repo: &RepoId) -> RemoteResult<TreeId> {
        let info: wire::RepoInfo = self
            .send(
                self.request(Method::GET, self.url(repo, std::iter::empty())),
                &repo.to_string(),
            )
            .await?;
        let branch: wire::BranchInfo = self
            .send(
                self.request(
                    Method::GET,
                    self.url(repo, ["branches", info.default_branch.as_str()]),
                ),
                &info.default_branch,
            )
            .await?;
        Ok(branch.commit.commit.tree.sha)
    }

    async fn tree(&self, repo: &RepoId, tree_id: &str) -> RemoteResult<Vec<TreeEntry>> {
        let req = self
            .request(Method::GET, self.url(repo, ["git", "trees", tree_id]))
            .query(&[("recursive", "true")]);
        let resp: wire::TreeResponse = self.send(req, tree_id).await?;
        if resp.truncated {
            tracing::warn!(repo = %repo, tree = tree_id, "tree listing truncated by remote");
        }
        Ok(wire::tree_entries(resp.tree))
    }
}
