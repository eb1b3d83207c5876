use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::types::{AccessToken, RepoRef, Repository, UserProfile};
use crate::upstream::{UpstreamClient, default_url, endpoint};

/// Page size for `GET /user/repos`; GitHub's maximum.
pub const REPOSITORY_PAGE_SIZE: u8 = 100;

/// `GET /repos/{o}/{r}/commits` on a repository without commits.
const EMPTY_REPOSITORY_STATUS: u16 = 409;

const API_VERSION: &str = "2022-11-28";

#[derive(Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
}

/// GitHub REST API calls made on behalf of the signed-in user.
pub struct GitHubClient {
    api_url: Url,
    upstream: UpstreamClient,
}

impl GitHubClient {
    #[must_use]
    pub fn new(upstream: UpstreamClient) -> Self {
        Self {
            api_url: default_url("https://api.github.com"),
            upstream,
        }
    }

    /// Override the API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    fn get(&self, url: Url, token: &AccessToken) -> reqwest::RequestBuilder {
        self.upstream
            .http()
            .get(url)
            .bearer_auth(token.expose())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// `GET /user`.
    ///
    /// # Errors
    ///
    /// Upstream errors from [`UpstreamClient::send_json`].
    pub async fn current_user(&self, token: &AccessToken) -> Result<UserProfile, Error> {
        let url = endpoint(&self.api_url, &["user"])?;
        self.upstream
            .send_json("userinfo request", self.get(url, token))
            .await
    }

    /// Up to [`REPOSITORY_PAGE_SIZE`] repositories, most recently updated first.
    ///
    /// # Errors
    ///
    /// Upstream errors from [`UpstreamClient::send_json`].
    pub async fn list_repositories(&self, token: &AccessToken) -> Result<Vec<Repository>, Error> {
        let url = endpoint(&self.api_url, &["user", "repos"])?;
        let per_page = REPOSITORY_PAGE_SIZE.to_string();
        let request = self
            .get(url, token)
            .query(&[("sort", "updated"), ("per_page", per_page.as_str())]);
        self.upstream.send_json("list repositories", request).await
    }

    /// Messages of the latest `limit` commits on the default branch of `repo`.
    ///
    /// An empty repository (GitHub answers `409 Conflict`) has no messages.
    ///
    /// # Errors
    ///
    /// Upstream errors from [`UpstreamClient::send_json`].
    pub async fn recent_commit_messages(
        &self,
        token: &AccessToken,
        repo: &RepoRef,
        limit: u8,
    ) -> Result<Vec<String>, Error> {
        let url = endpoint(&self.api_url, &["repos", &repo.owner, &repo.name, "commits"])?;
        let request = self.get(url, token).query(&[("per_page", limit.to_string())]);
        let commits: Vec<CommitEntry> = match self.upstream.send_json("list commits", request).await {
            Ok(commits) => commits,
            Err(Error::UpstreamRejected {
                status: EMPTY_REPOSITORY_STATUS,
                ..
            }) => {
                tracing::debug!(repo = %repo, "Repository has no commits");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        Ok(commits
            .into_iter()
            .map(|entry| entry.commit.message)
            .filter(|message| !message.trim().is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_entries_decode() {
        let json = r#"[
            {"sha": "a", "commit": {"message": "Fix login bug"}},
            {"sha": "b", "commit": {"message": ""}}
        ]"#;
        let entries: Vec<CommitEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].commit.message, "Fix login bug");
    }
}
