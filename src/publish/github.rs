use core::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, Response, header};
use serde::{Deserialize, Serialize};

use super::{ApiError, FileUpdate, RemoteFile, RepoApi};

pub const DEFAULT_API: &str = "https://api.github.com";

/// Contents API of one GitHub repository, authenticated with a token.
pub struct GitHubApi {
    client: Client,
    base: String,
    repo: String,
    token: String,
}

#[derive(Deserialize)]
struct ContentResponse {
    path: String,
    sha: String,
}

#[derive(Serialize)]
struct UpdatePayload<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

impl GitHubApi {
    /// `repo` is `owner/name`, as in `GITHUB_REPOSITORY`.
    pub fn new(
        base: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let headers = [
            (header::ACCEPT, header::HeaderValue::from_static("application/vnd.github+json")),
            (
                header::HeaderName::from_static("x-github-api-version"),
                header::HeaderValue::from_static("2022-11-28"),
            ),
        ]
        .into_iter()
        .collect();
        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Ok(Self {
            client,
            base,
            repo: repo.into(),
            token: token.into(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.base, self.repo, path.trim_start_matches('/'))
    }

    async fn check(res: Response) -> Result<Response, ApiError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(ApiError::from_status(status.as_u16(), body))
    }
}

#[async_trait]
impl RepoApi for GitHubApi {
    async fn get_file(&self, path: &str, branch: &str) -> Result<RemoteFile, ApiError> {
        let res = self
            .client
            .get(self.contents_url(path))
            .query(&[("ref", branch)])
            .bearer_auth(&self.token)
            .send()
            .await?;
        let ContentResponse { path, sha } = Self::check(res).await?.json().await?;
        Ok(RemoteFile { path, sha })
    }

    async fn update_file(&self, update: FileUpdate<'_>) -> Result<(), ApiError> {
        let payload = UpdatePayload {
            message: update.message,
            content: STANDARD.encode(update.content),
            sha: update.sha,
            branch: update.branch,
        };
        let res = self
            .client
            .put(self.contents_url(update.path))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }
}
