use core::fmt;

use async_trait::async_trait;

pub mod github;

pub use github::GitHubApi;

/// The file as currently stored on one branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    /// Revision the next write must name, or the remote rejects it as stale.
    pub sha: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileUpdate<'a> {
    pub path: &'a str,
    pub message: &'a str,
    pub content: &'a str,
    pub sha: &'a str,
    pub branch: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("authentication rejected (HTTP {status}): {body}")]
    Auth { status: u16, body: String },
    #[error("stale revision: {0}")]
    Conflict(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl ApiError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth { status, body },
            409 => Self::Conflict(body),
            _ => Self::Status { status, body },
        }
    }
}

/// Read-and-replace access to a file in a hosted repository.
#[async_trait]
pub trait RepoApi: Send + Sync {
    async fn get_file(&self, path: &str, branch: &str) -> Result<RemoteFile, ApiError>;
    async fn update_file(&self, update: FileUpdate<'_>) -> Result<(), ApiError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Read,
    Write,
}

#[derive(Debug)]
pub struct BranchFailure {
    pub branch: String,
    pub stage: Stage,
    pub source: ApiError,
}

impl fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            Stage::Read => "read",
            Stage::Write => "write",
        };
        write!(f, "{}: {stage} failed: {}", self.branch, self.source)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{} of {attempted} branches failed: {}", .failures.len(), join(.failures))]
    Branches {
        attempted: usize,
        failures: Vec<BranchFailure>,
    },
}

fn join(failures: &[BranchFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Published(Vec<String>),
}

pub struct Publisher<'a> {
    pub api: &'a dyn RepoApi,
    pub file_name: &'a str,
    pub branches: &'a [String],
}

impl Publisher<'_> {
    pub fn message(&self, branch: &str) -> String {
        format!("Update {} on {branch} branch", self.file_name)
    }

    /// Pushes `new_json` to every branch unless it equals `old_json` byte for
    /// byte. Branches are attempted independently; any failure fails the call.
    pub async fn publish(&self, old_json: &str, new_json: &str) -> Result<Outcome, PublishError> {
        if old_json == new_json {
            tracing::info!(target: "publish", "no change, nothing to publish");
            return Ok(Outcome::Unchanged);
        }

        let mut published = Vec::with_capacity(self.branches.len());
        let mut failures = Vec::new();
        for branch in self.branches {
            match self.update_branch(branch, new_json).await {
                Ok(()) => {
                    tracing::info!(target: "publish", "\x1b[36mupdated {} on {branch}\x1b[0m", self.file_name);
                    published.push(branch.clone());
                }
                Err(failure) => {
                    tracing::error!(target: "publish", "\x1b[31m{failure}\x1b[0m");
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Ok(Outcome::Published(published))
        } else {
            Err(PublishError::Branches {
                attempted: self.branches.len(),
                failures,
            })
        }
    }

    async fn update_branch(&self, branch: &str, content: &str) -> Result<(), BranchFailure> {
        let fail = |stage: Stage| {
            move |source: ApiError| BranchFailure {
                branch: branch.to_owned(),
                stage,
                source,
            }
        };

        let current = self
            .api
            .get_file(self.file_name, branch)
            .await
            .map_err(fail(Stage::Read))?;
        tracing::debug!(target: "publish", "{branch}: {} at {}", current.path, current.sha);

        let message = self.message(branch);
        self.api
            .update_file(FileUpdate {
                path: &current.path,
                message: &message,
                content,
                sha: &current.sha,
                branch,
            })
            .await
            .map_err(fail(Stage::Write))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Get(String),
        Put { branch: String, sha: String, message: String, content: String },
    }

    #[derive(Default)]
    struct FakeRepo {
        calls: Mutex<Vec<Call>>,
        /// Branches whose read fails.
        broken: Vec<&'static str>,
    }

    #[async_trait]
    impl RepoApi for FakeRepo {
        async fn get_file(&self, path: &str, branch: &str) -> Result<RemoteFile, ApiError> {
            self.calls.lock().unwrap().push(Call::Get(branch.to_owned()));
            if self.broken.iter().any(|b| *b == branch) {
                return Err(ApiError::from_status(401, "Bad credentials".to_owned()));
            }
            Ok(RemoteFile {
                path: path.to_owned(),
                sha: format!("sha-{branch}"),
            })
        }

        async fn update_file(&self, update: FileUpdate<'_>) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(Call::Put {
                branch: update.branch.to_owned(),
                sha: update.sha.to_owned(),
                message: update.message.to_owned(),
                content: update.content.to_owned(),
            });
            Ok(())
        }
    }

    fn branches() -> Vec<String> {
        vec!["main".to_owned(), "gh-pages".to_owned()]
    }

    #[tokio::test]
    async fn identical_content_makes_no_calls() {
        let repo = FakeRepo::default();
        let branches = branches();
        let publisher = Publisher { api: &repo, file_name: "user-agents.json", branches: &branches };
        let outcome = publisher.publish("[]\n", "[]\n").await.unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert!(repo.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_revision_before_each_write() {
        let repo = FakeRepo::default();
        let branches = branches();
        let publisher = Publisher { api: &repo, file_name: "user-agents.json", branches: &branches };
        let outcome = publisher.publish("[]\n", "[\n    \"x\"\n]\n").await.unwrap();
        assert_eq!(outcome, Outcome::Published(branches.clone()));

        let calls = repo.calls.lock().unwrap();
        let put = |branch: &str| Call::Put {
            branch: branch.to_owned(),
            sha: format!("sha-{branch}"),
            message: format!("Update user-agents.json on {branch} branch"),
            content: "[\n    \"x\"\n]\n".to_owned(),
        };
        assert_eq!(
            *calls,
            [Call::Get("main".to_owned()), put("main"), Call::Get("gh-pages".to_owned()), put("gh-pages")]
        );
    }

    #[tokio::test]
    async fn branch_failure_does_not_block_the_other() {
        let repo = FakeRepo { broken: vec!["main"], ..FakeRepo::default() };
        let branches = branches();
        let publisher = Publisher { api: &repo, file_name: "user-agents.json", branches: &branches };
        let err = publisher.publish("old", "new").await.unwrap_err();

        let PublishError::Branches { attempted, failures } = &err;
        assert_eq!(*attempted, 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].branch, "main");
        assert_eq!(failures[0].stage, Stage::Read);
        assert!(matches!(failures[0].source, ApiError::Auth { status: 401, .. }));
        assert_eq!(
            err.to_string(),
            "1 of 2 branches failed: main: read failed: authentication rejected (HTTP 401): Bad credentials"
        );

        let calls = repo.calls.lock().unwrap();
        assert!(calls.iter().any(|c| matches!(c, Call::Put { branch, .. } if branch == "gh-pages")));
        assert!(!calls.iter().any(|c| matches!(c, Call::Put { branch, .. } if branch == "main")));
    }

    #[test]
    fn status_classification() {
        assert!(matches!(ApiError::from_status(409, String::new()), ApiError::Conflict(_)));
        assert!(matches!(ApiError::from_status(403, String::new()), ApiError::Auth { status: 403, .. }));
        assert!(matches!(ApiError::from_status(422, String::new()), ApiError::Status { status: 422, .. }));
    }
}
