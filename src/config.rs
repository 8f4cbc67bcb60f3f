use core::time::Duration;
use std::path::PathBuf;

use crate::{
    fetch::{Browser, DEFAULT_RELAY},
    publish::github::DEFAULT_API,
    retry::RetryPolicy,
};

#[derive(Debug, clap::Parser)]
#[command(version, about = "Refresh the published list of desktop user agents")]
pub struct Args {
    /// Last published list (JSON array of strings)
    #[arg(long, env = "UA_SNAPSHOT", default_value = "user-agents.json", value_name = "file")]
    pub snapshot: PathBuf,
    /// Path of the list inside the remote repository [default: snapshot file name]
    #[arg(long)]
    pub file_name: Option<String>,
    /// Relay URL; `{browser}` is replaced by the browser name
    #[arg(long, env = "UA_RELAY_URL", default_value = DEFAULT_RELAY)]
    pub relay_url: String,
    /// Browsers to scrape, in order [default: chrome, firefox, safari, edge]
    #[arg(long = "browser", value_enum)]
    pub browsers: Vec<Browser>,
    /// Attempts per browser
    #[arg(long, default_value_t = 3)]
    pub retries: u32,
    /// Seconds between attempts
    #[arg(long, default_value_t = 2)]
    pub retry_delay: u64,
    /// Seconds to pause before every request
    #[arg(long, default_value_t = 1)]
    pub throttle: u64,
    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
    /// Branches to update [default: main, gh-pages]
    #[arg(long = "branch")]
    pub branches: Vec<String>,
    #[arg(long, default_value = DEFAULT_API)]
    pub api_url: String,
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
    /// Target repository as `owner/name`
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub github_repository: Option<String>,
    /// Scrape and compare, but never publish
    #[arg(long)]
    pub dry_run: bool,
    /// Also write the new list here when it changed
    #[arg(long, value_name = "file")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("relay URL {0:?} has no {{browser}} placeholder")]
    Relay(String),
    #[error("cannot derive a remote file name from {}", .0.display())]
    FileName(PathBuf),
    #[error("repository {0:?} is not of the form owner/name")]
    Repository(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub repository: String,
}

/// Fully resolved settings for one run.
#[derive(Clone, Debug)]
pub struct Config {
    pub snapshot: PathBuf,
    pub file_name: String,
    pub relay_url: String,
    pub browsers: Vec<Browser>,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub branches: Vec<String>,
    pub api_url: String,
    /// `None` only in dry runs.
    pub credentials: Option<Credentials>,
    pub output: Option<PathBuf>,
}

pub const DEFAULT_BRANCHES: [&str; 2] = ["main", "gh-pages"];

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if !args.relay_url.contains("{browser}") {
            return Err(ConfigError::Relay(args.relay_url));
        }

        let file_name = match args.file_name {
            Some(name) => name,
            None => args
                .snapshot
                .file_name()
                .and_then(|s| s.to_str())
                .map(ToOwned::to_owned)
                .ok_or_else(|| ConfigError::FileName(args.snapshot.clone()))?,
        };

        let credentials = if args.dry_run {
            None
        } else {
            let token = args
                .github_token
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("GITHUB_TOKEN"))?;
            let repository = args
                .github_repository
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::Missing("GITHUB_REPOSITORY"))?;
            if !matches!(repository.split_once('/'), Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/'))
            {
                return Err(ConfigError::Repository(repository));
            }
            Some(Credentials { token, repository })
        };

        let mut browsers = args.browsers;
        if browsers.is_empty() {
            browsers = Browser::ALL.to_vec();
        }
        let mut branches = args.branches;
        if branches.is_empty() {
            branches = DEFAULT_BRANCHES.map(String::from).to_vec();
        }

        Ok(Self {
            snapshot: args.snapshot,
            file_name,
            relay_url: args.relay_url,
            browsers,
            retry: RetryPolicy {
                max_attempts: args.retries,
                delay: Duration::from_secs(args.retry_delay),
                throttle: Duration::from_secs(args.throttle),
            },
            timeout: Duration::from_secs(args.timeout),
            branches,
            api_url: args.api_url,
            credentials,
            output: args.output,
        })
    }
}
