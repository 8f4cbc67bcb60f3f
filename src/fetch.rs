use core::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, header::USER_AGENT};

use crate::{
    retry::{RetryPolicy, Sleep},
    snapshot::Snapshot,
};

pub const DEFAULT_RELAY: &str = "https://webproxy.lumiproxy.com/request?area=KR&u=https://www.whatismybrowser.com/guides/the-latest-user-agent/{browser}";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
}

impl Browser {
    pub const ALL: [Self; 4] = [Self::Chrome, Self::Firefox, Self::Safari, Self::Edge];

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
            Self::Edge => "edge",
        }
    }
}

impl fmt::Display for Browser {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// One failed request.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}")]
    Status { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch data for {browser} after {attempts} attempts")]
    Exhausted {
        browser: Browser,
        attempts: u32,
        #[source]
        source: AttemptError,
    },
    #[error("no user agent available to disguise the request for {0}")]
    NoDisguise(Browser),
}

/// Something that can GET a page while presenting a given `User-Agent`.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &str, user_agent: &str) -> Result<String, AttemptError>;
}

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(const { Duration::from_secs(8) })
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn get(&self, url: &str, user_agent: &str) -> Result<String, AttemptError> {
        let res = self.client.get(url).header(USER_AGENT, user_agent).send().await?;
        let status = res.status();
        let body = res.text().await?;
        if status.as_u16() >= 400 {
            tracing::error!(target: "fetch", "\x1b[31merror\x1b[0m for {url}: {status}\n{body}");
            return Err(AttemptError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Pulls one guide page per browser through the relay.
pub struct Fetcher<'a> {
    pub source: &'a dyn PageSource,
    pub sleeper: &'a dyn Sleep,
    pub policy: RetryPolicy,
    /// Relay URL with a `{browser}` placeholder.
    pub relay: &'a str,
}

impl Fetcher<'_> {
    pub fn url(&self, browser: Browser) -> String {
        self.relay.replace("{browser}", browser.slug())
    }

    pub async fn fetch(&self, browser: Browser, snapshot: &Snapshot) -> Result<String, FetchError> {
        if snapshot.is_empty() {
            return Err(FetchError::NoDisguise(browser));
        }
        let url = self.url(browser);
        tracing::info!(target: "fetch", "\x1b[33mscraping\x1b[0m {url} ...");

        let url = url.as_str();
        let source = self.source;
        self.policy
            .run(self.sleeper, browser.slug(), |_| async move {
                // A fresh disguise per attempt.
                let user_agent = snapshot.random_agent().map_or("", |ua| ua.as_str());
                tracing::debug!(target: "fetch", "[{browser}] as {user_agent}");
                source.get(url, user_agent).await
            })
            .await
            .map_err(|e| FetchError::Exhausted {
                browser,
                attempts: e.attempts,
                source: e.last,
            })
    }
}
