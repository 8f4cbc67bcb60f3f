use std::{io, path::PathBuf};

use crate::{
    MIN_AGENTS,
    fetch::{Browser, FetchError, Fetcher},
    filter::{OsFilter, Verdict},
    parse::PageParser,
    publish::{Outcome, PublishError, Publisher},
    snapshot::{Snapshot, SnapshotError, UserAgent, canonical_json},
};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("scraped only {found} user agents, at least {required} required")]
    TooFewScraped { found: usize, required: usize },
    #[error("cannot write {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Everything one refresh needs, built by the caller.
pub struct Context<'a> {
    pub snapshot: Snapshot,
    pub browsers: &'a [Browser],
    pub fetcher: Fetcher<'a>,
    pub parser: &'a dyn PageParser,
    pub filter: &'a OsFilter,
    /// `None` for a dry run.
    pub publisher: Option<Publisher<'a>>,
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Report {
    pub agents: Vec<UserAgent>,
    pub old_json: String,
    pub new_json: String,
    /// `None` when nothing was asked to publish.
    pub outcome: Option<Outcome>,
}

impl Report {
    #[inline]
    pub fn changed(&self) -> bool {
        self.old_json != self.new_json
    }
}

/// Accepted user agents of one page, in page order.
pub fn extract(
    browser: Browser,
    html: &str,
    parser: &dyn PageParser,
    filter: &OsFilter,
) -> Vec<UserAgent> {
    let candidates = parser.candidates(html);
    if candidates.is_empty() {
        tracing::warn!(target: "filter", "[{browser}] no candidates on page, markup may have changed");
        return Vec::new();
    }

    let mut accepted = Vec::new();
    for candidate in &candidates {
        let ua = candidate.trim();
        match filter.judge(ua) {
            Verdict::Included => accepted.push(UserAgent::from(ua)),
            Verdict::NotBrowser => {}
            verdict => tracing::debug!(target: "filter", "[{browser}] {verdict:?}: {ua}"),
        }
    }

    if accepted.is_empty() {
        tracing::warn!(target: "filter", "[{browser}] none of {} candidates accepted", candidates.len());
    } else {
        tracing::info!(target: "filter", "[{browser}] accepted {}/{} candidates", accepted.len(), candidates.len());
    }
    accepted
}

/// Scrapes every browser in order. The first browser that exhausts its
/// retries aborts the whole collection.
pub async fn collect(ctx: &Context<'_>) -> Result<Vec<UserAgent>, FetchError> {
    let mut agents = Vec::new();
    for &browser in ctx.browsers {
        let html = ctx.fetcher.fetch(browser, &ctx.snapshot).await?;
        agents.append(&mut extract(browser, &html, ctx.parser, ctx.filter));
    }
    Ok(agents)
}

pub async fn run(ctx: Context<'_>) -> Result<Report, RunError> {
    let old_json = ctx.snapshot.to_canonical_json();
    tracing::info!(target: "main", "old_user_agents = {old_json}");
    ctx.snapshot.ensure_min(MIN_AGENTS)?;

    let agents = collect(&ctx).await?;
    let new_json = canonical_json(&agents);
    tracing::info!(target: "main", "new_user_agents = {new_json}");
    if agents.len() < MIN_AGENTS {
        return Err(RunError::TooFewScraped {
            found: agents.len(),
            required: MIN_AGENTS,
        });
    }

    if let Some(path) = ctx.output.as_ref().filter(|_| old_json != new_json) {
        tokio::fs::write(path, &new_json)
            .await
            .map_err(|source| RunError::Output { path: path.clone(), source })?;
        tracing::info!(target: "main", "wrote {}", path.display());
    }

    let outcome = match &ctx.publisher {
        Some(publisher) => Some(publisher.publish(&old_json, &new_json).await?),
        None => {
            tracing::info!(target: "main", "dry run, not publishing");
            None
        }
    };

    Ok(Report {
        agents,
        old_json,
        new_json,
        outcome,
    })
}
