use clap::Parser;
use lua::{
    config::{Args, Config},
    fetch::{Fetcher, HttpSource},
    filter::OsFilter,
    parse::CodeSpanParser,
    pipeline::{self, Context},
    publish::{GitHubApi, Outcome, Publisher},
    retry::TokioSleep,
    snapshot::Snapshot,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_timed();

    let config = Config::from_args(Args::parse())?;
    let snapshot = Snapshot::load(&config.snapshot).await?;

    let source = HttpSource::new(config.timeout)?;
    let api = match &config.credentials {
        Some(c) => Some(GitHubApi::new(&config.api_url, &c.repository, &c.token, config.timeout)?),
        None => None,
    };
    let parser = CodeSpanParser::default();
    let filter = OsFilter::default();

    let ctx = Context {
        snapshot,
        browsers: &config.browsers,
        fetcher: Fetcher {
            source: &source,
            sleeper: &TokioSleep,
            policy: config.retry,
            relay: &config.relay_url,
        },
        parser: &parser,
        filter: &filter,
        publisher: api.as_ref().map(|api| Publisher {
            api,
            file_name: &config.file_name,
            branches: &config.branches,
        }),
        output: config.output.clone(),
    };

    let report = pipeline::run(ctx).await?;
    match &report.outcome {
        Some(Outcome::Published(branches)) => {
            tracing::info!(target: "main", "\x1b[36mpublished {} user agents to {}\x1b[0m", report.agents.len(), branches.join(", "));
        }
        Some(Outcome::Unchanged) => tracing::info!(target: "main", "user agents are up to date"),
        None if report.changed() => tracing::info!(target: "main", "user agents changed ({} entries)", report.agents.len()),
        None => tracing::info!(target: "main", "user agents are up to date"),
    }

    Ok(())
}
