//! actions-top - poll live and recent GitHub Actions runs of an organization.
//!
//! Records are written to stdout as JSON lines; logs go to stderr.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use actions_top::{ActionsPoller, Config, JsonLinesPresenter, Presenter};

/// Monitor pending/in-progress GitHub Actions runs for an org
#[derive(Parser)]
#[command(name = "actions-top")]
#[command(about = "Monitor pending/in-progress GitHub Actions runs for an org", long_about = None)]
struct Cli {
    /// GitHub organization name
    org: String,

    /// GitHub access token
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Also show completed runs from the last N hours
    #[arg(long, default_value_t = 8)]
    include_completed_since_hours: u32,

    /// Do not query completed runs at all
    #[arg(long)]
    no_completed: bool,

    /// Only poll repos pushed to within the last N hours (default: twice the completed window)
    #[arg(long)]
    activity_window_hours: Option<u32>,

    /// Do not filter repos by recent pushes and query all of them (will take longer)
    #[arg(long)]
    fetch_all_repos: bool,

    /// Include run URLs in the output
    #[arg(long)]
    show_urls: bool,

    /// Maximum number of requests in flight
    #[arg(long, default_value_t = 40)]
    max_concurrency: usize,

    /// API root, for GitHub Enterprise installations
    #[arg(long, default_value = "https://api.github.com")]
    api_url: String,
}

impl Cli {
    fn into_config(self) -> (String, Config) {
        let mut config = Config::default();
        config.api.base_url = self.api_url;
        config.api.token = self.token;
        config.poll.max_concurrent_requests = self.max_concurrency;
        config.poll.completed_since_hours =
            (!self.no_completed).then_some(self.include_completed_since_hours);
        config.poll.activity_window_hours = self.activity_window_hours;
        config.poll.fetch_all_groups = self.fetch_all_repos;
        config.poll.show_urls = self.show_urls;
        (self.org, config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Respects RUST_LOG; stdout stays reserved for records
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("actions_top=info")))
        .init();

    let (org, config) = Cli::parse().into_config();

    match run(&org, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(org: &str, config: Config) -> actions_top::Result<()> {
    let poller = ActionsPoller::new(config)?;

    let mut progress = poller.subscribe();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = *progress.borrow_and_update();
            tracing::debug!(completed = p.completed, total = p.total, "Polling repos");
        }
    });

    let snapshot = poller.run(org).await?;
    tracing::info!(
        repos = snapshot.groups_polled,
        runs = snapshot.records.len(),
        warnings = snapshot.warnings.len(),
        "Poll complete"
    );

    let mut presenter = JsonLinesPresenter::new(std::io::stdout().lock());
    presenter.present(&snapshot.records)
}
