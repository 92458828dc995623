//! # actions-top
//!
//! Concurrent poller for the live and recently finished GitHub Actions
//! workflow runs of an organization.
//!
//! A poll cycle lists the organization's repositories, keeps the recently
//! active ones, queries every (repository, status) combination in parallel
//! under a concurrency cap, merges the results under a single lock and hands
//! one time-ordered list of records to a [`Presenter`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use actions_top::{ActionsPoller, Config, JsonLinesPresenter, Presenter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.token = std::env::var("GITHUB_TOKEN").ok();
//!
//!     let poller = ActionsPoller::new(config)?;
//!     let snapshot = poller.run("rust-lang").await?;
//!
//!     let mut presenter = JsonLinesPresenter::new(std::io::stdout().lock());
//!     presenter.present(&snapshot.records)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Shared group-keyed aggregate
pub mod aggregate;
/// GitHub REST API client and the run source seam
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Bounded concurrent job execution
pub mod executor;
/// Field normalization
pub mod normalize;
/// Page-until-empty pagination
pub mod pagination;
/// Work enumeration
pub mod plan;
/// Poll cycle orchestration
pub mod poller;
/// Ordering and presenter hand-off
pub mod present;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;

// Re-export commonly used types
pub use aggregate::{AggregateResult, SharedAggregate};
pub use client::{GitHubClient, GitHubRunSource, RunSource};
pub use config::{ApiConfig, Config, PollConfig, RetryConfig};
pub use error::{Error, FetchError, Result};
pub use executor::{Executor, PollReport};
pub use normalize::{SortKey, StartTime};
pub use poller::{ActionsPoller, PollSnapshot};
pub use present::{JsonLinesPresenter, PresentationRecord, Presenter, present};
pub use types::{
    FetchJob, GroupId, JobOutcome, JobWarning, PollProgress, RawRun, RepoSummary, RunConclusion,
    RunStatus, StatusFilter,
};
