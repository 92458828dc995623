//! Core types for actions-top

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Identifier of one independently pollable group (a repository name)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    /// Create a new GroupId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for GroupId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status dimension a fetch job queries
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Runs currently executing
    InProgress,
    /// Runs waiting for a runner
    Queued,
    /// Runs that finished (bounded by the lookback window)
    Completed,
}

impl StatusFilter {
    /// Value of the `status` query parameter
    pub fn as_query_value(&self) -> &'static str {
        match self {
            StatusFilter::InProgress => "in_progress",
            StatusFilter::Queued => "queued",
            StatusFilter::Completed => "completed",
        }
    }
}

impl std::fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_query_value())
    }
}

/// One (group, filter) query unit, possibly spanning several pages
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchJob {
    /// Group (repository) to query
    pub group: GroupId,
    /// Status filter for the query
    pub filter: StatusFilter,
    /// Lower bound on run creation time; only applied to `Completed` jobs
    pub created_since: Option<DateTime<Utc>>,
}

impl FetchJob {
    /// Creation-time lower bound that actually applies to this job
    pub fn effective_created_since(&self) -> Option<DateTime<Utc>> {
        match self.filter {
            StatusFilter::Completed => self.created_since,
            StatusFilter::InProgress | StatusFilter::Queued => None,
        }
    }
}

/// Run status as reported by the API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting for a runner
    Queued,
    /// Executing
    InProgress,
    /// Finished
    Completed,
    /// Waiting on an environment protection rule
    Waiting,
    /// Created but not yet queued
    Requested,
    /// Waiting on concurrency group
    Pending,
    /// Any status this crate does not know about
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Label handed to presenters
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Waiting => "waiting",
            RunStatus::Requested => "requested",
            RunStatus::Pending => "pending",
            RunStatus::Unknown => "unknown",
        }
    }
}

/// Run conclusion, present once a run has completed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    /// Finished successfully
    Success,
    /// Finished with a failure
    Failure,
    /// Cancelled by a user or concurrency rule
    Cancelled,
    /// Skipped
    Skipped,
    /// Neutral result
    Neutral,
    /// Exceeded its time limit
    TimedOut,
    /// Needs manual action
    ActionRequired,
    /// Marked stale by GitHub
    Stale,
    /// Failed before any job started
    StartupFailure,
    /// Any conclusion this crate does not know about
    #[serde(other)]
    Unknown,
}

impl RunConclusion {
    /// Label handed to presenters
    pub fn label(&self) -> &'static str {
        match self {
            RunConclusion::Success => "success",
            RunConclusion::Failure => "failure",
            RunConclusion::Cancelled => "cancelled",
            RunConclusion::Skipped => "skipped",
            RunConclusion::Neutral => "neutral",
            RunConclusion::TimedOut => "timed_out",
            RunConclusion::ActionRequired => "action_required",
            RunConclusion::Stale => "stale",
            RunConclusion::StartupFailure => "startup_failure",
            RunConclusion::Unknown => "unknown",
        }
    }
}

/// One workflow run record as returned by the API
///
/// Only the fields the poller normalizes are modelled; everything else in the
/// payload is ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRun {
    /// Run id
    #[serde(default)]
    pub id: u64,
    /// Workflow name
    #[serde(default)]
    pub name: Option<String>,
    /// Current status
    pub status: RunStatus,
    /// Conclusion, absent while the run is not finished
    #[serde(default)]
    pub conclusion: Option<RunConclusion>,
    /// Start timestamp (ISO-8601), may be absent
    #[serde(default)]
    pub run_started_at: Option<String>,
    /// Human-facing title (commit message, PR title, ...)
    #[serde(default)]
    pub display_title: String,
    /// Canonical URL of the run page
    #[serde(default)]
    pub html_url: String,
    /// Creation timestamp (ISO-8601)
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One page of the workflow runs endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct RunsPage {
    /// Runs contained in this page
    #[serde(default)]
    pub workflow_runs: Vec<RawRun>,
}

/// Repository entry from the organization listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    /// Repository name (the group identifier)
    pub name: String,
    /// Last push timestamp (ISO-8601)
    #[serde(default)]
    pub pushed_at: Option<String>,
}

/// Notice recorded when a job could not fetch all of its pages
#[derive(Debug)]
pub struct JobWarning {
    /// Group the failing job queried
    pub group: GroupId,
    /// Filter the failing job queried
    pub filter: StatusFilter,
    /// What went wrong
    pub error: FetchError,
}

impl std::fmt::Display for JobWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "repo {} status {} failed: {}",
            self.group, self.filter, self.error
        )
    }
}

/// Result of a single fetch job
#[derive(Debug)]
pub enum JobOutcome {
    /// Every page was fetched
    Complete {
        /// All runs of the job, in page order
        runs: Vec<RawRun>,
    },
    /// A page failed; `runs` holds whatever earlier pages returned
    Warning {
        /// Runs gathered before the failure (possibly empty)
        runs: Vec<RawRun>,
        /// The failure notice
        warning: JobWarning,
    },
}

impl JobOutcome {
    /// Split into the runs to merge and the optional warning
    pub fn into_parts(self) -> (Vec<RawRun>, Option<JobWarning>) {
        match self {
            JobOutcome::Complete { runs } => (runs, None),
            JobOutcome::Warning { runs, warning } => (runs, Some(warning)),
        }
    }
}

/// Snapshot of executor progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollProgress {
    /// Jobs finished so far
    pub completed: usize,
    /// Jobs in this poll cycle
    pub total: usize,
}

impl PollProgress {
    /// Whether every job of the cycle has finished
    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}
