//! Work enumeration: which repositories to poll and which jobs to run

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::config::PollConfig;
use crate::types::{FetchJob, GroupId, RepoSummary, StatusFilter};

/// Ordered set of status filters queried for every group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusFilterSet(Vec<StatusFilter>);

impl StatusFilterSet {
    /// `in_progress` and `queued`, plus `completed` when a lookback is configured
    pub fn from_config(poll: &PollConfig) -> Self {
        let mut filters = vec![StatusFilter::InProgress, StatusFilter::Queued];
        if poll.completed_since_hours.is_some() {
            filters.push(StatusFilter::Completed);
        }
        Self(filters)
    }

    /// Explicit filter list
    pub fn new(filters: Vec<StatusFilter>) -> Self {
        Self(filters)
    }

    /// Filters in query order
    pub fn as_slice(&self) -> &[StatusFilter] {
        &self.0
    }

    /// Whether completed runs are queried
    pub fn includes_completed(&self) -> bool {
        self.0.contains(&StatusFilter::Completed)
    }
}

/// Start of the completed-runs window: `now - hours`
pub fn completed_window_start(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    now - Duration::hours(i64::from(hours))
}

/// `created` query value for a lower bound, e.g. `>=2024-01-01T02:00:00+00:00`
pub fn created_filter_value(since: DateTime<Utc>) -> String {
    format!(">={}", since.to_rfc3339_opts(SecondsFormat::Secs, false))
}

/// Expand groups × filters into fetch jobs, group-major in input order
///
/// Every (group, filter) pair is unique by construction, so no deduplication
/// happens here.
pub fn plan_jobs(
    groups: &[GroupId],
    filters: &StatusFilterSet,
    created_since: Option<DateTime<Utc>>,
) -> Vec<FetchJob> {
    groups
        .iter()
        .flat_map(|group| {
            filters.as_slice().iter().map(move |&filter| FetchJob {
                group: group.clone(),
                filter,
                created_since: match filter {
                    StatusFilter::Completed => created_since,
                    StatusFilter::InProgress | StatusFilter::Queued => None,
                },
            })
        })
        .collect()
}

/// Pick the repositories worth polling
///
/// With `fetch_all` every repository is kept. Otherwise only repositories
/// pushed to after `now - activity_window` are kept; a missing or unparseable
/// `pushed_at` counts as inactive.
pub fn select_active_groups(
    repos: &[RepoSummary],
    fetch_all: bool,
    activity_window: Duration,
    now: DateTime<Utc>,
) -> Vec<GroupId> {
    if fetch_all {
        return repos.iter().map(|r| GroupId::new(r.name.clone())).collect();
    }

    let cutoff = now - activity_window;
    repos
        .iter()
        .filter(|repo| {
            repo.pushed_at
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .is_some_and(|pushed| pushed.with_timezone(&Utc) > cutoff)
        })
        .map(|r| GroupId::new(r.name.clone()))
        .collect()
}
