//! Poll cycle orchestration
//!
//! One cycle runs: list repositories -> keep recently active ones -> plan
//! (repo × status) jobs -> execute them concurrently -> present the merged,
//! sorted records. Listing failures abort the cycle before any job is
//! scheduled; job failures only produce warnings.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use crate::client::{GitHubClient, GitHubRunSource, RunSource};
use crate::config::Config;
use crate::error::Result;
use crate::executor::{Executor, PollReport};
use crate::plan::{StatusFilterSet, completed_window_start, plan_jobs, select_active_groups};
use crate::present::{PresentationRecord, present};
use crate::types::{GroupId, JobWarning, PollProgress};

/// Result of a full poll cycle
#[derive(Debug)]
pub struct PollSnapshot {
    /// Records in ascending start-time order
    pub records: Vec<PresentationRecord>,
    /// Jobs that failed (their partial runs are still included)
    pub warnings: Vec<JobWarning>,
    /// Repositories that were polled
    pub groups_polled: usize,
}

/// Polls workflow runs for the repositories of an organization
pub struct ActionsPoller {
    config: Arc<Config>,
    client: Arc<GitHubClient>,
    progress_tx: watch::Sender<PollProgress>,
}

impl ActionsPoller {
    /// Validate configuration and build the API client
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or no token is set
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = GitHubClient::new(&config.api, config.retry.clone())?;
        let (progress_tx, _rx) = watch::channel(PollProgress::default());

        tracing::debug!(
            base_url = %config.api.base_url,
            max_concurrent_requests = config.poll.max_concurrent_requests,
            completed_since_hours = ?config.poll.completed_since_hours,
            "Poller initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            client: Arc::new(client),
            progress_tx,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Observe job progress of the current (or last) cycle
    pub fn subscribe(&self) -> watch::Receiver<PollProgress> {
        self.progress_tx.subscribe()
    }

    /// List the organization's repositories and keep the ones worth polling
    ///
    /// # Errors
    /// Fatal if the repository listing fails
    pub async fn discover_groups(&self, org: &str) -> Result<Vec<GroupId>> {
        self.discover_groups_at(org, Utc::now()).await
    }

    async fn discover_groups_at(&self, org: &str, now: DateTime<Utc>) -> Result<Vec<GroupId>> {
        let repos = self.client.list_repositories(org).await?;
        let poll = &self.config.poll;
        let groups = select_active_groups(
            &repos,
            poll.fetch_all_groups,
            poll.effective_activity_window(),
            now,
        );

        tracing::info!(
            org,
            repos = repos.len(),
            selected = groups.len(),
            fetch_all = poll.fetch_all_groups,
            "Found repositories"
        );

        Ok(groups)
    }

    /// Poll the given repositories of `org`
    pub async fn poll_groups(&self, org: &str, groups: &[GroupId]) -> PollReport {
        let source = Arc::new(GitHubRunSource::new(Arc::clone(&self.client), org));
        self.poll_with_source(source, groups, Utc::now()).await
    }

    /// Poll the given repositories through an arbitrary [`RunSource`]
    pub async fn poll_with_source(
        &self,
        source: Arc<dyn RunSource>,
        groups: &[GroupId],
        now: DateTime<Utc>,
    ) -> PollReport {
        let poll = &self.config.poll;
        let filters = StatusFilterSet::from_config(poll);
        let created_since = poll
            .completed_since_hours
            .map(|hours| completed_window_start(now, hours));
        let jobs = plan_jobs(groups, &filters, created_since);

        let executor = Executor::new(source, poll.max_concurrent_requests);
        let forward = self.forward_progress(executor.subscribe());
        let report = executor.execute(jobs).await;
        drop(executor);
        if let Err(e) = forward.await {
            tracing::debug!(error = %e, "Progress forwarding task ended abnormally");
        }

        report
    }

    /// Mirror an executor's progress into this poller's channel
    fn forward_progress(
        &self,
        mut rx: watch::Receiver<PollProgress>,
    ) -> tokio::task::JoinHandle<()> {
        let tx = self.progress_tx.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let progress = *rx.borrow_and_update();
                tx.send_replace(progress);
            }
        })
    }

    /// Run a complete poll cycle for `org`
    ///
    /// # Errors
    /// Fatal if the repository listing fails; no job is scheduled in that case
    pub async fn run(&self, org: &str) -> Result<PollSnapshot> {
        let groups = self.discover_groups(org).await?;
        let report = self.poll_groups(org, &groups).await;
        Ok(self.snapshot(report, groups.len()))
    }

    fn snapshot(&self, report: PollReport, groups_polled: usize) -> PollSnapshot {
        let records = present(report.aggregate, self.config.poll.show_urls);

        if !report.warnings.is_empty() {
            tracing::warn!(
                failed_jobs = report.warnings.len(),
                total_jobs = report.total_jobs,
                "Some fetch jobs failed; results are partial"
            );
        }

        PollSnapshot {
            records,
            warnings: report.warnings,
            groups_polled,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::types::{FetchJob, JobOutcome, RawRun, RunStatus, StatusFilter};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn test_config(max_concurrent: usize) -> Config {
        let mut config = Config::default();
        config.api.token = Some("t".to_string());
        config.api.base_url = "http://127.0.0.1:9".to_string();
        config.poll.max_concurrent_requests = max_concurrent;
        config.retry = RetryConfig::disabled();
        config
    }

    fn run(started: &str, status: RunStatus) -> RawRun {
        RawRun {
            id: 0,
            name: None,
            status,
            conclusion: None,
            run_started_at: Some(started.to_string()),
            display_title: format!("{status:?}"),
            html_url: String::new(),
            created_at: None,
        }
    }

    /// Records every job it receives and answers from a fixed table
    #[derive(Default)]
    struct RecordingSource {
        seen: Mutex<Vec<FetchJob>>,
    }

    #[async_trait]
    impl RunSource for RecordingSource {
        async fn fetch_runs(&self, job: &FetchJob) -> JobOutcome {
            self.seen.lock().unwrap().push(job.clone());
            let runs = match (job.group.as_str(), job.filter) {
                ("a", StatusFilter::InProgress) => {
                    vec![run("2024-01-01T10:00:00Z", RunStatus::InProgress)]
                }
                ("a", StatusFilter::Completed) => {
                    vec![run("2024-01-01T09:00:00Z", RunStatus::Completed)]
                }
                _ => Vec::new(),
            };
            JobOutcome::Complete { runs }
        }
    }

    #[test]
    fn new_rejects_missing_token() {
        let err = ActionsPoller::new(Config::default()).err();
        assert!(matches!(err, Some(crate::Error::MissingCredential)));
    }

    #[tokio::test]
    async fn two_group_scenario_yields_sorted_records_for_a_only() {
        let poller = ActionsPoller::new(test_config(4)).unwrap();
        let source = Arc::new(RecordingSource::default());
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let report = poller
            .poll_with_source(
                source.clone(),
                &[GroupId::new("a"), GroupId::new("b")],
                now,
            )
            .await;

        assert!(report.aggregate.get(&GroupId::new("b")).is_none());
        let snapshot = poller.snapshot(report, 2);
        let starts: Vec<String> = snapshot
            .records
            .iter()
            .map(|r| match &r.started_at {
                crate::normalize::StartTime::At(dt) => dt.with_timezone(&Utc).to_rfc3339(),
                other => panic!("unexpected start time {other:?}"),
            })
            .collect();
        assert_eq!(
            starts,
            vec!["2024-01-01T09:00:00+00:00", "2024-01-01T10:00:00+00:00"]
        );
        assert!(snapshot.records.iter().all(|r| r.group == GroupId::new("a")));
        assert!(snapshot.warnings.is_empty());

        // 2 groups × (in_progress, queued, completed)
        let seen = source.seen.lock().unwrap();
        assert_eq!(seen.len(), 6);
        let completed = seen
            .iter()
            .find(|j| j.filter == StatusFilter::Completed)
            .unwrap();
        assert_eq!(
            completed.created_since,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn disabled_lookback_skips_completed_jobs() {
        let mut config = test_config(2);
        config.poll.completed_since_hours = None;
        let poller = ActionsPoller::new(config).unwrap();
        let source = Arc::new(RecordingSource::default());

        poller
            .poll_with_source(source.clone(), &[GroupId::new("a")], Utc::now())
            .await;

        let seen = source.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|j| j.filter != StatusFilter::Completed));
    }

    #[tokio::test]
    async fn progress_is_forwarded_to_subscribers() {
        let poller = ActionsPoller::new(test_config(2)).unwrap();
        let progress = poller.subscribe();

        poller
            .poll_with_source(
                Arc::new(RecordingSource::default()),
                &[GroupId::new("a"), GroupId::new("b"), GroupId::new("c")],
                Utc::now(),
            )
            .await;

        assert_eq!(
            *progress.borrow(),
            PollProgress {
                completed: 9,
                total: 9
            }
        );
    }
}
