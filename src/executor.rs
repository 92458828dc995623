//! Bounded concurrent execution of fetch jobs
//!
//! Each job runs on its own tokio task, so jobs execute in parallel on the
//! multi-threaded runtime. `buffer_unordered` keeps at most
//! `max_concurrency` of those tasks alive and spawns the next job as soon as
//! any slot frees up, regardless of submission order. Each task merges its
//! own runs into the [`SharedAggregate`] before finishing.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;

use crate::aggregate::{AggregateResult, SharedAggregate};
use crate::client::RunSource;
use crate::error::FetchError;
use crate::types::{FetchJob, JobWarning, PollProgress};

/// Everything one poll cycle produced
#[derive(Debug)]
pub struct PollReport {
    /// Runs per group (read-only from here on)
    pub aggregate: AggregateResult,
    /// Non-fatal job failures, ordered by group then filter
    pub warnings: Vec<JobWarning>,
    /// Number of jobs executed
    pub total_jobs: usize,
}

/// Runs fetch jobs against a [`RunSource`] under a concurrency cap
pub struct Executor {
    source: Arc<dyn RunSource>,
    max_concurrency: usize,
    progress_tx: watch::Sender<PollProgress>,
}

impl Executor {
    /// Create an executor; a cap of zero is treated as one
    pub fn new(source: Arc<dyn RunSource>, max_concurrency: usize) -> Self {
        let (progress_tx, _rx) = watch::channel(PollProgress::default());
        Self {
            source,
            max_concurrency: max_concurrency.max(1),
            progress_tx,
        }
    }

    /// Observe completed/total job counts of the running cycle
    pub fn subscribe(&self) -> watch::Receiver<PollProgress> {
        self.progress_tx.subscribe()
    }

    /// Concurrency cap in effect
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run every job to completion and return the merged result
    ///
    /// No job is dropped: a job whose task panics is reported as a
    /// [`FetchError::TaskFailed`] warning.
    pub async fn execute(&self, jobs: Vec<FetchJob>) -> PollReport {
        let total = jobs.len();
        self.progress_tx
            .send_replace(PollProgress { completed: 0, total });

        tracing::debug!(
            jobs = total,
            max_concurrency = self.max_concurrency,
            "Starting poll cycle"
        );

        let aggregate = SharedAggregate::new();
        let mut completed = 0;

        let outcomes: Vec<Option<JobWarning>> = stream::iter(jobs)
            .map(|job| {
                let source = Arc::clone(&self.source);
                let aggregate = aggregate.clone();
                let group = job.group.clone();
                let filter = job.filter;

                let handle = tokio::spawn(async move {
                    let (runs, warning) = source.fetch_runs(&job).await.into_parts();
                    aggregate.merge(&job.group, runs).await;
                    warning
                });

                async move {
                    let warning = match handle.await {
                        Ok(warning) => warning,
                        Err(e) => Some(JobWarning {
                            group,
                            filter,
                            error: FetchError::TaskFailed(e.to_string()),
                        }),
                    };
                    if let Some(w) = &warning {
                        tracing::warn!(
                            repo = %w.group,
                            status = %w.filter,
                            http_status = w.error.status_code(),
                            error = %w.error,
                            "Fetch job failed, continuing with partial results"
                        );
                    }
                    warning
                }
            })
            .buffer_unordered(self.max_concurrency)
            .inspect(|_| {
                completed += 1;
                self.progress_tx.send_replace(PollProgress { completed, total });
            })
            .collect()
            .await;

        let mut warnings: Vec<JobWarning> = outcomes.into_iter().flatten().collect();
        warnings.sort_by(|a, b| (&a.group, a.filter).cmp(&(&b.group, b.filter)));

        let aggregate = aggregate.take().await;
        tracing::debug!(
            jobs = total,
            groups = aggregate.group_count(),
            runs = aggregate.run_count(),
            warnings = warnings.len(),
            "Poll cycle finished"
        );

        PollReport {
            aggregate,
            warnings,
            total_jobs: total,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{StatusFilterSet, plan_jobs};
    use crate::types::{GroupId, JobOutcome, RawRun, RunStatus, StatusFilter};
    use async_trait::async_trait;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn run(id: u64) -> RawRun {
        RawRun {
            id,
            name: None,
            status: RunStatus::InProgress,
            conclusion: None,
            run_started_at: Some("2024-01-01T10:00:00Z".to_string()),
            display_title: format!("run {id}"),
            html_url: String::new(),
            created_at: None,
        }
    }

    /// Source that answers each job with one run after a per-job delay
    struct LatencySource {
        plan: HashMap<(GroupId, StatusFilter), (u64, Duration)>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl LatencySource {
        fn new(jobs: &[FetchJob], seed: u64) -> Self {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let plan = jobs
                .iter()
                .enumerate()
                .map(|(i, job)| {
                    let delay = Duration::from_millis(rng.gen_range(0..15));
                    ((job.group.clone(), job.filter), (i as u64, delay))
                })
                .collect();
            Self {
                plan,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RunSource for LatencySource {
        async fn fetch_runs(&self, job: &FetchJob) -> JobOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let (id, delay) = self.plan[&(job.group.clone(), job.filter)];
            tokio::time::sleep(delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            JobOutcome::Complete {
                runs: vec![run(id)],
            }
        }
    }

    /// Source with a fixed outcome per job
    struct ScriptedSource;

    #[async_trait]
    impl RunSource for ScriptedSource {
        async fn fetch_runs(&self, job: &FetchJob) -> JobOutcome {
            match (job.group.as_str(), job.filter) {
                ("busy", _) => JobOutcome::Complete {
                    runs: vec![run(1), run(2)],
                },
                ("flaky", StatusFilter::Queued) => JobOutcome::Warning {
                    runs: vec![run(3)],
                    warning: JobWarning {
                        group: job.group.clone(),
                        filter: job.filter,
                        error: FetchError::Status { status: 502 },
                    },
                },
                ("broken", StatusFilter::InProgress) => panic!("simulated crash"),
                _ => JobOutcome::Complete { runs: Vec::new() },
            }
        }
    }

    fn groups(n: usize) -> Vec<GroupId> {
        (0..n).map(|i| GroupId::new(format!("repo-{i:03}"))).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_job_contributes_exactly_once_under_random_latency() {
        let filters = StatusFilterSet::new(vec![
            StatusFilter::InProgress,
            StatusFilter::Queued,
            StatusFilter::Completed,
        ]);

        for (seed, group_count, cap) in [(1, 30, 4), (2, 17, 1), (3, 50, 40), (4, 5, 64), (5, 40, 7)]
        {
            let jobs = plan_jobs(&groups(group_count), &filters, None);
            let n = jobs.len();
            let source = Arc::new(LatencySource::new(&jobs, seed));
            let executor = Executor::new(source.clone(), cap);

            let report = executor.execute(jobs).await;

            let mut ids: Vec<u64> = report
                .aggregate
                .iter()
                .flat_map(|(_, runs)| runs.iter().map(|r| r.id))
                .collect();
            ids.sort_unstable();
            assert_eq!(
                ids,
                (0..n as u64).collect::<Vec<_>>(),
                "seed {seed}: no run lost or duplicated"
            );
            assert_eq!(source.calls.load(Ordering::SeqCst), n);
            assert!(
                source.peak.load(Ordering::SeqCst) <= cap,
                "seed {seed}: peak {} exceeded cap {cap}",
                source.peak.load(Ordering::SeqCst)
            );
            assert_eq!(report.total_jobs, n);
            assert!(report.warnings.is_empty());
            for (_, runs) in report.aggregate.iter() {
                assert_eq!(runs.len(), 3, "one run per filter");
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cap_is_reached_when_enough_jobs_exist() {
        let filters = StatusFilterSet::new(vec![StatusFilter::Queued]);
        let jobs = plan_jobs(&groups(40), &filters, None);
        let mut source = LatencySource::new(&jobs, 9);
        for (_, delay) in source.plan.values_mut() {
            *delay = Duration::from_millis(30);
        }
        let source = Arc::new(source);

        Executor::new(source.clone(), 8).execute(jobs).await;

        assert_eq!(source.peak.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn empty_jobs_add_no_entries_and_warnings_keep_partial_runs() {
        let jobs = plan_jobs(
            &[
                GroupId::new("busy"),
                GroupId::new("idle"),
                GroupId::new("flaky"),
            ],
            &StatusFilterSet::new(vec![StatusFilter::InProgress, StatusFilter::Queued]),
            None,
        );

        let report = Executor::new(Arc::new(ScriptedSource), 2).execute(jobs).await;

        assert!(report.aggregate.get(&GroupId::new("idle")).is_none());
        assert_eq!(report.aggregate.get(&GroupId::new("busy")).unwrap().len(), 4);
        assert_eq!(report.aggregate.get(&GroupId::new("flaky")).unwrap().len(), 1);

        assert_eq!(report.warnings.len(), 1);
        let w = &report.warnings[0];
        assert_eq!(w.group, GroupId::new("flaky"));
        assert_eq!(w.filter, StatusFilter::Queued);
        assert_eq!(w.error.status_code(), Some(502));
    }

    #[tokio::test]
    async fn panicking_job_is_reported_not_dropped() {
        let jobs = plan_jobs(
            &[GroupId::new("broken"), GroupId::new("busy")],
            &StatusFilterSet::new(vec![StatusFilter::InProgress]),
            None,
        );

        let report = Executor::new(Arc::new(ScriptedSource), 4).execute(jobs).await;

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].group, GroupId::new("broken"));
        assert!(matches!(
            report.warnings[0].error,
            FetchError::TaskFailed(_)
        ));
        assert_eq!(report.aggregate.get(&GroupId::new("busy")).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let jobs = plan_jobs(
            &groups(6),
            &StatusFilterSet::new(vec![StatusFilter::InProgress, StatusFilter::Queued]),
            None,
        );
        let source = Arc::new(LatencySource::new(&jobs, 11));
        let executor = Executor::new(source, 3);
        let progress = executor.subscribe();

        executor.execute(jobs).await;

        let last = *progress.borrow();
        assert_eq!(
            last,
            PollProgress {
                completed: 12,
                total: 12
            }
        );
        assert!(last.is_done());
    }

    #[tokio::test]
    async fn zero_cap_is_clamped_to_one() {
        let executor = Executor::new(Arc::new(ScriptedSource), 0);
        assert_eq!(executor.max_concurrency(), 1);
        let report = executor.execute(Vec::new()).await;
        assert_eq!(report.total_jobs, 0);
        assert!(report.aggregate.is_empty());
    }
}
