//! Group-keyed aggregate of fetched runs
//!
//! The aggregate is the only state shared between fetch jobs. Every mutation
//! goes through the single mutex in [`SharedAggregate`].

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::types::{GroupId, RawRun};

/// Runs per group, each list in arrival order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateResult {
    runs: BTreeMap<GroupId, Vec<RawRun>>,
}

impl AggregateResult {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `runs` to the group's list, creating it if needed
    ///
    /// An empty batch leaves the aggregate untouched, so groups without runs
    /// never get a placeholder entry.
    pub fn merge(&mut self, group: &GroupId, runs: Vec<RawRun>) {
        if runs.is_empty() {
            return;
        }
        match self.runs.get_mut(group) {
            Some(existing) => existing.extend(runs),
            None => {
                self.runs.insert(group.clone(), runs);
            }
        }
    }

    /// Runs of one group
    pub fn get(&self, group: &GroupId) -> Option<&[RawRun]> {
        self.runs.get(group).map(Vec::as_slice)
    }

    /// Number of groups with at least one run
    pub fn group_count(&self) -> usize {
        self.runs.len()
    }

    /// Total number of runs across all groups
    pub fn run_count(&self) -> usize {
        self.runs.values().map(Vec::len).sum()
    }

    /// Whether no runs were collected
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Iterate groups in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &[RawRun])> {
        self.runs.iter().map(|(g, r)| (g, r.as_slice()))
    }
}

impl IntoIterator for AggregateResult {
    type Item = (GroupId, Vec<RawRun>);
    type IntoIter = std::collections::btree_map::IntoIter<GroupId, Vec<RawRun>>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.into_iter()
    }
}

/// Aggregate shared between concurrently running jobs
#[derive(Clone, Debug, Default)]
pub struct SharedAggregate {
    inner: Arc<Mutex<AggregateResult>>,
}

impl SharedAggregate {
    /// Create an empty shared aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one job's runs under the lock
    pub async fn merge(&self, group: &GroupId, runs: Vec<RawRun>) {
        if runs.is_empty() {
            return;
        }
        self.inner.lock().await.merge(group, runs);
    }

    /// Take the final aggregate once every job has finished
    ///
    /// Any handles still alive keep pointing at an emptied aggregate.
    pub async fn take(&self) -> AggregateResult {
        std::mem::take(&mut *self.inner.lock().await)
    }
}
