//! Flattening, global ordering and the hand-off to renderers
//!
//! [`present`] is the only place records are ordered. Rendering (tables,
//! colors) belongs to [`Presenter`] implementations outside the core.

use serde::Serialize;
use std::io::Write;

use crate::aggregate::AggregateResult;
use crate::error::Result;
use crate::normalize::{StartTime, conclusion_label, truncate_title};
use crate::types::GroupId;

/// One normalized run, ready for rendering
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PresentationRecord {
    /// Repository the run belongs to
    pub group: GroupId,
    /// Parsed (or raw) start time
    pub started_at: StartTime,
    /// Start time formatted for display
    pub started_display: String,
    /// Title, truncated for display
    pub title: String,
    /// Status label
    pub status: &'static str,
    /// Conclusion label, `-` when the run has none
    pub conclusion: &'static str,
    /// Run page URL, only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Flatten the aggregate into records sorted ascending by start time
///
/// The sort is stable: records with equal keys keep repository order, then
/// arrival order within a repository.
pub fn present(aggregate: AggregateResult, show_urls: bool) -> Vec<PresentationRecord> {
    let mut records: Vec<PresentationRecord> = aggregate
        .into_iter()
        .flat_map(|(group, runs)| {
            runs.into_iter().map(move |run| {
                let started_at = StartTime::parse(run.run_started_at.as_deref());
                PresentationRecord {
                    group: group.clone(),
                    started_display: started_at.display(),
                    started_at,
                    title: truncate_title(&run.display_title),
                    status: run.status.label(),
                    conclusion: conclusion_label(run.conclusion),
                    url: show_urls.then_some(run.html_url),
                }
            })
        })
        .collect();

    records.sort_by_cached_key(|r| r.started_at.sort_key());
    records
}

/// Receiver of the final, ordered records of a poll cycle
pub trait Presenter {
    /// Render one cycle's records
    fn present(&mut self, records: &[PresentationRecord]) -> Result<()>;
}

/// Writes one JSON object per record
pub struct JsonLinesPresenter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesPresenter<W> {
    /// Wrap a writer
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for JsonLinesPresenter<W> {
    fn present(&mut self, records: &[PresentationRecord]) -> Result<()> {
        for record in records {
            serde_json::to_writer(&mut self.out, record)?;
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(())
    }
}
