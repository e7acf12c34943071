//! # Stale-Issue Sweep
//!
//! Closes open issues that have carried the sentinel label for longer than
//! the configured threshold. Runs on scheduled ticks only.
//!
//! Each issue is handled on its own: a failed history lookup, close or
//! comment is logged and recorded in the [`SweepReport`], and the sweep moves
//! on to the next issue.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::TriageConfig;
use crate::error::TrackerError;
use crate::models::{latest_event, CloseReason, Issue, IssueState, LabelEvent, LabelEventKind};
use crate::tracker::IssueTracker;

/// An issue the sweep could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    /// `None` when listing the labelled issues failed
    pub issue: Option<u64>,
    pub error: String,
}

/// Results of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Number of labelled open issues examined
    pub examined: usize,
    /// Issues closed by this sweep
    pub closed: Vec<u64>,
    /// Issues still within the threshold
    pub kept: Vec<u64>,
    pub failures: Vec<SweepFailure>,
}

/// Scheduled closer for neglected non-compliant issues.
pub struct StaleSweep {
    tracker: Arc<dyn IssueTracker>,
    label: String,
    threshold: Duration,
    comment: String,
}

impl StaleSweep {
    #[must_use]
    pub fn new(tracker: Arc<dyn IssueTracker>, config: &TriageConfig) -> Self {
        let label = config.labels.needs_info.clone();
        let comment = closing_comment(&label, &config.stale.describe());

        Self {
            tracker,
            label,
            threshold: config.stale.threshold(),
            comment,
        }
    }

    /// Comment posted on every issue the sweep closes.
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Sweep all open issues bearing the sentinel label.
    pub async fn run(&self, now: DateTime<Utc>) -> SweepReport {
        info!(label = %self.label, "Checking for stale issues");
        let mut report = SweepReport::default();

        let issues = match self.tracker.list_issues(&self.label, IssueState::Open).await {
            Ok(issues) => issues,
            Err(e) => {
                error!(error = %e, "Error checking old issues: {e}");
                report.failures.push(SweepFailure {
                    issue: None,
                    error: e.to_string(),
                });
                return report;
            }
        };

        for issue in &issues {
            report.examined += 1;

            match self.process(issue, now).await {
                Ok(true) => report.closed.push(issue.number),
                Ok(false) => report.kept.push(issue.number),
                Err(e) => {
                    error!(issue = issue.number, error = %e, "Error closing stale issue: {e}");
                    report.failures.push(SweepFailure {
                        issue: Some(issue.number),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            examined = report.examined,
            closed = report.closed.len(),
            failed = report.failures.len(),
            "Stale sweep complete"
        );
        report
    }

    /// Close `issue` if it is stale. Returns whether it was closed.
    ///
    /// The creation-time fallback covers a history with no application of
    /// the label. A history that cannot be fetched is an error for this issue.
    async fn process(&self, issue: &Issue, now: DateTime<Utc>) -> Result<bool, TrackerError> {
        let events = self.tracker.label_events(issue.number).await?;
        let marked = marked_at(&events, &self.label, issue.created_at);

        if !is_stale(marked, now, self.threshold) {
            debug!(issue = issue.number, marked_at = %marked, "Issue within threshold");
            return Ok(false);
        }

        self.tracker
            .close_issue(issue.number, CloseReason::NotPlanned)
            .await?;
        self.tracker
            .create_comment(issue.number, &self.comment)
            .await?;

        info!(issue = issue.number, marked_at = %marked, "Closed stale issue");
        Ok(true)
    }
}

/// When `label` was last applied, or `created_at` when the history has no
/// such event.
#[must_use]
pub fn marked_at(events: &[LabelEvent], label: &str, created_at: DateTime<Utc>) -> DateTime<Utc> {
    latest_event(events, label, LabelEventKind::Applied).map_or(created_at, |e| e.created_at)
}

/// Strictly older than `threshold` at `now`. A cutoff before the earliest
/// representable time means nothing is stale.
#[must_use]
pub fn is_stale(marked_at: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now.checked_sub_signed(threshold).is_some_and(|cutoff| marked_at < cutoff)
}

/// The comment explaining an automatic close.
#[must_use]
pub fn closing_comment(label: &str, threshold: &str) -> String {
    format!(
        "This issue has been automatically closed because it was marked as `{label}` for more than {threshold} without updates.
If the problem persists, please file a new issue and complete the issue template so we can capture all the details necessary to investigate further."
    )
}
