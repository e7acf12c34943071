//! # Label/Comment Orchestrator
//!
//! Drives the sentinel-label state machine for one trigger.
//!
//! ## States
//!
//! - **Unmarked**: the issue does not carry the sentinel label.
//! - **Marked**: the issue carries the sentinel label.
//!
//! ## Transitions
//!
//! | verdict       | state    | human removed label last | action                     |
//! |---------------|----------|--------------------------|----------------------------|
//! | non-compliant | unmarked | no                       | add label, post nudge      |
//! | non-compliant | unmarked | yes                      | none (manual override)     |
//! | non-compliant | marked   | -                        | none                       |
//! | compliant     | marked   | -                        | remove label               |
//! | compliant     | unmarked | -                        | none                       |
//!
//! Tracker failures are logged and turn the action for that issue into a
//! no-op. Nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{LabelConfig, TriageConfig};
use crate::error::{ConfigError, TrackerError};
use crate::event::{IssueEvent, Trigger};
use crate::models::{latest_event, IssueCategory, LabelEvent, LabelEventKind, Verdict};
use crate::sweep::{StaleSweep, SweepReport};
use crate::tracker::{short_hash, IssueTracker};
use crate::validator::Validator;

/// Presence of the sentinel label on an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelState {
    Unmarked,
    Marked,
}

/// Action the state machine picks for one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Add the label and post the nudge comment
    Mark,
    /// Remove the label
    Unmark,
    /// Leave the issue alone
    Stay,
    /// Leave the issue alone because a person removed the label
    RespectOverride,
}

/// Pick the transition for a verdict.
///
/// `manually_cleared` is only consulted for non-compliant, unmarked issues.
#[must_use]
pub const fn decide_transition(
    compliant: bool,
    state: LabelState,
    manually_cleared: bool,
) -> Transition {
    match (compliant, state) {
        (false, LabelState::Unmarked) if manually_cleared => Transition::RespectOverride,
        (false, LabelState::Unmarked) => Transition::Mark,
        (true, LabelState::Marked) => Transition::Unmark,
        _ => Transition::Stay,
    }
}

/// Whether the most recent removal of `label` was made by a person.
#[must_use]
pub fn manually_cleared(events: &[LabelEvent], label: &str) -> bool {
    latest_event(events, label, LabelEventKind::Removed).is_some_and(|e| !e.actor_is_automated)
}

/// What happened to one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IssueOutcome {
    /// Neither a bug report nor a feature request
    Ignored,
    Marked,
    Unmarked,
    Unchanged,
    /// Non-compliant, but a person removed the label
    ManualOverride,
    /// A tracker call failed; the issue was left as it was
    Failed { error: String },
}

/// Result of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "run", rename_all = "snake_case")]
pub enum RunReport {
    /// The nightly hash could not be resolved; nothing was done
    Aborted { reason: String },
    Issue { number: u64, outcome: IssueOutcome },
    Sweep(SweepReport),
    /// The trigger is not one the bot handles
    Skipped { event: String },
}

/// Issue-template enforcement for one repository.
pub struct Orchestrator {
    tracker: Arc<dyn IssueTracker>,
    validator: Validator,
    labels: LabelConfig,
    nightly_tag: String,
    sweep: StaleSweep,
}

impl Orchestrator {
    /// Build an orchestrator, compiling the configured template patterns.
    pub fn new(tracker: Arc<dyn IssueTracker>, config: &TriageConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            validator: Validator::new(config)?,
            labels: config.labels.clone(),
            nightly_tag: config.nightly_tag.clone(),
            sweep: StaleSweep::new(Arc::clone(&tracker), config),
            tracker,
        })
    }

    #[must_use]
    pub const fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Handle one trigger to completion.
    pub async fn run(&self, trigger: &Trigger, now: DateTime<Utc>) -> RunReport {
        let hash = match self.reference_hash().await {
            Ok(hash) => hash,
            Err(reason) => return RunReport::Aborted { reason },
        };

        match trigger {
            Trigger::Schedule => RunReport::Sweep(self.sweep(now).await),
            Trigger::Issue(event) => RunReport::Issue {
                number: event.number,
                outcome: self.handle_issue(event, &hash).await,
            },
            Trigger::Other(name) => {
                debug!(event = %name, "Ignoring unsupported event");
                RunReport::Skipped {
                    event: name.clone(),
                }
            }
        }
    }

    /// Abbreviated hash of the nightly tag.
    ///
    /// Failures are logged here; the returned reason only feeds the report.
    pub async fn reference_hash(&self) -> Result<String, String> {
        match self.tracker.tag_sha(&self.nightly_tag).await {
            Ok(sha) => {
                let hash = short_hash(&sha);
                debug!(tag = %self.nightly_tag, hash = %hash, "Resolved nightly hash");
                Ok(hash)
            }
            Err(e) if e.is_not_found() => {
                error!(tag = %self.nightly_tag, "Nightly tag not found");
                Err(format!("tag '{}' not found", self.nightly_tag))
            }
            Err(e) => {
                error!(error = %e, "Error fetching nightly version: {e}");
                Err(e.to_string())
            }
        }
    }

    /// Run the stale-issue sweep.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        self.sweep.run(now).await
    }

    /// Validate an issue and apply the resulting label transition.
    pub async fn handle_issue(&self, event: &IssueEvent, hash: &str) -> IssueOutcome {
        match self.try_handle_issue(event, hash).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(issue = event.number, error = %e, "Error updating labels: {e}");
                IssueOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn try_handle_issue(
        &self,
        event: &IssueEvent,
        hash: &str,
    ) -> Result<IssueOutcome, TrackerError> {
        let number = event.number;
        let labels = self.tracker.issue_labels(number).await?;

        let Some(category) =
            IssueCategory::from_labels(&labels, &self.labels.bug, &self.labels.feature)
        else {
            debug!(issue = number, "Not a bug report or feature request");
            return Ok(IssueOutcome::Ignored);
        };

        let verdict = self
            .validator
            .check(&event.creator, &event.body, hash, category);
        let state = if labels.iter().any(|l| *l == self.labels.needs_info) {
            LabelState::Marked
        } else {
            LabelState::Unmarked
        };

        debug!(
            issue = number,
            category = category.as_str(),
            compliant = verdict.is_compliant(),
            ?state,
            "Validated issue"
        );

        // History is only needed when the issue is about to be marked.
        let cleared = if !verdict.is_compliant() && state == LabelState::Unmarked {
            let events = self.tracker.label_events(number).await?;
            manually_cleared(&events, &self.labels.needs_info)
        } else {
            false
        };

        match decide_transition(verdict.is_compliant(), state, cleared) {
            Transition::Mark => {
                let Verdict::NonCompliant { message } = &verdict else {
                    return Ok(IssueOutcome::Unchanged);
                };
                self.tracker
                    .add_label(number, &self.labels.needs_info)
                    .await?;
                self.tracker.create_comment(number, message).await?;
                info!(issue = number, creator = %event.creator, "Marked issue as needing info");
                Ok(IssueOutcome::Marked)
            }
            Transition::Unmark => {
                self.tracker
                    .remove_label(number, &self.labels.needs_info)
                    .await?;
                info!(issue = number, "Issue now follows the template");
                Ok(IssueOutcome::Unmarked)
            }
            Transition::RespectOverride => {
                warn!(
                    issue = number,
                    label = %self.labels.needs_info,
                    "Label was removed manually, not reapplying"
                );
                Ok(IssueOutcome::ManualOverride)
            }
            Transition::Stay => Ok(IssueOutcome::Unchanged),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_transitions() {
        use LabelState::{Marked, Unmarked};

        assert_eq!(decide_transition(false, Unmarked, false), Transition::Mark);
        assert_eq!(
            decide_transition(false, Unmarked, true),
            Transition::RespectOverride
        );
        assert_eq!(decide_transition(false, Marked, false), Transition::Stay);
        assert_eq!(decide_transition(false, Marked, true), Transition::Stay);
        assert_eq!(decide_transition(true, Marked, false), Transition::Unmark);
        assert_eq!(decide_transition(true, Marked, true), Transition::Unmark);
        assert_eq!(decide_transition(true, Unmarked, false), Transition::Stay);
        assert_eq!(decide_transition(true, Unmarked, true), Transition::Stay);
    }

    #[test]
    fn test_manually_cleared() {
        let t0 = Utc::now() - Duration::days(1);
        let bot_applied = LabelEvent::applied("needs info", "github-actions[bot]", true, t0);

        assert!(!manually_cleared(&[], "needs info"));
        assert!(!manually_cleared(std::slice::from_ref(&bot_applied), "needs info"));

        let human = vec![
            bot_applied.clone(),
            LabelEvent::removed("needs info", "sxyazi", false, t0 + Duration::hours(1)),
        ];
        assert!(manually_cleared(&human, "needs info"));

        let bot_removed_last = vec![
            bot_applied,
            LabelEvent::removed("needs info", "sxyazi", false, t0 + Duration::hours(1)),
            LabelEvent::applied("needs info", "github-actions[bot]", true, t0 + Duration::hours(2)),
            LabelEvent::removed("needs info", "github-actions[bot]", true, t0 + Duration::hours(3)),
        ];
        assert!(!manually_cleared(&bot_removed_last, "needs info"));

        let other_label = vec![LabelEvent::removed("bug", "sxyazi", false, t0)];
        assert!(!manually_cleared(&other_label, "needs info"));
    }
}
