//! Domain types shared by the validator, the orchestrator and the trackers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open/closed state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Resolution recorded when an issue is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Completed,
    NotPlanned,
}

impl CloseReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NotPlanned => "not_planned",
        }
    }
}

/// An issue as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number
    pub number: u64,

    /// Body text (empty when the reporter left it blank)
    #[serde(default)]
    pub body: String,

    /// Login of the reporter
    pub creator: String,

    /// Current state
    pub state: IssueState,

    /// Names of the labels currently applied
    #[serde(default)]
    pub labels: Vec<String>,

    /// When the issue was opened
    pub created_at: DateTime<Utc>,
}

/// Whether a label was applied to or removed from an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelEventKind {
    Applied,
    Removed,
}

/// One entry of an issue's label history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEvent {
    pub kind: LabelEventKind,

    /// Label name
    pub label: String,

    /// Login of whoever applied/removed the label
    pub actor: String,

    /// Set when the actor is an automation (bot/app) rather than a person
    pub actor_is_automated: bool,

    pub created_at: DateTime<Utc>,
}

impl LabelEvent {
    #[must_use]
    pub fn applied(label: &str, actor: &str, automated: bool, at: DateTime<Utc>) -> Self {
        Self {
            kind: LabelEventKind::Applied,
            label: label.to_string(),
            actor: actor.to_string(),
            actor_is_automated: automated,
            created_at: at,
        }
    }

    #[must_use]
    pub fn removed(label: &str, actor: &str, automated: bool, at: DateTime<Utc>) -> Self {
        Self {
            kind: LabelEventKind::Removed,
            label: label.to_string(),
            actor: actor.to_string(),
            actor_is_automated: automated,
            created_at: at,
        }
    }
}

/// Most recent event of `kind` for `label`.
///
/// History order is not trusted; the latest timestamp wins and ties go to the
/// entry that appears last.
pub fn latest_event<'a>(
    events: &'a [LabelEvent],
    label: &str,
    kind: LabelEventKind,
) -> Option<&'a LabelEvent> {
    events
        .iter()
        .filter(|e| e.kind == kind && e.label == label)
        .fold(None, |latest: Option<&LabelEvent>, e| match latest {
            Some(l) if l.created_at > e.created_at => Some(l),
            _ => Some(e),
        })
}

/// Which template an issue is expected to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Bug,
    Feature,
}

impl IssueCategory {
    /// Classify an issue from its labels. Bug wins when both labels are present.
    #[must_use]
    pub fn from_labels(labels: &[String], bug_label: &str, feature_label: &str) -> Option<Self> {
        if labels.iter().any(|l| l == bug_label) {
            Some(Self::Bug)
        } else if labels.iter().any(|l| l == feature_label) {
            Some(Self::Feature)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "feature",
        }
    }
}

/// Outcome of validating an issue body against its template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Compliant,
    NonCompliant {
        /// Nudge comment addressed to the reporter
        message: String,
    },
}

impl Verdict {
    #[must_use]
    pub const fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant)
    }

    /// The nudge message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Compliant => None,
            Self::NonCompliant { message } => Some(message),
        }
    }
}
