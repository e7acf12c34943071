//! Issue-tracking service abstraction.
//!
//! The orchestrator only talks to the tracker through [`IssueTracker`], so the
//! GitHub client can be swapped for the [`DryRunTracker`] wrapper or a test
//! double.

pub mod dry_run;
pub mod github;

use async_trait::async_trait;

use crate::error::TrackerError;
use crate::models::{CloseReason, Issue, IssueState, LabelEvent};

pub use dry_run::DryRunTracker;
pub use github::GitHubTracker;

/// Operations the bot needs from an issue-tracking service.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Full commit SHA the given tag points at.
    async fn tag_sha(&self, tag: &str) -> Result<String, TrackerError>;

    /// Names of the labels currently applied to an issue.
    async fn issue_labels(&self, number: u64) -> Result<Vec<String>, TrackerError>;

    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError>;

    /// Remove a label. Removing a label that is not present succeeds.
    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError>;

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), TrackerError>;

    /// Issues (not pull requests) carrying `label` in the given state.
    async fn list_issues(&self, label: &str, state: IssueState)
        -> Result<Vec<Issue>, TrackerError>;

    async fn close_issue(&self, number: u64, reason: CloseReason) -> Result<(), TrackerError>;

    /// Label applied/removed history of an issue, oldest first.
    async fn label_events(&self, number: u64) -> Result<Vec<LabelEvent>, TrackerError>;
}

/// Length of the abbreviated commit hash printed by `--debug` builds.
pub const SHORT_HASH_LEN: usize = 7;

/// Abbreviate a commit SHA the way `git rev-parse --short=7` does.
#[must_use]
pub fn short_hash(sha: &str) -> String {
    sha.chars().take(SHORT_HASH_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash() {
        assert_eq!(
            short_hash("1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b"),
            "1a2b3c4"
        );
        assert_eq!(short_hash("abc"), "abc");
    }
}
