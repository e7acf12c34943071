//! Read-only wrapper that logs mutations instead of performing them.

use async_trait::async_trait;
use tracing::info;

use super::IssueTracker;
use crate::error::TrackerError;
use crate::models::{CloseReason, Issue, IssueState, LabelEvent};

/// Forwards reads to the inner tracker; add/remove/comment/close only log.
pub struct DryRunTracker<T> {
    inner: T,
}

impl<T: IssueTracker> DryRunTracker<T> {
    #[must_use]
    pub const fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: IssueTracker> IssueTracker for DryRunTracker<T> {
    async fn tag_sha(&self, tag: &str) -> Result<String, TrackerError> {
        self.inner.tag_sha(tag).await
    }

    async fn issue_labels(&self, number: u64) -> Result<Vec<String>, TrackerError> {
        self.inner.issue_labels(number).await
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        info!(issue = number, label, "[dry-run] would add label");
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        info!(issue = number, label, "[dry-run] would remove label");
        Ok(())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), TrackerError> {
        info!(issue = number, "[dry-run] would post comment:\n{body}");
        Ok(())
    }

    async fn list_issues(
        &self,
        label: &str,
        state: IssueState,
    ) -> Result<Vec<Issue>, TrackerError> {
        self.inner.list_issues(label, state).await
    }

    async fn close_issue(&self, number: u64, reason: CloseReason) -> Result<(), TrackerError> {
        info!(
            issue = number,
            reason = reason.as_str(),
            "[dry-run] would close issue"
        );
        Ok(())
    }

    async fn label_events(&self, number: u64) -> Result<Vec<LabelEvent>, TrackerError> {
        self.inner.label_events(number).await
    }
}
