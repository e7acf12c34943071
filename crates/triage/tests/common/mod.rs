//! In-memory issue tracker shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use triage::{
    CloseReason, Issue, IssueState, IssueTracker, LabelEvent, LabelEventKind, TrackerError,
};

pub const BOT: &str = "github-actions[bot]";
pub const NIGHTLY_SHA: &str = "1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b";
pub const HASH: &str = "1a2b3c4";

pub const BUG_BODY: &str = "### Debug information

```
Yazi
    Version: 0.4.3 (1a2b3c4 2025-01-10)

Dependencies
    file             : file-5.45
```

### Checklist

- [x] I tried the latest nightly build
- [x] I searched the existing issues
";

pub const FEATURE_BODY: &str = "```
Yazi Version: 0.4.3 (9f8e7d6 2024-12-01)

Dependencies
    jq               : jq-1.7.1
```

### Checklist

- [x] I have searched the existing issues
- [x] The latest nightly build doesn't already have this feature
";

/// Tracker operation, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Labels,
    Events,
    AddLabel,
    RemoveLabel,
    Comment,
    Close,
}

/// A mutation performed through the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddLabel(u64, String),
    RemoveLabel(u64, String),
    Comment(u64, String),
    Close(u64, CloseReason),
}

#[derive(Default)]
struct State {
    tag: Option<String>,
    tag_fails: bool,
    list_fails: bool,
    issues: BTreeMap<u64, Issue>,
    events: BTreeMap<u64, Vec<LabelEvent>>,
    failures: HashSet<(Op, u64)>,
    calls: Vec<Call>,
}

/// Issue tracker backed by memory that records every mutation.
///
/// Mutations update the stored issues and append bot-authored label events,
/// so consecutive runs observe each other's effects.
pub struct FakeTracker {
    state: Mutex<State>,
    clock: DateTime<Utc>,
}

impl FakeTracker {
    /// A tracker whose nightly tag points at [`NIGHTLY_SHA`].
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                tag: Some(NIGHTLY_SHA.to_string()),
                ..State::default()
            }),
            clock: Utc::now(),
        }
    }

    pub fn without_nightly_tag(self) -> Self {
        self.state.lock().unwrap().tag = None;
        self
    }

    pub fn with_failing_tag(self) -> Self {
        self.state.lock().unwrap().tag_fails = true;
        self
    }

    pub fn with_failing_list(self) -> Self {
        self.state.lock().unwrap().list_fails = true;
        self
    }

    pub fn add_issue(&self, number: u64, labels: &[&str], created_at: DateTime<Utc>) {
        self.state.lock().unwrap().issues.insert(
            number,
            Issue {
                number,
                body: String::new(),
                creator: "alice".to_string(),
                state: IssueState::Open,
                labels: labels.iter().map(|l| (*l).to_string()).collect(),
                created_at,
            },
        );
    }

    pub fn push_event(&self, number: u64, event: LabelEvent) {
        self.state
            .lock()
            .unwrap()
            .events
            .entry(number)
            .or_default()
            .push(event);
    }

    pub fn fail(&self, op: Op, number: u64) {
        self.state.lock().unwrap().failures.insert((op, number));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn labels(&self, number: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .issues
            .get(&number)
            .map(|i| i.labels.clone())
            .unwrap_or_default()
    }

    pub fn issue_state(&self, number: u64) -> Option<IssueState> {
        self.state
            .lock()
            .unwrap()
            .issues
            .get(&number)
            .map(|i| i.state)
    }

    fn check(&self, op: Op, number: u64) -> Result<(), TrackerError> {
        if self.state.lock().unwrap().failures.contains(&(op, number)) {
            Err(TrackerError::Api {
                status: 502,
                message: format!("{op:?} failed for #{number}"),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn tag_sha(&self, tag: &str) -> Result<String, TrackerError> {
        let state = self.state.lock().unwrap();
        if state.tag_fails {
            return Err(TrackerError::Api {
                status: 500,
                message: "Server Error".to_string(),
            });
        }
        state
            .tag
            .clone()
            .ok_or_else(|| TrackerError::NotFound(format!("tags/{tag}")))
    }

    async fn issue_labels(&self, number: u64) -> Result<Vec<String>, TrackerError> {
        self.check(Op::Labels, number)?;
        self.state
            .lock()
            .unwrap()
            .issues
            .get(&number)
            .map(|i| i.labels.clone())
            .ok_or_else(|| TrackerError::NotFound(format!("issue #{number}")))
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        self.check(Op::AddLabel, number)?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddLabel(number, label.to_string()));
        if let Some(issue) = state.issues.get_mut(&number) {
            if !issue.labels.iter().any(|l| l == label) {
                issue.labels.push(label.to_string());
            }
        }
        let event = LabelEvent::applied(label, BOT, true, self.clock);
        state.events.entry(number).or_default().push(event);
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        self.check(Op::RemoveLabel, number)?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::RemoveLabel(number, label.to_string()));
        if let Some(issue) = state.issues.get_mut(&number) {
            issue.labels.retain(|l| l != label);
        }
        let event = LabelEvent::removed(label, BOT, true, self.clock);
        state.events.entry(number).or_default().push(event);
        Ok(())
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<(), TrackerError> {
        self.check(Op::Comment, number)?;
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Comment(number, body.to_string()));
        Ok(())
    }

    async fn list_issues(
        &self,
        label: &str,
        state: IssueState,
    ) -> Result<Vec<Issue>, TrackerError> {
        let guard = self.state.lock().unwrap();
        if guard.list_fails {
            return Err(TrackerError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(guard
            .issues
            .values()
            .filter(|i| i.state == state && i.labels.iter().any(|l| l == label))
            .cloned()
            .collect())
    }

    async fn close_issue(&self, number: u64, reason: CloseReason) -> Result<(), TrackerError> {
        self.check(Op::Close, number)?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Close(number, reason));
        if let Some(issue) = state.issues.get_mut(&number) {
            issue.state = IssueState::Closed;
        }
        Ok(())
    }

    async fn label_events(&self, number: u64) -> Result<Vec<LabelEvent>, TrackerError> {
        self.check(Op::Events, number)?;
        let mut events = self
            .state
            .lock()
            .unwrap()
            .events
            .get(&number)
            .cloned()
            .unwrap_or_default();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }
}

/// Count of label applications in an event list, for sanity checks.
pub fn applied_count(events: &[LabelEvent], label: &str) -> usize {
    events
        .iter()
        .filter(|e| e.kind == LabelEventKind::Applied && e.label == label)
        .count()
}
