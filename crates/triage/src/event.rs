//! Trigger context supplied by the hosting automation environment.
//!
//! In GitHub Actions the event name lives in `GITHUB_EVENT_NAME` and the
//! webhook payload is written to the file named by `GITHUB_EVENT_PATH`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EventError;

const ENV_EVENT_NAME: &str = "GITHUB_EVENT_NAME";
const ENV_EVENT_PATH: &str = "GITHUB_EVENT_PATH";

/// Issue opened/edited/reopened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    pub number: u64,
    /// Body at the time of the event (empty when blank)
    pub body: String,
    /// Reporter login
    pub creator: String,
    /// Webhook action, e.g. `opened` or `edited`
    pub action: Option<String>,
}

/// What woke the bot up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Issue(IssueEvent),
    Schedule,
    /// Any other event; the bot ignores it
    Other(String),
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    action: Option<String>,
    issue: PayloadIssue,
}

#[derive(Debug, Deserialize)]
struct PayloadIssue {
    number: u64,
    #[serde(default)]
    body: Option<String>,
    user: PayloadUser,
}

#[derive(Debug, Deserialize)]
struct PayloadUser {
    login: String,
}

impl Trigger {
    /// Read the trigger from the GitHub Actions environment.
    pub fn from_env() -> Result<Self, EventError> {
        let name =
            std::env::var(ENV_EVENT_NAME).map_err(|_| EventError::MissingVar(ENV_EVENT_NAME))?;

        if name != "issues" {
            return Ok(Self::from_name(&name));
        }

        let path =
            std::env::var(ENV_EVENT_PATH).map_err(|_| EventError::MissingVar(ENV_EVENT_PATH))?;
        Self::from_file(&name, Path::new(&path))
    }

    /// Trigger for events that carry no payload we care about.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "schedule" => Self::Schedule,
            other => Self::Other(other.to_string()),
        }
    }

    /// Read an event payload file.
    pub fn from_file(name: &str, path: &Path) -> Result<Self, EventError> {
        let contents = std::fs::read_to_string(path).map_err(|source| EventError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_payload(name, &contents)
    }

    /// Parse a webhook payload for event `name`.
    pub fn from_payload(name: &str, payload: &str) -> Result<Self, EventError> {
        if name != "issues" {
            return Ok(Self::from_name(name));
        }

        let payload: Payload = serde_json::from_str(payload)?;
        debug!(
            issue = payload.issue.number,
            action = ?payload.action,
            "Parsed issue event"
        );

        Ok(Self::Issue(IssueEvent {
            number: payload.issue.number,
            body: payload.issue.body.unwrap_or_default(),
            creator: payload.issue.user.login,
            action: payload.action,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_issue_payload() {
        let payload = r####"{
            "action": "edited",
            "issue": {
                "number": 1234,
                "title": "Preview flickers",
                "body": "### Checklist",
                "user": { "login": "alice", "type": "User" },
                "labels": [{ "name": "bug" }]
            },
            "repository": { "full_name": "sxyazi/yazi" }
        }"####;

        let trigger = Trigger::from_payload("issues", payload).unwrap();
        assert_eq!(
            trigger,
            Trigger::Issue(IssueEvent {
                number: 1234,
                body: "### Checklist".to_string(),
                creator: "alice".to_string(),
                action: Some("edited".to_string()),
            })
        );
    }

    #[test]
    fn test_null_body_is_empty() {
        let payload = r#"{"action":"opened","issue":{"number":7,"body":null,"user":{"login":"bob"}}}"#;
        match Trigger::from_payload("issues", payload).unwrap() {
            Trigger::Issue(event) => assert_eq!(event.body, ""),
            other => panic!("unexpected trigger {other:?}"),
        }
    }

    #[test]
    fn test_non_issue_events() {
        assert_eq!(Trigger::from_payload("schedule", "{}").unwrap(), Trigger::Schedule);
        assert_eq!(
            Trigger::from_payload("workflow_dispatch", "not json").unwrap(),
            Trigger::Other("workflow_dispatch".to_string())
        );
    }

    #[test]
    fn test_malformed_issue_payload() {
        assert!(matches!(
            Trigger::from_payload("issues", r#"{"issue":{}}"#),
            Err(EventError::Payload(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"issue":{{"number":3,"body":"hi","user":{{"login":"carol"}}}}}}"#
        )
        .unwrap();

        let trigger = Trigger::from_file("issues", file.path()).unwrap();
        assert!(matches!(trigger, Trigger::Issue(IssueEvent { number: 3, .. })));

        assert!(matches!(
            Trigger::from_file("issues", Path::new("/nonexistent/event.json")),
            Err(EventError::Read { .. })
        ));
    }
}
