//! # GitHub Issues Client
//!
//! [`IssueTracker`] implementation over the GitHub REST API. Every call is a
//! single request (or one request per page); nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::IssueTracker;
use crate::error::TrackerError;
use crate::models::{CloseReason, Issue, IssueState, LabelEvent, LabelEventKind};

/// Page size used for list endpoints (GitHub's maximum).
const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    #[serde(default)]
    body: Option<String>,
    user: Option<GitHubUser>,
    state: IssueState,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
    created_at: DateTime<Utc>,
    /// Present only when the "issue" is a pull request
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GitHubIssueEvent {
    event: String,
    #[serde(default)]
    label: Option<GitHubLabel>,
    #[serde(default)]
    actor: Option<GitHubUser>,
    #[serde(default)]
    performed_via_github_app: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

/// GitHub REST client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GitHubTracker {
    client: reqwest::Client,
    base_url: Url,
    token: String,
    owner: String,
    repo: String,
    automation_actors: Vec<String>,
}

impl GitHubTracker {
    /// Create a client for `owner/repo` against `api_url`.
    pub fn new(
        api_url: &str,
        token: &str,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self, TrackerError> {
        let base_url = Url::parse(api_url)
            .map_err(|e| TrackerError::Other(format!("Invalid API URL '{api_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TrackerError::Other(format!(
                "Invalid API URL '{api_url}': not a base URL"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("triage/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: token.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            automation_actors: Vec::new(),
        })
    }

    /// Logins to treat as automation in addition to bot/app accounts.
    #[must_use]
    pub fn with_automation_actors(mut self, actors: Vec<String>) -> Self {
        self.automation_actors = actors;
        self
    }

    /// Build `{base}/repos/{owner}/{repo}/{segments..}` with each segment
    /// percent-encoded (label names contain spaces).
    fn repo_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str()])
                .extend(segments);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<Response, TrackerError> {
        let mut request = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token));

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TrackerError> {
        let response = self.send(Method::GET, url, None).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetch every page of a list endpoint.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, TrackerError> {
        let mut items = Vec::new();

        for page in 1.. {
            let mut page_url = url.clone();
            {
                let mut pairs = page_url.query_pairs_mut();
                for (key, value) in query {
                    pairs.append_pair(key, value);
                }
                pairs
                    .append_pair("per_page", &PER_PAGE.to_string())
                    .append_pair("page", &page.to_string());
            }

            let batch: Vec<T> = self.get_json(page_url).await?;
            let last = batch.len() < PER_PAGE;
            items.extend(batch);
            if last {
                break;
            }
        }

        Ok(items)
    }

    fn is_automated(&self, actor: Option<&GitHubUser>, via_app: bool) -> bool {
        via_app
            || actor.is_some_and(|a| {
                a.kind == "Bot" || self.automation_actors.iter().any(|l| *l == a.login)
            })
    }
}

/// Map non-success responses to [`TrackerError`].
async fn check_status(response: Response) -> Result<Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GitHubError>(&text)
        .map(|e| e.message)
        .unwrap_or(text);

    if status == StatusCode::NOT_FOUND {
        Err(TrackerError::NotFound(format!("{url}: {message}")))
    } else {
        Err(TrackerError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    #[instrument(skip(self))]
    async fn tag_sha(&self, tag: &str) -> Result<String, TrackerError> {
        let url = self.repo_url(&["git", "ref", "tags", tag]);
        let git_ref: GitRef = self.get_json(url).await?;
        debug!(sha = %git_ref.object.sha, "Resolved tag");
        Ok(git_ref.object.sha)
    }

    #[instrument(skip(self))]
    async fn issue_labels(&self, number: u64) -> Result<Vec<String>, TrackerError> {
        let url = self.repo_url(&["issues", &number.to_string(), "labels"]);
        let labels: Vec<GitHubLabel> = self.get_all_pages(url, &[]).await?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    #[instrument(skip(self))]
    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        let url = self.repo_url(&["issues", &number.to_string(), "labels"]);
        let body = serde_json::json!({ "labels": [label] });
        self.send(Method::POST, url, Some(body)).await?;
        info!(issue = number, label, "Added label");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        let url = self.repo_url(&["issues", &number.to_string(), "labels", label]);
        match self.send(Method::DELETE, url, None).await {
            Ok(_) => {
                info!(issue = number, label, "Removed label");
                Ok(())
            }
            Err(TrackerError::NotFound(_)) => {
                debug!(issue = number, label, "Label already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, body), fields(len = body.len()))]
    async fn create_comment(&self, number: u64, body: &str) -> Result<(), TrackerError> {
        let url = self.repo_url(&["issues", &number.to_string(), "comments"]);
        let payload = serde_json::json!({ "body": body });
        self.send(Method::POST, url, Some(payload)).await?;
        info!(issue = number, "Posted comment");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_issues(
        &self,
        label: &str,
        state: IssueState,
    ) -> Result<Vec<Issue>, TrackerError> {
        let url = self.repo_url(&["issues"]);
        let raw: Vec<GitHubIssue> = self
            .get_all_pages(url, &[("labels", label), ("state", state.as_str())])
            .await?;

        let issues: Vec<Issue> = raw
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| Issue {
                number: i.number,
                body: i.body.unwrap_or_default(),
                creator: i.user.map(|u| u.login).unwrap_or_default(),
                state: i.state,
                labels: i.labels.into_iter().map(|l| l.name).collect(),
                created_at: i.created_at,
            })
            .collect();

        debug!(count = issues.len(), "Listed issues");
        Ok(issues)
    }

    #[instrument(skip(self))]
    async fn close_issue(&self, number: u64, reason: CloseReason) -> Result<(), TrackerError> {
        let url = self.repo_url(&["issues", &number.to_string()]);
        let body = serde_json::json!({
            "state": IssueState::Closed.as_str(),
            "state_reason": reason.as_str(),
        });
        self.send(Method::PATCH, url, Some(body)).await?;
        info!(issue = number, reason = reason.as_str(), "Closed issue");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn label_events(&self, number: u64) -> Result<Vec<LabelEvent>, TrackerError> {
        let url = self.repo_url(&["issues", &number.to_string(), "events"]);
        let raw: Vec<GitHubIssueEvent> = self.get_all_pages(url, &[]).await?;

        let mut events: Vec<LabelEvent> = raw
            .into_iter()
            .filter_map(|e| {
                let kind = match e.event.as_str() {
                    "labeled" => LabelEventKind::Applied,
                    "unlabeled" => LabelEventKind::Removed,
                    _ => return None,
                };
                let label = e.label?.name;
                let actor_is_automated =
                    self.is_automated(e.actor.as_ref(), e.performed_via_github_app.is_some());
                Some(LabelEvent {
                    kind,
                    label,
                    actor: e.actor.map_or_else(|| "ghost".to_string(), |a| a.login),
                    actor_is_automated,
                    created_at: e.created_at,
                })
            })
            .collect();

        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }
}
