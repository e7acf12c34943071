//! Issue-template compliance bot.
//!
//! This crate provides:
//! - [`Validator`]: pure checks of bug-report and feature-request bodies
//! - [`Orchestrator`]: the `needs info` label/comment state machine
//! - [`StaleSweep`]: scheduled closing of issues left in `needs info`
//! - [`IssueTracker`]: the issue-tracking service seam, implemented for the
//!   GitHub REST API by [`GitHubTracker`]
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use triage::{GitHubTracker, Orchestrator, Trigger, TriageConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TriageConfig::load(None)?.with_env_overrides();
//! let (owner, repo) = config.owner_repo()?;
//! let tracker = GitHubTracker::new(&config.api_url, "ghp_token", owner, repo)?;
//!
//! let orchestrator = Orchestrator::new(Arc::new(tracker), &config)?;
//! let report = orchestrator.run(&Trigger::from_env()?, chrono::Utc::now()).await;
//! println!("{report:?}");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod event;
pub mod models;
pub mod orchestrator;
pub mod sweep;
pub mod tracker;
pub mod validator;

pub use config::TriageConfig;
pub use error::{ConfigError, EventError, TrackerError};
pub use event::{IssueEvent, Trigger};
pub use models::{
    CloseReason, Issue, IssueCategory, IssueState, LabelEvent, LabelEventKind, Verdict,
};
pub use orchestrator::{IssueOutcome, LabelState, Orchestrator, RunReport};
pub use sweep::{StaleSweep, SweepReport};
pub use tracker::{DryRunTracker, GitHubTracker, IssueTracker};
pub use validator::{Marker, Validator};
