//! Configuration for the triage bot.
//!
//! Every knob has a default matching the project's issue templates, so the
//! bot runs with no config file at all. Values are layered:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file (`--config triage.toml`),
//! 3. environment overrides (`TRIAGE_REPOSITORY` / `GITHUB_REPOSITORY`,
//!    `TRIAGE_API_URL` / `GITHUB_API_URL`),
//! 4. command-line flags, applied by the binary.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Default GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Sentinel label marking an issue that needs author follow-up.
pub const DEFAULT_NEEDS_INFO_LABEL: &str = "needs info";

/// Two days, in seconds.
pub const DEFAULT_STALE_THRESHOLD_SECS: u64 = 2 * 24 * 60 * 60;

/// Largest accepted stale threshold: one hundred years, in seconds.
pub const MAX_STALE_THRESHOLD_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Top-level bot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Repository in owner/repo format.
    pub repository: String,
    /// Base URL of the GitHub REST API.
    pub api_url: String,
    /// Tag whose commit identifies the current nightly build.
    pub nightly_tag: String,
    pub labels: LabelConfig,
    pub stale: StaleConfig,
    pub patterns: TemplatePatterns,
    pub messages: MessageConfig,
    /// Logins treated as automation even when the API reports a user account
    /// (e.g. a personal access token used by a workflow).
    pub automation_actors: Vec<String>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            nightly_tag: "nightly".to_string(),
            labels: LabelConfig::default(),
            stale: StaleConfig::default(),
            patterns: TemplatePatterns::default(),
            messages: MessageConfig::default(),
            automation_actors: Vec::new(),
        }
    }
}

/// Label names the bot reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub needs_info: String,
    pub bug: String,
    pub feature: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            needs_info: DEFAULT_NEEDS_INFO_LABEL.to_string(),
            bug: "bug".to_string(),
            feature: "feature".to_string(),
        }
    }
}

/// Stale-issue sweep settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaleConfig {
    /// How long an issue may carry the sentinel label before it is closed.
    pub threshold_secs: u64,
}

impl Default for StaleConfig {
    fn default() -> Self {
        Self {
            threshold_secs: DEFAULT_STALE_THRESHOLD_SECS,
        }
    }
}

impl StaleConfig {
    /// The threshold as a duration, clamped to [`MAX_STALE_THRESHOLD_SECS`].
    #[must_use]
    pub fn threshold(&self) -> Duration {
        let secs = self.threshold_secs.min(MAX_STALE_THRESHOLD_SECS);
        Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(Duration::MAX)
    }

    /// Human-readable threshold used in user-facing comments ("2 days").
    #[must_use]
    pub fn describe(&self) -> String {
        const DAY: u64 = 24 * 60 * 60;
        const HOUR: u64 = 60 * 60;

        let (amount, unit) = match self.threshold_secs {
            s if s >= DAY && s % DAY == 0 => (s / DAY, "day"),
            s if s >= HOUR && s % HOUR == 0 => (s / HOUR, "hour"),
            s => (s, "second"),
        };

        if amount == 1 {
            format!("1 {unit}")
        } else {
            format!("{amount} {unit}s")
        }
    }
}

/// Regular expressions describing the required template markers.
///
/// Patterns are compiled in multi-line mode and are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatePatterns {
    /// Version line from the debug information block.
    pub version: String,
    /// Dependencies line from the debug information block.
    pub dependencies: String,
    /// Checklist heading followed by two checked items.
    pub checklist: String,
    /// Character class for the optional character after the nightly hash,
    /// e.g. the dirty-tree marker some builds append.
    pub hash_suffix: String,
}

impl Default for TemplatePatterns {
    fn default() -> Self {
        Self {
            version: r"Yazi\s+Version\s*:\s\d+\.\d+\.\d+\s\(".to_string(),
            dependencies: r"Dependencies\s+[/a-z]+\s*:\s".to_string(),
            checklist: r"#{3}\s+Checklist\s+(?:^-\s+\[x\]\s+.+?(?:\n|\r\n|$)){2}".to_string(),
            hash_suffix: "[a-z0-9]".to_string(),
        }
    }
}

/// Values interpolated into the nudge comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Where reporters can download the nightly build.
    pub nightly_url: String,
    /// Command printing the debug information block.
    pub debug_command: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            nightly_url: "https://yazi-rs.github.io/docs/installation/#binaries".to_string(),
            debug_command: "yazi --debug".to_string(),
        }
    }
}

impl TriageConfig {
    /// Load configuration from an optional TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names.
    ///
    /// `TRIAGE_*` variables win over the ones GitHub Actions sets.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|&k| lookup(k).filter(|v| !v.trim().is_empty()))
        };

        if let Some(repo) = first(&["TRIAGE_REPOSITORY", "GITHUB_REPOSITORY"]) {
            self.repository = repo.trim().to_string();
        }
        if let Some(url) = first(&["TRIAGE_API_URL", "GITHUB_API_URL"]) {
            self.api_url = url.trim().to_string();
        }

        self
    }

    /// Split `repository` into owner and name.
    pub fn owner_repo(&self) -> Result<(&str, &str), ConfigError> {
        parse_repo(&self.repository)
    }

    /// Check the configuration is usable before talking to the tracker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.owner_repo()?;

        for (name, value) in [
            ("labels.needs_info", &self.labels.needs_info),
            ("labels.bug", &self.labels.bug),
            ("labels.feature", &self.labels.feature),
            ("nightly_tag", &self.nightly_tag),
            ("api_url", &self.api_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }

        if self.stale.threshold_secs == 0 {
            return Err(ConfigError::Invalid(
                "stale.threshold_secs must be positive".to_string(),
            ));
        }
        if self.stale.threshold_secs > MAX_STALE_THRESHOLD_SECS {
            return Err(ConfigError::Invalid(format!(
                "stale.threshold_secs must be at most {MAX_STALE_THRESHOLD_SECS}"
            )));
        }

        Ok(())
    }
}

/// Parse a repository in owner/repo format.
pub fn parse_repo(repo: &str) -> Result<(&str, &str), ConfigError> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(ConfigError::InvalidRepository(repo.to_string())),
    }
}
