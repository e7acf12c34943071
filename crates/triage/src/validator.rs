//! # Issue Template Validator
//!
//! Pure checks deciding whether an issue body follows the bug-report or
//! feature-request template.
//!
//! A bug report must contain:
//! - a `Dependencies` line from the debug information block,
//! - a `### Checklist` section with at least two checked items,
//! - the nightly hash as a parenthesised token, e.g. ` (1a2b3c4 ` or
//!   ` (1a2b3c4d `, proving the debug information comes from the current
//!   nightly.
//!
//! A feature request must contain a version line, a `Dependencies` line and
//! the checklist. Its build is not required to be the newest nightly.

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::config::{MessageConfig, TemplatePatterns, TriageConfig};
use crate::error::ConfigError;
use crate::models::{IssueCategory, Verdict};

/// A structural marker required by an issue template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Version,
    Dependencies,
    Checklist,
    NightlyHash,
}

impl Marker {
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Version => "version line",
            Self::Dependencies => "dependencies line",
            Self::Checklist => "checklist with two checked items",
            Self::NightlyHash => "debug information from the newest nightly",
        }
    }
}

/// Compiled template rules plus the text of the nudge comment.
#[derive(Debug, Clone)]
pub struct Validator {
    version: Regex,
    dependencies: Regex,
    checklist: Regex,
    hash_suffix: String,
    label: String,
    threshold: String,
    messages: MessageConfig,
}

impl Validator {
    /// Compile the configured patterns.
    pub fn new(config: &TriageConfig) -> Result<Self, ConfigError> {
        let TemplatePatterns {
            version,
            dependencies,
            checklist,
            hash_suffix,
        } = &config.patterns;

        // Compile once with a dummy hash so a broken suffix class fails here
        // rather than on every bug report.
        compile("hash_suffix", &hash_pattern("0000000", hash_suffix))?;

        Ok(Self {
            version: compile("version", version)?,
            dependencies: compile("dependencies", dependencies)?,
            checklist: compile("checklist", checklist)?,
            hash_suffix: hash_suffix.clone(),
            label: config.labels.needs_info.clone(),
            threshold: config.stale.describe(),
            messages: config.messages.clone(),
        })
    }

    /// Validate `body` against the template for `category`.
    #[must_use]
    pub fn check(&self, creator: &str, body: &str, hash: &str, category: IssueCategory) -> Verdict {
        if self.missing_markers(body, hash, category).is_empty() {
            Verdict::Compliant
        } else {
            Verdict::NonCompliant {
                message: self.nudge(creator, category),
            }
        }
    }

    /// Validate a bug report.
    #[must_use]
    pub fn check_bug(&self, creator: &str, body: &str, hash: &str) -> Verdict {
        self.check(creator, body, hash, IssueCategory::Bug)
    }

    /// Validate a feature request.
    #[must_use]
    pub fn check_feature(&self, creator: &str, body: &str) -> Verdict {
        self.check(creator, body, "", IssueCategory::Feature)
    }

    /// Markers required by `category` that `body` lacks, in template order.
    #[must_use]
    pub fn missing_markers(&self, body: &str, hash: &str, category: IssueCategory) -> Vec<Marker> {
        let mut missing = Vec::new();

        if category == IssueCategory::Feature && !self.version.is_match(body) {
            missing.push(Marker::Version);
        }
        if !self.dependencies.is_match(body) {
            missing.push(Marker::Dependencies);
        }
        if !self.checklist.is_match(body) {
            missing.push(Marker::Checklist);
        }
        if category == IssueCategory::Bug && !self.has_nightly_hash(body, hash) {
            missing.push(Marker::NightlyHash);
        }

        missing
    }

    fn has_nightly_hash(&self, body: &str, hash: &str) -> bool {
        if hash.is_empty() {
            return false;
        }

        Regex::new(&hash_pattern(hash, &self.hash_suffix))
            .map(|re| re.is_match(body))
            .unwrap_or(false)
    }

    /// The comment posted on a non-compliant issue.
    #[must_use]
    pub fn nudge(&self, creator: &str, category: IssueCategory) -> String {
        let lead = match category {
            IssueCategory::Bug => "The bug can still be reproduced on the",
            IssueCategory::Feature => "The requested feature does not exist in the",
        };

        format!(
            "Hey @{creator}, I noticed that you did not correctly follow the issue template. Please ensure that:

- {lead} [newest nightly build]({url}).
- The debug information (`{command}`) is updated for the newest nightly.
- The non-optional items in the checklist are checked.

Issues with `{label}` will be marked ready once edited with the proper content, or closed after {threshold} of inactivity.
",
            url = self.messages.nightly_url,
            command = self.messages.debug_command,
            label = self.label,
            threshold = self.threshold,
        )
    }
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|source| ConfigError::InvalidPattern { name, source })
}

fn hash_pattern(hash: &str, suffix: &str) -> String {
    format!(r" \({}{suffix}? ", regex::escape(hash))
}
