//! Bug record, severity and status lifecycle.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracklet_core::{AppError, AppResult, BugId, NonEmptyString};

/// Defect severity reported at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic or low-impact defect.
    Low,
    /// Degraded behaviour with a workaround.
    Medium,
    /// Blocking or data-affecting defect.
    High,
}

impl Severity {
    /// Returns a stable storage value for this severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Severity {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(AppError::Validation(format!("unknown severity '{value}'"))),
        }
    }
}

/// Bug lifecycle status.
///
/// Transitions are unordered: any status may move to any status, including
/// itself. A self-transition still advances the audit stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BugStatus {
    /// Newly reported, nobody working on it.
    #[serde(rename = "open")]
    Open,
    /// Actively being worked.
    #[serde(rename = "in-progress")]
    InProgress,
    /// Resolved or otherwise finished.
    #[serde(rename = "closed")]
    Closed,
}

impl BugStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Closed => "closed",
        }
    }

    /// Returns all known statuses.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[BugStatus] = &[BugStatus::Open, BugStatus::InProgress, BugStatus::Closed];

        ALL
    }
}

impl FromStr for BugStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "in-progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            _ => Err(AppError::Validation(format!(
                "unknown bug status '{value}'"
            ))),
        }
    }
}

/// A defect record owned by exactly one project.
///
/// Every mutation carries `updated_by` and `updated_at` so notification
/// diffing can tell a remote change from an echo of the observer's own write
/// and so audit history stays reconstructable. Never deleted: `delete_bugs`
/// exists in the permission table with no implementing path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bug {
    /// Stable bug identifier.
    pub id: BugId,
    /// One-line summary.
    pub title: NonEmptyString,
    /// Reproduction steps and context.
    pub description: String,
    /// Reported severity.
    pub severity: Severity,
    /// Current lifecycle status.
    pub status: BugStatus,
    /// Assignee email, or empty string when unassigned.
    pub assignee: String,
    /// Email of the reporting user.
    pub created_by: String,
    /// Email of the last mutating user.
    pub updated_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
    /// Append-only list of attachment URLs.
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl Bug {
    /// Creates a newly reported bug.
    ///
    /// The initial status is always `open`, the reporter is both creator and
    /// last updater, and both timestamps are equal.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        assignee: impl Into<String>,
        reporter_email: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let title = NonEmptyString::new(title)?;

        Ok(Self {
            id: BugId::new(),
            title,
            description: description.into(),
            severity,
            status: BugStatus::Open,
            assignee: assignee.into(),
            created_by: reporter_email.to_owned(),
            updated_by: reporter_email.to_owned(),
            created_at,
            updated_at: created_at,
            attachments: Vec::new(),
        })
    }

    /// Returns whether the bug is currently unassigned.
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        self.assignee.is_empty()
    }
}
