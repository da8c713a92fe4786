//! User-facing change notifications.

use serde::{Deserialize, Serialize};
use tracklet_core::ProjectId;

use crate::bug::Bug;

/// Notification severity shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Confirmation of a local action.
    Success,
    /// Externally originated change.
    Info,
    /// Degraded but recoverable condition.
    Warning,
    /// Failure surfaced to the user.
    Error,
}

/// An alert emitted for an externally-originated change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Severity of the alert.
    pub kind: NotificationKind,
    /// Message shown to the user.
    pub message: String,
    /// Project the change belongs to.
    pub project_id: ProjectId,
}

impl Notification {
    /// Alert for a bug reported by someone else.
    #[must_use]
    pub fn bug_reported(project_id: ProjectId, bug: &Bug) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: format!("New bug reported: {}", bug.title),
            project_id,
        }
    }

    /// Alert for a bug updated by someone else.
    #[must_use]
    pub fn bug_updated(project_id: ProjectId, bug: &Bug) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: format!(
                "Bug status updated: {} → {}",
                bug.title,
                bug.status.as_str()
            ),
            project_id,
        }
    }

    /// Alert for a bug assigned or reassigned by someone else.
    #[must_use]
    pub fn bug_reassigned(project_id: ProjectId, bug: &Bug) -> Self {
        let assignee = if bug.is_unassigned() {
            "unassigned"
        } else {
            bug.assignee.as_str()
        };
        Self {
            kind: NotificationKind::Info,
            message: format!("Bug reassigned: {} → {assignee}", bug.title),
            project_id,
        }
    }

    /// Alert for an attachment added to a bug by someone else.
    #[must_use]
    pub fn attachment_added(project_id: ProjectId, bug: &Bug) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: format!("New attachment on bug: {}", bug.title),
            project_id,
        }
    }
}
