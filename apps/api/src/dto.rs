use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracklet_application::SignedInUser;
use tracklet_domain::{Bug, Dashboard, GlobalRole, Notification, NotificationKind, Project};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for account registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub global_role: String,
}

/// Incoming payload for password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Incoming payload for federated provider login.
#[derive(Debug, Deserialize)]
pub struct ProviderLoginRequest {
    pub email: String,
    pub display_name: String,
}

/// API representation of the authenticated user.
#[derive(Debug, Serialize)]
pub struct SessionUserResponse {
    pub subject: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub provider: String,
    pub global_role: GlobalRole,
    pub dashboard: Dashboard,
}

impl From<SignedInUser> for SessionUserResponse {
    fn from(value: SignedInUser) -> Self {
        Self {
            subject: value.identity.subject().to_owned(),
            email: value.identity.email().to_owned(),
            display_name: value.identity.display_name().to_owned(),
            photo_url: value.identity.photo_url().map(str::to_owned),
            provider: value.identity.provider().to_owned(),
            global_role: value.global_role,
            dashboard: value.global_role.landing_dashboard(),
        }
    }
}

/// Incoming payload for project creation.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// API representation of a project.
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub members: BTreeMap<String, String>,
    pub created_at: String,
    pub updated_by: String,
    pub updated_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(value: Project) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name.to_string(),
            description: value.description,
            owner: value.owner,
            members: value
                .members
                .into_iter()
                .map(|(email, role)| (email, role.as_str().to_owned()))
                .collect(),
            created_at: value.created_at.to_rfc3339(),
            updated_by: value.updated_by,
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

/// Incoming payload for adding a member to a project.
#[derive(Debug, Deserialize)]
pub struct InviteMemberRequest {
    pub email: String,
    pub role: String,
}

/// Incoming payload for reporting a bug.
#[derive(Debug, Deserialize)]
pub struct CreateBugRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: String,
    #[serde(default)]
    pub assignee: String,
}

/// API representation of a bug.
#[derive(Debug, Serialize)]
pub struct BugResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub status: String,
    pub assignee: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub attachments: Vec<String>,
}

impl From<Bug> for BugResponse {
    fn from(value: Bug) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title.to_string(),
            description: value.description,
            severity: value.severity.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            assignee: value.assignee,
            created_by: value.created_by,
            updated_by: value.updated_by,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
            attachments: value.attachments,
        }
    }
}

/// Incoming payload for a status change.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Incoming payload for an assignment change.
#[derive(Debug, Deserialize)]
pub struct AssignBugRequest {
    #[serde(default)]
    pub assignee: String,
}

/// Incoming payload for an attachment upload, bytes as base64.
#[derive(Debug, Deserialize)]
pub struct AttachFileRequest {
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

/// API representation of an uploaded attachment.
#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub url: String,
}

/// API representation of a change notification.
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub kind: NotificationKind,
    pub message: String,
    pub project_id: String,
}

impl From<Notification> for NotificationResponse {
    fn from(value: Notification) -> Self {
        Self {
            kind: value.kind,
            message: value.message,
            project_id: value.project_id.to_string(),
        }
    }
}
