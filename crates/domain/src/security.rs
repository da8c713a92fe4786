use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracklet_core::AppError;

/// Capability tier assigned to a user within the scope of one project.
///
/// Stored as the value of `Project.members`; this is the only role the
/// authorization gate reads. The independently stored [`GlobalRole`] drives
/// post-login routing and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control over the project, its members and its bugs.
    Admin,
    /// Reports bugs, attaches evidence, assigns and re-assigns work.
    Qa,
    /// Moves bugs through the status lifecycle.
    Developer,
    /// Read-only view over assignments.
    #[serde(rename = "pm")]
    ProjectManager,
    /// Member with no capabilities beyond visibility.
    User,
}

impl Role {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Qa => "qa",
            Self::Developer => "developer",
            Self::ProjectManager => "pm",
            Self::User => "user",
        }
    }

    /// Returns all known roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[
            Role::Admin,
            Role::Qa,
            Role::Developer,
            Role::ProjectManager,
            Role::User,
        ];

        ALL
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "qa" => Ok(Self::Qa),
            "developer" => Ok(Self::Developer),
            "pm" => Ok(Self::ProjectManager),
            "user" => Ok(Self::User),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

/// Global role recorded on the identity record at signup.
///
/// Picks which dashboard a user lands on after login. Deliberately a distinct
/// type from [`Role`]: the two namespaces are related but independently
/// stored, and the authorization gate must never read this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    /// Lands on the admin dashboard.
    Admin,
    /// Lands on the QA dashboard.
    Qa,
    /// Lands on the developer dashboard.
    Developer,
    /// Lands on the project manager dashboard.
    #[serde(rename = "pm")]
    ProjectManager,
    /// Lands on the plain member dashboard.
    User,
}

impl GlobalRole {
    /// Returns a stable storage value for this global role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Qa => "qa",
            Self::Developer => "developer",
            Self::ProjectManager => "pm",
            Self::User => "user",
        }
    }

    /// Returns the dashboard this global role routes to after login.
    #[must_use]
    pub fn landing_dashboard(&self) -> Dashboard {
        match self {
            Self::Admin => Dashboard::Admin,
            Self::Qa => Dashboard::Qa,
            Self::Developer => Dashboard::Developer,
            Self::ProjectManager => Dashboard::ProjectManager,
            Self::User => Dashboard::Member,
        }
    }
}

impl FromStr for GlobalRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "qa" => Ok(Self::Qa),
            "developer" => Ok(Self::Developer),
            "pm" => Ok(Self::ProjectManager),
            "user" => Ok(Self::User),
            _ => Err(AppError::Validation(format!(
                "unknown global role '{value}'"
            ))),
        }
    }
}

/// Post-login landing dashboard, derived from the global role only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    /// Administrative overview.
    Admin,
    /// QA triage board.
    Qa,
    /// Developer work queue.
    Developer,
    /// Project manager reporting view.
    ProjectManager,
    /// Plain member landing page.
    Member,
}

/// Atomic named right to perform one kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows creating a new project.
    CreateProject,
    /// Allows adding members to a project.
    InviteMembers,
    /// Allows deleting a project. No implementing mutation exists; kept so
    /// the table stays the verbatim single source of truth.
    DeleteProject,
    /// Allows every bug mutation.
    ManageBugs,
    /// Allows setting a bug's assignee.
    AssignBugs,
    /// Allows deleting bugs. No implementing mutation exists.
    DeleteBugs,
    /// Allows uploading files anywhere in the project.
    UploadFiles,
    /// Allows reporting a new bug.
    CreateBug,
    /// Allows attaching evidence files to a bug.
    UploadBugAttachment,
    /// Allows viewing bug assignments.
    ViewAssignments,
    /// Allows viewing bug attachments.
    ViewAttachments,
    /// Allows moving a bug between statuses.
    UpdateStatus,
    /// Allows closing a bug as complete.
    MarkComplete,
    /// Allows moving an assignment to another member.
    ReassignBug,
    /// Allows changing member roles.
    ManageRoles,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateProject => "create_project",
            Self::InviteMembers => "invite_members",
            Self::DeleteProject => "delete_project",
            Self::ManageBugs => "manage_bugs",
            Self::AssignBugs => "assign_bugs",
            Self::DeleteBugs => "delete_bugs",
            Self::UploadFiles => "upload_files",
            Self::CreateBug => "create_bug",
            Self::UploadBugAttachment => "upload_bug_attachment",
            Self::ViewAssignments => "view_assignments",
            Self::ViewAttachments => "view_attachments",
            Self::UpdateStatus => "update_status",
            Self::MarkComplete => "mark_complete",
            Self::ReassignBug => "reassign_bug",
            Self::ManageRoles => "manage_roles",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::CreateProject,
            Permission::InviteMembers,
            Permission::DeleteProject,
            Permission::ManageBugs,
            Permission::AssignBugs,
            Permission::DeleteBugs,
            Permission::UploadFiles,
            Permission::CreateBug,
            Permission::UploadBugAttachment,
            Permission::ViewAssignments,
            Permission::ViewAttachments,
            Permission::UpdateStatus,
            Permission::MarkComplete,
            Permission::ReassignBug,
            Permission::ManageRoles,
        ];

        ALL
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create_project" => Ok(Self::CreateProject),
            "invite_members" => Ok(Self::InviteMembers),
            "delete_project" => Ok(Self::DeleteProject),
            "manage_bugs" => Ok(Self::ManageBugs),
            "assign_bugs" => Ok(Self::AssignBugs),
            "delete_bugs" => Ok(Self::DeleteBugs),
            "upload_files" => Ok(Self::UploadFiles),
            "create_bug" => Ok(Self::CreateBug),
            "upload_bug_attachment" => Ok(Self::UploadBugAttachment),
            "view_assignments" => Ok(Self::ViewAssignments),
            "view_attachments" => Ok(Self::ViewAttachments),
            "update_status" => Ok(Self::UpdateStatus),
            "mark_complete" => Ok(Self::MarkComplete),
            "reassign_bug" => Ok(Self::ReassignBug),
            "manage_roles" => Ok(Self::ManageRoles),
            _ => Err(AppError::Validation(format!(
                "unknown permission '{value}'"
            ))),
        }
    }
}

/// Returns the permissions granted to a role.
///
/// Static and total: this table is the single edit point for access-control
/// changes, and nothing else may re-derive it.
#[must_use]
pub fn permissions_of(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => &[
            Permission::CreateProject,
            Permission::InviteMembers,
            Permission::DeleteProject,
            Permission::ManageBugs,
            Permission::AssignBugs,
            Permission::DeleteBugs,
            Permission::UploadFiles,
            Permission::CreateBug,
            Permission::UploadBugAttachment,
            Permission::ViewAssignments,
            Permission::ViewAttachments,
            Permission::UpdateStatus,
            Permission::MarkComplete,
            Permission::ReassignBug,
            Permission::ManageRoles,
        ],
        Role::Qa => &[
            Permission::CreateBug,
            Permission::UploadBugAttachment,
            Permission::AssignBugs,
            Permission::MarkComplete,
            Permission::ReassignBug,
            Permission::ViewAssignments,
            Permission::ViewAttachments,
        ],
        Role::Developer => &[
            Permission::UpdateStatus,
            Permission::ViewAssignments,
            Permission::ViewAttachments,
        ],
        Role::ProjectManager => &[Permission::ViewAssignments],
        Role::User => &[],
    }
}

/// Returns whether a role grants a permission.
///
/// Total over both enumerations; an absent role (`None`) grants nothing.
#[must_use]
pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    role.map(|role| permissions_of(role).contains(&permission))
        .unwrap_or(false)
}
