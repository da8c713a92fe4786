//! Role resolution and the authorization gate.
//!
//! These are pure functions: the single trust boundary for every mutating
//! operation and every conditional affordance. A `false` from the gate means
//! "render a locked affordance", never merely "hide the button" — the
//! lifecycle services re-check independently because the store itself
//! enforces nothing.

use tracklet_core::UserIdentity;

use crate::project::Project;
use crate::security::{Permission, Role, has_permission};

/// Resolves the user's role within a project.
///
/// Returns `None` when the user is absent from the membership map or when
/// the project has not loaded yet: a pending project is "no access", never
/// "full access" (fail closed).
#[must_use]
pub fn role_of(user: &UserIdentity, project: Option<&Project>) -> Option<Role> {
    project.and_then(|project| project.role_of_email(user.email()))
}

/// Decides whether the user may perform an action in a project.
#[must_use]
pub fn can_perform(user: &UserIdentity, project: Option<&Project>, permission: Permission) -> bool {
    has_permission(role_of(user, project), permission)
}
