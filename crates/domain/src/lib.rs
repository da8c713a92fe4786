//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod attachment;
mod bug;
mod notification;
mod project;
mod security;
mod user;

pub use access::{can_perform, role_of};
pub use attachment::AttachmentContentType;
pub use bug::{Bug, BugStatus, Severity};
pub use notification::{Notification, NotificationKind};
pub use project::Project;
pub use security::{Dashboard, GlobalRole, Permission, Role, has_permission, permissions_of};
pub use user::EmailAddress;
