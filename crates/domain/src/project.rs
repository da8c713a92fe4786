//! Project aggregate and membership.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracklet_core::{AppResult, NonEmptyString, ProjectId};

use crate::security::Role;
use crate::user::EmailAddress;

/// A project owning a membership map and a bug collection.
///
/// Never hard-deleted: the `delete_project` permission exists in the table
/// but no destructive mutation is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Stable project identifier.
    pub id: ProjectId,
    /// Human-readable project name.
    pub name: NonEmptyString,
    /// Free-form description.
    pub description: String,
    /// Subject of the creating user.
    pub owner: String,
    /// Membership map keyed by lowercased member email.
    pub members: BTreeMap<String, Role>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Email of the last mutating user.
    pub updated_by: String,
    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a project owned by the given user.
    ///
    /// The owner's email is always present in `members` with role `admin`;
    /// this invariant holds from the moment of creation.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        owner_subject: impl Into<String>,
        owner_email: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        let owner_email = EmailAddress::new(owner_email)?;

        let mut members = BTreeMap::new();
        let owner_email = String::from(owner_email);
        members.insert(owner_email.clone(), Role::Admin);

        Ok(Self {
            id: ProjectId::new(),
            name,
            description: description.into(),
            owner: owner_subject.into(),
            members,
            created_at,
            updated_by: owner_email,
            updated_at: created_at,
        })
    }

    /// Returns the role held by an email in this project, if any.
    #[must_use]
    pub fn role_of_email(&self, email: &str) -> Option<Role> {
        self.members.get(email).copied()
    }

    /// Returns whether the email belongs to a current member.
    #[must_use]
    pub fn is_member(&self, email: &str) -> bool {
        self.members.contains_key(email)
    }

    /// Returns the member emails, sorted.
    #[must_use]
    pub fn member_emails(&self) -> Vec<&str> {
        self.members.keys().map(String::as_str).collect()
    }
}
