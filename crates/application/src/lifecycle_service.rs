//! Entity lifecycle service.
//!
//! Every mutating operation re-checks the authorization gate against a fresh
//! project snapshot before touching the store: the store itself enforces
//! nothing, so a caller that skips the check here has no second line of
//! defence. Mutations of existing documents are partial-field updates that
//! always carry `updatedBy` and `updatedAt`.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracklet_core::{AppError, AppResult, BugId, NonEmptyString, ProjectId, UserIdentity};
use tracklet_domain::{
    AttachmentContentType, Bug, BugStatus, EmailAddress, Permission, Project, Role, Severity,
    can_perform,
};

use crate::blob_ports::BlobStore;
use crate::retry;
use crate::store_ports::{RealtimeStore, StorePath};

mod attachments;
mod bugs;
mod projects;

/// Input for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProjectInput {
    /// Human-readable project name.
    pub name: String,
    /// Free-form description.
    pub description: String,
}

/// Input for reporting a bug.
#[derive(Debug, Clone)]
pub struct CreateBugInput {
    /// One-line summary.
    pub title: String,
    /// Reproduction steps and context.
    pub description: String,
    /// Reported severity.
    pub severity: Severity,
    /// Assignee email, or empty for unassigned.
    pub assignee: String,
}

/// Input for attaching an evidence file to a bug.
#[derive(Debug, Clone)]
pub struct AttachFileInput {
    /// File name, becomes the last segment of the blob path.
    pub file_name: String,
    /// Declared MIME type, checked against the allow-list before anything
    /// else happens.
    pub content_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Authorization-gated lifecycle operations over projects and bugs.
#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn RealtimeStore>,
    blobs: Arc<dyn BlobStore>,
}

impl LifecycleService {
    /// Creates a lifecycle service over a realtime store and a blob store.
    #[must_use]
    pub fn new(store: Arc<dyn RealtimeStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    pub(super) async fn load_project_document(&self, project_id: ProjectId) -> AppResult<Project> {
        let path = StorePath::project(project_id);
        let value = retry::with_backoff(|| self.store.read(&path))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project {project_id}")))?;
        parse_document(value)
    }

    pub(super) async fn load_bug_document(
        &self,
        project_id: ProjectId,
        bug_id: BugId,
    ) -> AppResult<Bug> {
        let path = StorePath::bug(project_id, bug_id);
        let value = retry::with_backoff(|| self.store.read(&path))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bug {bug_id} in project {project_id}")))?;
        parse_document(value)
    }

    pub(super) fn require_any_permission(
        &self,
        actor: &UserIdentity,
        project: &Project,
        permissions: &[Permission],
    ) -> AppResult<()> {
        if permissions
            .iter()
            .any(|permission| can_perform(actor, Some(project), *permission))
        {
            return Ok(());
        }

        tracing::warn!(
            user = actor.email(),
            project = %project.id,
            "denied lifecycle operation"
        );
        Err(AppError::Forbidden(
            "user lacks permission for this action in this project".to_owned(),
        ))
    }

    pub(super) fn require_member(
        &self,
        actor: &UserIdentity,
        project: &Project,
    ) -> AppResult<()> {
        if project.is_member(actor.email()) {
            return Ok(());
        }

        Err(AppError::Forbidden(
            "user is not a member of this project".to_owned(),
        ))
    }
}

fn parse_document<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|error| AppError::Store(format!("malformed document: {error}")))
}

/// Builds the audit stamp carried by every partial update.
fn audit_fields(actor_email: &str, at: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(
        "updatedBy".to_owned(),
        Value::String(actor_email.to_owned()),
    );
    fields.insert("updatedAt".to_owned(), Value::String(at.to_rfc3339()));
    fields
}
