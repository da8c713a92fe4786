use super::*;

impl LifecycleService {
    /// Reports a new bug in a project.
    ///
    /// The assignee, when given, must be a current member; the reporter
    /// becomes both creator and first updater of the audit trail.
    pub async fn create_bug(
        &self,
        actor: &UserIdentity,
        project_id: ProjectId,
        input: CreateBugInput,
    ) -> AppResult<Bug> {
        let project = self.load_project_document(project_id).await?;
        self.require_any_permission(
            actor,
            &project,
            &[Permission::CreateBug, Permission::ManageBugs],
        )?;
        require_assignable(&project, &input.assignee)?;

        let bug = Bug::new(
            input.title,
            input.description,
            input.severity,
            input.assignee,
            actor.email(),
            Utc::now(),
        )?;

        let path = StorePath::bug(project_id, bug.id);
        let document = serde_json::to_value(&bug)
            .map_err(|error| AppError::Internal(format!("bug encoding failed: {error}")))?;
        retry::with_backoff(|| self.store.write(&path, document.clone())).await?;

        tracing::info!(project = %project_id, bug = %bug.id, "bug reported");
        Ok(bug)
    }

    /// Lists a project's bugs, newest first.
    pub async fn list_bugs(
        &self,
        actor: &UserIdentity,
        project_id: ProjectId,
    ) -> AppResult<Vec<Bug>> {
        let project = self.load_project_document(project_id).await?;
        self.require_member(actor, &project)?;

        let path = StorePath::project_bugs(project_id);
        let snapshot = retry::with_backoff(|| self.store.read(&path))
            .await?
            .unwrap_or_default();

        let mut bugs = Vec::new();
        for (raw_id, node) in snapshot.as_object().cloned().unwrap_or_default() {
            match parse_document::<Bug>(node) {
                Ok(bug) => bugs.push(bug),
                Err(error) => {
                    tracing::warn!(project = %project_id, bug = %raw_id, %error, "skipping malformed bug document");
                }
            }
        }

        bugs.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(bugs)
    }

    /// Moves a bug to a new status.
    ///
    /// Any status may move to any status, including itself; a self-transition
    /// still advances the audit stamp. Only the status and the stamp fields
    /// are written, so a concurrent reassignment of the same bug survives.
    pub async fn update_bug_status(
        &self,
        actor: &UserIdentity,
        project_id: ProjectId,
        bug_id: BugId,
        status: BugStatus,
    ) -> AppResult<()> {
        let project = self.load_project_document(project_id).await?;
        self.require_any_permission(
            actor,
            &project,
            &[Permission::UpdateStatus, Permission::ManageBugs],
        )?;
        self.load_bug_document(project_id, bug_id).await?;

        let mut fields = audit_fields(actor.email(), Utc::now());
        fields.insert(
            "status".to_owned(),
            Value::String(status.as_str().to_owned()),
        );

        let path = StorePath::bug(project_id, bug_id);
        retry::with_backoff(|| self.store.update(&path, fields.clone())).await?;

        tracing::info!(project = %project_id, bug = %bug_id, status = status.as_str(), "bug status updated");
        Ok(())
    }

    /// Assigns a bug, reassigns it, or clears the assignment.
    ///
    /// First assignment of an unassigned bug and reassignment of an already
    /// assigned one are distinct capabilities; clearing counts as a
    /// reassignment. The new assignee must be a member or the empty string.
    pub async fn assign_bug(
        &self,
        actor: &UserIdentity,
        project_id: ProjectId,
        bug_id: BugId,
        assignee: &str,
    ) -> AppResult<()> {
        let project = self.load_project_document(project_id).await?;
        let bug = self.load_bug_document(project_id, bug_id).await?;

        let required = if bug.is_unassigned() {
            Permission::AssignBugs
        } else {
            Permission::ReassignBug
        };
        self.require_any_permission(actor, &project, &[required, Permission::ManageBugs])?;
        require_assignable(&project, assignee)?;

        let mut fields = audit_fields(actor.email(), Utc::now());
        fields.insert("assignee".to_owned(), Value::String(assignee.to_owned()));

        let path = StorePath::bug(project_id, bug_id);
        retry::with_backoff(|| self.store.update(&path, fields.clone())).await?;

        tracing::info!(project = %project_id, bug = %bug_id, assignee, "bug assigned");
        Ok(())
    }
}

fn require_assignable(project: &Project, assignee: &str) -> AppResult<()> {
    if assignee.is_empty() || project.is_member(assignee) {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "assignee '{assignee}' is not a member of this project"
    )))
}
