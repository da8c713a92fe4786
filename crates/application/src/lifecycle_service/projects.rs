use super::*;

impl LifecycleService {
    /// Creates a project owned by the actor.
    ///
    /// Any signed-in user may create a project; the creator lands in the
    /// membership map as `admin` and can act on the project immediately.
    pub async fn create_project(
        &self,
        actor: &UserIdentity,
        input: CreateProjectInput,
    ) -> AppResult<Project> {
        let project = Project::new(
            input.name,
            input.description,
            actor.subject(),
            actor.email(),
            Utc::now(),
        )?;

        let path = StorePath::project(project.id);
        let document = serde_json::to_value(&project)
            .map_err(|error| AppError::Internal(format!("project encoding failed: {error}")))?;
        retry::with_backoff(|| self.store.write(&path, document.clone())).await?;

        tracing::info!(project = %project.id, owner = actor.email(), "project created");
        Ok(project)
    }

    /// Lists the projects the actor is a member of, newest first.
    ///
    /// A malformed sibling document is skipped with a warning rather than
    /// failing the whole listing.
    pub async fn list_projects(&self, actor: &UserIdentity) -> AppResult<Vec<Project>> {
        let root = StorePath::projects();
        let snapshot = retry::with_backoff(|| self.store.read(&root))
            .await?
            .unwrap_or_default();

        let mut projects = Vec::new();
        for (raw_id, node) in snapshot.as_object().cloned().unwrap_or_default() {
            match parse_document::<Project>(node) {
                Ok(project) if project.is_member(actor.email()) => projects.push(project),
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(project = %raw_id, %error, "skipping malformed project document");
                }
            }
        }

        projects.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(projects)
    }

    /// Loads one project the actor is a member of.
    pub async fn load_project(
        &self,
        actor: &UserIdentity,
        project_id: ProjectId,
    ) -> AppResult<Project> {
        let project = self.load_project_document(project_id).await?;
        self.require_member(actor, &project)?;
        Ok(project)
    }

    /// Adds a member to the project, or changes an existing member's role.
    ///
    /// The role string must name a known role and the email must be
    /// structurally valid; either rejection happens before any write. The
    /// membership merge touches only the invited email, so concurrent
    /// invitations of different members both survive.
    pub async fn invite_member(
        &self,
        actor: &UserIdentity,
        project_id: ProjectId,
        email: &str,
        role: &str,
    ) -> AppResult<()> {
        let project = self.load_project_document(project_id).await?;
        self.require_any_permission(actor, &project, &[Permission::InviteMembers])?;

        let email = EmailAddress::new(email)?;
        let role = Role::from_str(role)?;

        let mut member_fields = Map::new();
        member_fields.insert(
            String::from(email.clone()),
            Value::String(role.as_str().to_owned()),
        );

        let members_path = StorePath::project_members(project_id);
        retry::with_backoff(|| self.store.update(&members_path, member_fields.clone())).await?;

        let project_path = StorePath::project(project_id);
        let stamp = audit_fields(actor.email(), Utc::now());
        retry::with_backoff(|| self.store.update(&project_path, stamp.clone())).await?;

        tracing::info!(
            project = %project_id,
            member = %email,
            role = role.as_str(),
            "member invited"
        );
        Ok(())
    }
}
