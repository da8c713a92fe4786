use super::*;

impl LifecycleService {
    /// Uploads an evidence file and appends its URL to a bug.
    ///
    /// The content-type allow-list is checked before the store or the blob
    /// store is contacted at all; a disallowed type leaves no trace anywhere.
    /// The URL lands through an atomic array append, so two users attaching
    /// to the same bug at once both keep their attachment.
    pub async fn attach_file(
        &self,
        actor: &UserIdentity,
        project_id: ProjectId,
        bug_id: BugId,
        input: AttachFileInput,
    ) -> AppResult<String> {
        let content_type = AttachmentContentType::from_mime(&input.content_type)?;
        let file_name = NonEmptyString::new(input.file_name)?;

        let project = self.load_project_document(project_id).await?;
        self.require_any_permission(
            actor,
            &project,
            &[Permission::UploadBugAttachment, Permission::UploadFiles],
        )?;
        self.load_bug_document(project_id, bug_id).await?;

        let blob_path = format!("uploads/{project_id}/{bug_id}/{file_name}");
        let url = retry::with_backoff(|| {
            self.blobs
                .upload(&blob_path, input.bytes.clone(), content_type)
        })
        .await?;

        let attachments_path = StorePath::bug_attachments(project_id, bug_id);
        retry::with_backoff(|| self.store.append(&attachments_path, Value::String(url.clone())))
            .await?;

        let bug_path = StorePath::bug(project_id, bug_id);
        let stamp = audit_fields(actor.email(), Utc::now());
        retry::with_backoff(|| self.store.update(&bug_path, stamp.clone())).await?;

        tracing::info!(project = %project_id, bug = %bug_id, file = %file_name, "attachment added");
        Ok(url)
    }
}
