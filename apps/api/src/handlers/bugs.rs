use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracklet_application::{AttachFileInput, CreateBugInput};
use tracklet_core::{AppError, BugId, ProjectId, UserIdentity};
use tracklet_domain::{BugStatus, Severity};

use crate::dto::{
    AssignBugRequest, AttachFileRequest, AttachmentResponse, BugResponse, CreateBugRequest,
    UpdateStatusRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_bugs_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<BugResponse>>> {
    let project_id = ProjectId::parse(project_id.as_str())?;
    let bugs = state
        .lifecycle_service
        .list_bugs(&user, project_id)
        .await?
        .into_iter()
        .map(BugResponse::from)
        .collect();

    Ok(Json(bugs))
}

pub async fn create_bug_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(project_id): Path<String>,
    Json(payload): Json<CreateBugRequest>,
) -> ApiResult<(StatusCode, Json<BugResponse>)> {
    let project_id = ProjectId::parse(project_id.as_str())?;
    let severity = Severity::from_str(payload.severity.as_str())?;

    let bug = state
        .lifecycle_service
        .create_bug(
            &user,
            project_id,
            CreateBugInput {
                title: payload.title,
                description: payload.description,
                severity,
                assignee: payload.assignee,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BugResponse::from(bug))))
}

pub async fn update_status_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((project_id, bug_id)): Path<(String, String)>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<StatusCode> {
    let project_id = ProjectId::parse(project_id.as_str())?;
    let bug_id = BugId::parse(bug_id.as_str())?;
    let status = BugStatus::from_str(payload.status.as_str())?;

    state
        .lifecycle_service
        .update_bug_status(&user, project_id, bug_id, status)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_bug_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((project_id, bug_id)): Path<(String, String)>,
    Json(payload): Json<AssignBugRequest>,
) -> ApiResult<StatusCode> {
    let project_id = ProjectId::parse(project_id.as_str())?;
    let bug_id = BugId::parse(bug_id.as_str())?;

    state
        .lifecycle_service
        .assign_bug(&user, project_id, bug_id, payload.assignee.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach_file_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((project_id, bug_id)): Path<(String, String)>,
    Json(payload): Json<AttachFileRequest>,
) -> ApiResult<(StatusCode, Json<AttachmentResponse>)> {
    let project_id = ProjectId::parse(project_id.as_str())?;
    let bug_id = BugId::parse(bug_id.as_str())?;
    let bytes = BASE64
        .decode(payload.data.as_bytes())
        .map_err(|error| AppError::Validation(format!("invalid base64 payload: {error}")))?;

    let url = state
        .lifecycle_service
        .attach_file(
            &user,
            project_id,
            bug_id,
            AttachFileInput {
                file_name: payload.file_name,
                content_type: payload.content_type,
                bytes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(AttachmentResponse { url })))
}
