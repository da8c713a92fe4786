use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use tracklet_application::CreateProjectInput;
use tracklet_core::{ProjectId, UserIdentity};

use crate::dto::{CreateProjectRequest, InviteMemberRequest, ProjectResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_projects_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<ProjectResponse>>> {
    let projects = state
        .lifecycle_service
        .list_projects(&user)
        .await?
        .into_iter()
        .map(ProjectResponse::from)
        .collect();

    Ok(Json(projects))
}

pub async fn create_project_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    let project = state
        .lifecycle_service
        .create_project(
            &user,
            CreateProjectInput {
                name: payload.name,
                description: payload.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

pub async fn get_project_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectResponse>> {
    let project_id = ProjectId::parse(project_id.as_str())?;
    let project = state.lifecycle_service.load_project(&user, project_id).await?;
    Ok(Json(ProjectResponse::from(project)))
}

pub async fn invite_member_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(project_id): Path<String>,
    Json(payload): Json<InviteMemberRequest>,
) -> ApiResult<StatusCode> {
    let project_id = ProjectId::parse(project_id.as_str())?;
    state
        .lifecycle_service
        .invite_member(&user, project_id, payload.email.as_str(), payload.role.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
