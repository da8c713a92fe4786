use std::str::FromStr;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use tower_sessions::Session;
use tracklet_application::SignedInUser;
use tracklet_core::AppError;
use tracklet_domain::GlobalRole;

use crate::dto::{LoginRequest, ProviderLoginRequest, RegisterRequest, SessionUserResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Session key holding the signed-in user.
pub const SESSION_USER_KEY: &str = "tracklet.session.user";

pub async fn register_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionUserResponse>)> {
    let global_role = GlobalRole::from_str(payload.global_role.as_str())?;
    let signed_in = state
        .identity_provider
        .sign_up(
            payload.email.as_str(),
            payload.password.as_str(),
            payload.display_name.as_str(),
            global_role,
        )
        .await?;

    persist_session(&session, &signed_in).await?;
    Ok((StatusCode::CREATED, Json(SessionUserResponse::from(signed_in))))
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<SessionUserResponse>> {
    let signed_in = state
        .identity_provider
        .sign_in(payload.email.as_str(), payload.password.as_str())
        .await?;

    persist_session(&session, &signed_in).await?;
    Ok(Json(SessionUserResponse::from(signed_in)))
}

pub async fn provider_login_handler(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Json(payload): Json<ProviderLoginRequest>,
) -> ApiResult<Json<SessionUserResponse>> {
    let signed_in = state
        .identity_provider
        .sign_in_with_provider(
            provider.as_str(),
            payload.email.as_str(),
            payload.display_name.as_str(),
        )
        .await?;

    persist_session(&session, &signed_in).await?;
    Ok(Json(SessionUserResponse::from(signed_in)))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    session: Session,
) -> ApiResult<StatusCode> {
    state.identity_provider.sign_out().await?;
    session
        .flush()
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear session: {error}")))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me_handler(
    Extension(signed_in): Extension<SignedInUser>,
) -> ApiResult<Json<SessionUserResponse>> {
    Ok(Json(SessionUserResponse::from(signed_in)))
}

async fn persist_session(session: &Session, signed_in: &SignedInUser) -> Result<(), AppError> {
    session
        .insert(SESSION_USER_KEY, signed_in)
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist session: {error}")))
}
