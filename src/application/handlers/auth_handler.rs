//! Handlers for the unauthenticated auth routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_body, MessageResponse};
use crate::application::AppState;
use crate::domain::entities::user::PublicUser;
use crate::domain::errors::ApiError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Session response: bearer token plus the public user, as issued by
/// register and login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let payload: RegisterRequest = parse_body(body)?;
    let session = state
        .auth
        .register(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            success: true,
            token: session.token,
            user: session.user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SessionResponse>, ApiError> {
    let payload: LoginRequest = parse_body(body)?;
    let session = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(SessionResponse {
        success: true,
        token: session.token,
        user: session.user,
    }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<MessageResponse>, ApiError> {
    let payload: ForgotPasswordRequest = parse_body(body)?;
    state.auth.forgot_password(&payload.email).await?;
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<MessageResponse>, ApiError> {
    let payload: ResetPasswordRequest = parse_body(body)?;
    state
        .auth
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password reset successful")))
}
