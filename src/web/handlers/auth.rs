//! Authentication handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{verify_password, Session};
use crate::web::dto::{ApiResponse, LoginRequest, LoginResponse, UserInfo};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;
use crate::SmdError;

/// POST /api/auth/login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let user = state
        .catalog
        .get_user_by_username(&req.username)
        .await?
        .ok_or_else(|| {
            tracing::debug!(username = %req.username, "Login for unknown user");
            ApiError::unauthorized("Invalid credentials")
        })?;

    if verify_password(&req.password, &user.password).is_err() {
        tracing::info!(username = %user.username, "Failed login attempt");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let session = Session::issue(user.id.clone(), state.session_duration);
    let token = session.token.clone();
    state.sessions.add(session).map_err(SmdError::from)?;

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

    Ok(Json(ApiResponse::new(LoginResponse {
        token: token.token,
        expires_at: token.expires_at,
        user: UserInfo::from(user),
    })))
}

/// POST /api/auth/logout - End the current session.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> StatusCode {
    state.sessions.remove(&auth.session.id);
    tracing::info!(user_id = %auth.user.id, "User logged out");
    StatusCode::NO_CONTENT
}
