//! User administration handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{hash_password, Action};
use crate::db::User;
use crate::web::dto::{ApiResponse, CreateUserRequest, UserInfo};
use crate::web::error::ApiError;
use crate::web::handlers::{require_role_privilege, AppState};
use crate::web::middleware::AuthUser;
use crate::SmdError;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 64;

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "username must be 1-{MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ApiError::bad_request(
            "username can only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(())
}

/// POST /api/users - Create a user. Requires AddUsers.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), ApiError> {
    require_role_privilege(&auth.user, Action::AddUsers)?;
    validate_username(&req.username)?;

    let password_hash = hash_password(&req.password).map_err(SmdError::from)?;
    let user = User::new(req.username, password_hash, req.email, req.role);
    state.catalog.insert_user(&user).await?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        role = %user.role,
        created_by = %auth.user.id,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::new(UserInfo::from(user)))))
}

/// GET /api/users - List users. Requires AddUsers.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    require_role_privilege(&auth.user, Action::AddUsers)?;
    let users = state.catalog.get_all_users().await?;
    Ok(Json(ApiResponse::new(
        users.into_iter().map(UserInfo::from).collect(),
    )))
}
