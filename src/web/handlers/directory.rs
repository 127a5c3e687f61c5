//! Directory handlers for the Web API.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::Action;
use crate::file::{ensure_acyclic, Directory};
use crate::web::dto::{ApiResponse, CreateDirectoryRequest, DirectoryResponse, MoveDirectoryRequest};
use crate::web::error::ApiError;
use crate::web::handlers::{require_role_privilege, AppState};
use crate::web::middleware::AuthUser;

/// Maximum directory name length.
pub const MAX_DIRECTORY_NAME_LENGTH: usize = 255;

async fn load_directory(state: &AppState, id: &str) -> Result<Directory, ApiError> {
    state
        .catalog
        .get_directory(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Directory not found"))
}

/// POST /api/directories - Create a directory, optionally under a parent.
pub async fn create_directory(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreateDirectoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DirectoryResponse>>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > MAX_DIRECTORY_NAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "directory name must be 1-{MAX_DIRECTORY_NAME_LENGTH} characters"
        )));
    }

    let parent = match req.parent_directory_id.as_deref() {
        Some(parent_id) => {
            let parent = load_directory(&state, parent_id).await?;
            state
                .check_resource_access(
                    &auth.user,
                    &parent.id,
                    &parent.owner_id,
                    Action::CreateDirectories,
                )
                .await?;
            Some(parent)
        }
        None => {
            require_role_privilege(&auth.user, Action::CreateDirectories)?;
            None
        }
    };

    let directory = Directory::new(name, auth.user.id.clone(), req.parent_directory_id.clone());
    ensure_acyclic(
        state.catalog.as_ref(),
        &directory.id,
        directory.parent_directory_id.as_deref(),
    )
    .await?;
    state.catalog.insert_directory(&directory).await?;

    if let Some(mut parent) = parent {
        parent.add_subdirectory(directory.id.clone());
        state.catalog.update_directory(&parent).await?;
    }

    tracing::info!(directory_id = %directory.id, owner_id = %directory.owner_id, "Directory created");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(directory))))
}

/// GET /api/directories/{id} - Get a directory and its membership lists.
pub async fn get_directory(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DirectoryResponse>>, ApiError> {
    let directory = load_directory(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &directory.id, &directory.owner_id, Action::Read)
        .await?;
    Ok(Json(ApiResponse::new(directory)))
}

/// PUT /api/directories/{id}/parent - Move a directory within the tree.
///
/// Requires Write on the directory and CreateDirectories on the destination.
/// Rejects moves that would make a directory its own ancestor.
pub async fn move_directory(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<MoveDirectoryRequest>,
) -> Result<Json<ApiResponse<DirectoryResponse>>, ApiError> {
    let mut directory = load_directory(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &directory.id, &directory.owner_id, Action::Write)
        .await?;

    let new_parent_id = req.parent_directory_id;
    if new_parent_id == directory.parent_directory_id {
        return Ok(Json(ApiResponse::new(directory)));
    }

    let new_parent = match new_parent_id.as_deref() {
        Some(parent_id) => {
            let parent = load_directory(&state, parent_id).await?;
            state
                .check_resource_access(
                    &auth.user,
                    &parent.id,
                    &parent.owner_id,
                    Action::CreateDirectories,
                )
                .await?;
            Some(parent)
        }
        None => {
            require_role_privilege(&auth.user, Action::CreateDirectories)?;
            None
        }
    };
    ensure_acyclic(state.catalog.as_ref(), &directory.id, new_parent_id.as_deref()).await?;

    // Attach to the new parent first so a failure never leaves it orphaned.
    if let Some(mut new_parent) = new_parent {
        new_parent.add_subdirectory(directory.id.clone());
        state.catalog.update_directory(&new_parent).await?;
    }
    if let Some(old_parent_id) = directory.parent_directory_id.as_deref() {
        if let Some(mut old_parent) = state.catalog.get_directory(old_parent_id).await? {
            old_parent.remove_subdirectory(&directory.id);
            state.catalog.update_directory(&old_parent).await?;
        }
    }

    directory.parent_directory_id = new_parent_id;
    state.catalog.update_directory(&directory).await?;

    tracing::info!(directory_id = %directory.id, parent = ?directory.parent_directory_id, "Directory moved");
    Ok(Json(ApiResponse::new(directory)))
}

/// PUT /api/directories/{id}/files/{file_id} - Add a file to a directory.
pub async fn add_directory_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DirectoryResponse>>, ApiError> {
    let mut directory = load_directory(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &directory.id, &directory.owner_id, Action::Write)
        .await?;

    if state.catalog.get_file(&file_id).await?.is_none() {
        return Err(ApiError::not_found("File not found"));
    }

    if directory.add_file(file_id) {
        state.catalog.update_directory(&directory).await?;
    }
    Ok(Json(ApiResponse::new(directory)))
}
