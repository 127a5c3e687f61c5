//! File handlers for the Web API.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};

use crate::auth::{Action, Privileges};
use crate::file::File;
use crate::web::dto::{ApiResponse, FileResponse, PrivilegesResponse, UserInfo};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;
use crate::SmdError;

/// Build a Content-Disposition value that cannot break out of the header.
///
/// Non-ASCII names get an RFC 5987 `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{filename}\"");
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

async fn load_file(state: &AppState, id: &str) -> Result<File, ApiError> {
    state
        .catalog
        .get_file(id)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))
}

/// GET /api/files - List files the caller may read.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let mut visible = Vec::new();
    for file in state.catalog.get_all_files().await? {
        if state
            .check_resource_access(&auth.user, &file.id, &file.owner_id, Action::Read)
            .await
            .is_ok()
        {
            visible.push(FileResponse::from(file));
        }
    }
    Ok(Json(ApiResponse::new(visible)))
}

/// GET /api/files/{id} - Get file metadata.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = load_file(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &file.id, &file.owner_id, Action::Read)
        .await?;
    Ok(Json(ApiResponse::new(FileResponse::from(file))))
}

/// GET /api/files/{id}/content - Download file bytes.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let file = load_file(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &file.id, &file.owner_id, Action::Read)
        .await?;

    let content = state.ingestor.read(&file).await?;
    let content_type = if file.content_type.is_empty() {
        "application/octet-stream"
    } else {
        file.content_type.as_str()
    };

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&file.name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build download response");
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /api/files/{id} - Delete a file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let file = load_file(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &file.id, &file.owner_id, Action::Delete)
        .await?;

    state.ingestor.remove(&file.id).await?;
    tracing::info!(file_id = %file.id, user_id = %auth.user.id, "File deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/files/{id}/privileges - Replace the file's privilege override.
///
/// Every flag must be supplied.
pub async fn set_file_privileges(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(privileges): Json<Privileges>,
) -> Result<Json<ApiResponse<PrivilegesResponse>>, ApiError> {
    let file = load_file(&state, &id).await?;
    let mut over = state.catalog.get_privilege_override(&file.id).await?;

    over.edit_privileges(&auth.user, &privileges)
        .map_err(SmdError::from)?;
    state
        .catalog
        .save_privilege_override(&file.id, &over)
        .await?;

    tracing::info!(file_id = %file.id, user_id = %auth.user.id, ?privileges, "File privileges updated");

    Ok(Json(ApiResponse::new(PrivilegesResponse {
        override_privileges: over.privileges(),
        active: over.is_active(),
    })))
}

/// GET /api/files/{id}/acl - List the file's access list.
pub async fn get_file_acl(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let file = load_file(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &file.id, &file.owner_id, Action::Read)
        .await?;
    let acl = state.catalog.get_acl(&file.id).await?;
    Ok(Json(ApiResponse::new(
        acl.iter().cloned().map(UserInfo::from).collect(),
    )))
}

/// PUT /api/files/{id}/acl/{user_id} - Grant a user access to the file.
pub async fn add_file_acl_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let file = load_file(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &file.id, &file.owner_id, Action::AddUsers)
        .await?;

    let member = state
        .catalog
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let mut acl = state.catalog.get_acl(&file.id).await?;
    acl.add_user(member).map_err(SmdError::from)?;
    state.catalog.save_acl(&file.id, &acl).await?;

    tracing::info!(file_id = %file.id, member_id = %user_id, "User added to access list");
    Ok(Json(ApiResponse::new(
        acl.iter().cloned().map(UserInfo::from).collect(),
    )))
}

/// DELETE /api/files/{id}/acl/{user_id} - Revoke a user's access to the file.
pub async fn remove_file_acl_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let file = load_file(&state, &id).await?;
    state
        .check_resource_access(&auth.user, &file.id, &file.owner_id, Action::AddUsers)
        .await?;

    let mut acl = state.catalog.get_acl(&file.id).await?;
    acl.remove_user_with_id(&user_id).map_err(SmdError::from)?;
    state.catalog.save_acl(&file.id, &acl).await?;

    tracing::info!(file_id = %file.id, member_id = %user_id, "User removed from access list");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_strips_injection() {
        let value = content_disposition_header("evil\r\nX-Injected: 1\".txt");
        assert!(!value.contains('\r'));
        assert!(!value.contains('\n'));
        assert!(value.contains("filename*=UTF-8''"));
    }

    #[test]
    fn test_content_disposition_unicode() {
        let value = content_disposition_header("informe-año.txt");
        assert!(value.contains("filename*=UTF-8''informe-a%C3%B1o.txt"));
    }
}
