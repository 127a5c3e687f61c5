//! Upload handler.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        Multipart, State,
    },
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    Json,
};
use tokio::io::AsyncWriteExt;

use crate::auth::Action;
use crate::file::{IngestRequest, UploadSource};
use crate::web::dto::{ApiResponse, FileResponse};
use crate::web::error::ApiError;
use crate::web::handlers::{require_role_privilege, AppState};
use crate::web::middleware::AuthUser;
use crate::SmdError;

/// Multipart field carrying the file bytes.
pub const UPLOAD_FIELD: &str = "uploadFile";

/// Optional text field carrying the destination hint.
pub const HINT_FIELD: &str = "subdirectory";

/// Bytes allowed above the upload ceiling for multipart framing.
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// File part spooled to disk.
struct StagedUpload {
    file: std::fs::File,
    size: u64,
    name: String,
    content_type: String,
}

/// Spool a file field to an anonymous temp file, counting bytes as they
/// arrive. Stops as soon as the count passes `max`.
async fn stage_field(field: &mut Field<'_>, max: u64) -> Result<(std::fs::File, u64), ApiError> {
    let staged = tempfile::tempfile().map_err(SmdError::Storage)?;
    let mut out = tokio::fs::File::from_std(staged);
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;
        if size > max {
            return Err(SmdError::PayloadTooLarge { size, max }.into());
        }
        out.write_all(&chunk).await.map_err(SmdError::Storage)?;
    }
    out.flush().await.map_err(SmdError::Storage)?;

    Ok((out.into_std().await, size))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// POST /upload - Ingest one file from a multipart body.
///
/// The `uploadFile` part is required; a `subdirectory` text part, if
/// present, becomes the destination hint.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    require_role_privilege(&auth.user, Action::Write)?;
    let max = state.max_upload_size();

    match content_length(&headers) {
        Some(0) => return Err(SmdError::EmptyBody.into()),
        Some(len) if len > max.saturating_add(MULTIPART_OVERHEAD) => {
            return Err(SmdError::PayloadTooLarge { size: len, max }.into());
        }
        _ => {}
    }

    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Upload without a multipart body");
        ApiError::from(SmdError::EmptyBody)
    })?;

    let mut staged: Option<StagedUpload> = None;
    let mut hint: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            UPLOAD_FIELD if staged.is_none() => {
                let name = field
                    .file_name()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or("upload")
                    .to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&name)
                            .first_or_octet_stream()
                            .to_string()
                    });
                let (file, size) = stage_field(&mut field, max).await?;
                staged = Some(StagedUpload {
                    file,
                    size,
                    name,
                    content_type,
                });
            }
            HINT_FIELD => hint = Some(field.text().await?),
            _ => {}
        }
    }

    let request = match staged {
        Some(upload) => IngestRequest {
            source: UploadSource::File(Box::new(upload.file)),
            declared_size: Some(upload.size),
            content_type: upload.content_type,
            name: upload.name,
            hint,
            owner_id: auth.user.id.clone(),
        },
        None => IngestRequest {
            source: UploadSource::NoFileField,
            declared_size: None,
            content_type: String::new(),
            name: String::new(),
            hint,
            owner_id: auth.user.id.clone(),
        },
    };

    let file = state.ingestor.ingest(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FileResponse::from(file))),
    ))
}
