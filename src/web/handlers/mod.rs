//! API handlers for the SMD HTTP edge.

pub mod auth;
pub mod directory;
pub mod file;
pub mod upload;
pub mod user;

pub use auth::*;
pub use directory::*;
pub use file::*;
pub use upload::*;
pub use user::*;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{authorize, Action, Privileges, SessionRegistry};
use crate::catalog::Catalog;
use crate::db::User;
use crate::file::Ingestor;
use crate::web::dto::HealthResponse;
use crate::web::error::ApiError;
use axum::Json;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn Catalog>,
    pub ingestor: Ingestor,
    pub sessions: Arc<SessionRegistry>,
    /// Lifetime of sessions issued at login.
    pub session_duration: Duration,
}

impl AppState {
    pub fn new(ingestor: Ingestor, sessions: Arc<SessionRegistry>, session_duration: Duration) -> Self {
        Self {
            catalog: Arc::clone(ingestor.catalog()),
            ingestor,
            sessions,
            session_duration,
        }
    }

    pub fn max_upload_size(&self) -> u64 {
        self.ingestor.max_upload_size()
    }

    /// Check `action` on a resource against its override, ACL and owner.
    pub async fn check_resource_access(
        &self,
        user: &User,
        resource_id: &str,
        owner_id: &str,
        action: Action,
    ) -> Result<(), ApiError> {
        let over = self.catalog.get_privilege_override(resource_id).await?;
        let acl = self.catalog.get_acl(resource_id).await?;
        let resolved = over.resolve(user);
        authorize(user, &resolved, &acl, owner_id, action).map_err(|e| {
            tracing::debug!(user_id = %user.id, resource_id, %action, "Access denied");
            ApiError::forbidden(e.to_string())
        })
    }
}

/// Require a role-level privilege for actions not tied to a resource.
pub fn require_role_privilege(user: &User, action: Action) -> Result<(), ApiError> {
    if Privileges::for_role(user.role).allows(action) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "user {} lacks {action} privilege",
            user.username
        )))
    }
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
