//! Router configuration for the Web API.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    add_directory_file, add_file_acl_user, create_directory, create_user, delete_file,
    download_file, get_directory, get_file, get_file_acl, health_check, list_files, list_users,
    login, logout, move_directory, remove_file_acl_user, set_file_privileges, upload_file,
    AppState, MULTIPART_OVERHEAD,
};

/// Create the main router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let body_limit =
        usize::try_from(app_state.max_upload_size().saturating_add(MULTIPART_OVERHEAD))
            .unwrap_or(usize::MAX);

    let auth_routes = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout));

    let file_routes = Router::new()
        .route("/", get(list_files))
        .route("/:id", get(get_file).delete(delete_file))
        .route("/:id/content", get(download_file))
        .route("/:id/privileges", put(set_file_privileges))
        .route("/:id/acl", get(get_file_acl))
        .route(
            "/:id/acl/:user_id",
            put(add_file_acl_user).delete(remove_file_acl_user),
        );

    let directory_routes = Router::new()
        .route("/", post(create_directory))
        .route("/:id", get(get_directory))
        .route("/:id/parent", put(move_directory))
        .route("/:id/files/:file_id", put(add_directory_file));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/users", get(list_users).post(create_user))
        .nest("/files", file_routes)
        .nest("/directories", directory_routes);

    Router::new()
        .route("/upload", post(upload_file))
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}
