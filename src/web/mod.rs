//! HTTP edge for SMD.
//!
//! This module exposes upload, file, directory, access-list and session
//! endpoints over axum.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
