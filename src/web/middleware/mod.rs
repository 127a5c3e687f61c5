//! Middleware for the Web API.

pub mod auth;

pub use auth::{bearer_token, AuthUser};
