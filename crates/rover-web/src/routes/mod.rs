//! HTTP route handlers.

pub mod config;
pub mod status;

use crate::AppState;
use axum::Router;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(config::routes())
        .merge(status::routes())
        .with_state(state)
}
