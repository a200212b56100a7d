//! Configuration routes.
//!
//! ### `GET /config`
//! Returns the configuration report.
//!
//! ### `POST /config`
//! Applies the JSON document in the body and returns the report taken
//! right after. An empty body only reports.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::debug;

use crate::{error::ApiError, AppState};

/// Create configuration routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/config", get(get_config).post(post_config))
}

fn json_response(report: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], report)
}

/// GET /config
async fn get_config(State(controller): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = controller.report().await?;
    Ok(json_response(report))
}

/// POST /config
async fn post_config(
    State(controller): State<AppState>,
    body: String,
) -> Result<impl IntoResponse, ApiError> {
    let report = if body.trim().is_empty() {
        controller.report().await?
    } else {
        debug!(target: "httpd", len = body.len(), "config apply");
        controller.apply(body).await?
    };
    Ok(json_response(report))
}
