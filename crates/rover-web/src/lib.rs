//! # rover-web
//!
//! HTTP surface of the rover.
//!
//! - `GET /config` - current configuration report
//! - `POST /config` - apply a config document, reply with the new report
//! - `GET /status` - clock, signal strength and uptime; `?details` adds the
//!   clients of the access point
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rover_web::create_router;
//!
//! let app = create_router(handle);
//! let listener = TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::create_router;

/// Shared state for all route handlers.
pub type AppState = rover_server::ControllerHandle;
