//! `GET /status`: wall clock, upstream signal strength and uptime.
//!
//! With a `details` query parameter the reply also lists the clients of
//! the access point.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;

use rover_core::{DeviceStatus, StationInfo};

use crate::{error::ApiError, AppState};

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// RFC 3339, UTC.
    pub time: String,
    /// 0 when the station is not connected.
    pub rssi: i8,
    /// Microseconds since boot.
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stations: Option<Vec<StationEntry>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationEntry {
    pub mac: String,
    pub rssi: i8,
}

impl From<&StationInfo> for StationEntry {
    fn from(station: &StationInfo) -> Self {
        Self {
            mac: station.mac_string(),
            rssi: station.rssi,
        }
    }
}

impl From<DeviceStatus> for StatusResponse {
    fn from(status: DeviceStatus) -> Self {
        Self {
            time: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            rssi: status.rssi.unwrap_or(0),
            uptime: u64::try_from(status.uptime.as_micros()).unwrap_or(u64::MAX),
            stations: status
                .stations
                .map(|stations| stations.iter().map(StationEntry::from).collect()),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// GET /status
async fn get_status(
    State(controller): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = controller.status(params.contains_key("details")).await?;
    Ok(Json(status.into()))
}
