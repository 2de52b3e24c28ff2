//! Spring Boot Admin compatible endpoints
//!
//! - `GET /ping`: service version as plain text
//! - `GET /admin/info`: application name and version
//! - `GET /admin/health`: overall status plus database details
//! - `GET|HEAD /admin/logfile`: tail of the configured log file

use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::Error, i18n::Localizer, responses::bad_request, state::AppState};

pub const LOG_FILE_NOT_FOUND: &str = "Log file not found.";

/// Checks the database behind `/admin/health`
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    /// Run a trivial query; returns the database product name
    async fn check(&self) -> Result<String, Error>;
}

#[cfg(feature = "database")]
#[async_trait]
impl DatabaseProbe for sqlx::PgPool {
    async fn check(&self) -> Result<String, Error> {
        sqlx::query("SELECT 1")
            .execute(self)
            .await
            .map_err(|e| Error::Internal(format!("Connection failed: {}", e)))?;
        Ok("PostgreSQL".to_string())
    }
}

/// `UP` or `DOWN`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Body of `/admin/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

/// Database entry inside the health details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: HealthStatus,
    pub database: String,
}

/// Body of `/admin/info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub app: AppInfo,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
}

impl InfoResponse {
    pub fn from_state(state: &AppState) -> Self {
        let service = &state.config().service;
        Self {
            app: AppInfo {
                name: service.name.clone(),
            },
            version: service.version.clone(),
        }
    }
}

/// Routes for the admin endpoints, relative to the context path
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/admin/info", get(info))
        .route("/admin/health", get(health))
        .route("/admin/logfile", get(logfile).head(logfile_head))
}

pub async fn ping(State(state): State<AppState>) -> String {
    state.config().service.version.clone()
}

pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse::from_state(&state))
}

/// Overall health; `UP` with no details when no probe is configured
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let Some(probe) = state.db_probe() else {
        return Json(HealthResponse {
            status: HealthStatus::Up,
            description: None,
            details: BTreeMap::new(),
        });
    };

    let response = match probe.check().await {
        Ok(database) => {
            let entry = DatabaseHealth {
                status: HealthStatus::Up,
                database,
            };
            HealthResponse {
                status: HealthStatus::Up,
                description: None,
                details: BTreeMap::from([(
                    "database".to_string(),
                    serde_json::to_value(entry).unwrap_or(Value::Null),
                )]),
            }
        }
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            HealthResponse {
                status: HealthStatus::Down,
                description: Some(e.to_string()),
                details: BTreeMap::new(),
            }
        }
    };

    Json(response)
}

/// Start offset from a `Range: bytes=N-` header
///
/// `NaN`, garbage and offsets past `total` all read from the start.
pub fn range_start(range: Option<&str>, total: u64) -> u64 {
    let Some(range) = range else {
        return 0;
    };

    let start = range
        .split("bytes=")
        .nth(1)
        .unwrap_or_default()
        .replace('-', "")
        .replace("NaN", "0");

    match start.trim().parse::<u64>() {
        Ok(start) if start <= total => start,
        _ => 0,
    }
}

/// Log file content from the requested offset, answered as 206
pub async fn logfile(
    State(state): State<AppState>,
    localizer: Localizer,
    headers: HeaderMap,
) -> Response {
    let Some(path) = state.config().logging.file.as_ref() else {
        return bad_request(&localizer, Some(LOG_FILE_NOT_FOUND));
    };

    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Cannot read log file {}: {}", path.display(), e);
            return bad_request(&localizer, Some(LOG_FILE_NOT_FOUND));
        }
    };

    let total = content.len() as u64;
    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let start = range_start(range, total) as usize;
    let segment = String::from_utf8_lossy(&content[start..]).into_owned();
    let content_range = [(header::CONTENT_RANGE, format!("bytes {}/{}", total, total))];

    // Admin UIs polling with a Range header expect a JSON string
    if range.is_some() {
        (StatusCode::PARTIAL_CONTENT, content_range, Json(segment)).into_response()
    } else {
        (StatusCode::PARTIAL_CONTENT, content_range, segment).into_response()
    }
}

pub async fn logfile_head() -> StatusCode {
    StatusCode::OK
}
