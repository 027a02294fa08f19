use crate::config::Config;
use crate::config_client::{ConfigSnapshot, ConfigSource, HttpConfigClient};
use crate::errors::UpstreamError;
use crate::locator::{coerce_id, is_unset, parse_leading_int};
use crate::log_client::{HttpLogClient, LogStore};
use crate::types::{ConfigRecord, DroneStatus, LogRecord, NewLogRecord};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub configs: Arc<dyn ConfigSource>,
    pub logs: Arc<dyn LogStore>,
    pub environment: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub enable_debug_routes: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, UpstreamError> {
        let configs = HttpConfigClient::new(
            config.config_upstream.url.clone(),
            &config.user_agent,
            config.config_timeout(),
        )?;
        let logs = HttpLogClient::new(
            config.log_upstream.url.clone(),
            config.log_upstream.api_token.clone().unwrap_or_default(),
            &config.user_agent,
            config.log_timeout(),
        )?;

        Ok(AppState {
            configs: Arc::new(configs),
            logs: Arc::new(logs),
            environment: config.environment.clone(),
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            enable_debug_routes: config.enable_debug_routes,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/configs/{drone_id}", get(get_config))
        .route("/status/{drone_id}", get(get_status))
        .route("/logs/{drone_id}", get(get_logs))
        .route("/logs", post(create_log));

    if state.enable_debug_routes {
        router = router.route("/debug/config-server", get(debug_config_server));
    }

    router
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// What the gateway was doing when an upstream failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    FetchConfig,
    FetchStatus,
    FetchLogs,
    CreateLog,
    InspectConfig,
}

impl Operation {
    const fn failure_message(&self) -> &'static str {
        match self {
            Operation::FetchConfig => "Failed to fetch drone configuration",
            Operation::FetchStatus => "Failed to fetch drone status",
            Operation::FetchLogs => "Failed to fetch drone logs",
            Operation::CreateLog => "Failed to create drone log",
            Operation::InspectConfig => "Failed to inspect drone config server",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.failure_message())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Drone ID must be a number")]
    InvalidDroneId,

    #[error("drone_id, drone_name, country, and celsius are required")]
    MissingFields,

    #[error("celsius must be a valid number")]
    InvalidCelsius,

    #[error("{0} must be a string")]
    InvalidField(&'static str),

    #[error("Request body must be a JSON object")]
    InvalidBody,

    #[error("No configuration found for drone ID: {0}")]
    DroneNotFound(String),

    #[error("Route {method} {path} not found")]
    RouteNotFound { method: Method, path: String },

    #[error("{operation}: {source}")]
    Upstream {
        operation: Operation,
        source: UpstreamError,
    },
}

impl ApiError {
    fn upstream(operation: Operation) -> impl FnOnce(UpstreamError) -> ApiError {
        move |source| ApiError::Upstream { operation, source }
    }

    fn error_label(&self) -> &'static str {
        match self {
            ApiError::InvalidDroneId => "Invalid drone ID",
            ApiError::MissingFields => "Missing required fields",
            ApiError::InvalidCelsius => "Invalid celsius value",
            ApiError::InvalidField(_) | ApiError::InvalidBody => "Invalid request body",
            ApiError::DroneNotFound(_) => "Drone not found",
            ApiError::RouteNotFound { .. } => "Not Found",
            ApiError::Upstream { .. } => "Internal server error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidDroneId
            | ApiError::MissingFields
            | ApiError::InvalidCelsius
            | ApiError::InvalidField(_)
            | ApiError::InvalidBody => StatusCode::BAD_REQUEST,
            ApiError::DroneNotFound(_) | ApiError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Upstream details are reduced to a coarse category.
    fn message(&self) -> String {
        match self {
            ApiError::Upstream { operation, source } => match source {
                UpstreamError::Unreachable { upstream, .. } => {
                    format!("Unable to connect to {}", upstream.server_name())
                }
                UpstreamError::Timeout { .. } => "Request timeout".to_string(),
                _ => operation.failure_message().to_string(),
            },
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream { operation, source } = &self {
            tracing::error!(
                operation = ?operation,
                upstream = source.upstream().map(|u| u.as_str()),
                error = %source,
                "Upstream failure"
            );
        }

        let body = Json(ApiErrorResponse {
            error: self.error_label(),
            message: self.message(),
        });

        (self.status(), body).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.environment,
    })
}

/// Accepts only non-empty runs of ASCII digits.
fn validate_drone_id(raw: &str) -> Result<&str, ApiError> {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        Ok(raw)
    } else {
        Err(ApiError::InvalidDroneId)
    }
}

async fn lookup_config(
    state: &AppState,
    raw_id: &str,
    operation: Operation,
) -> Result<ConfigRecord, ApiError> {
    let drone_id = validate_drone_id(raw_id)?;

    state
        .configs
        .fetch_config(drone_id)
        .await
        .map_err(ApiError::upstream(operation))?
        .ok_or_else(|| ApiError::DroneNotFound(drone_id.to_string()))
}

async fn get_config(
    State(state): State<AppState>,
    Path(drone_id): Path<String>,
) -> Result<Json<ConfigRecord>, ApiError> {
    let record = lookup_config(&state, &drone_id, Operation::FetchConfig).await?;
    Ok(Json(record))
}

async fn get_status(
    State(state): State<AppState>,
    Path(drone_id): Path<String>,
) -> Result<Json<DroneStatus>, ApiError> {
    let record = lookup_config(&state, &drone_id, Operation::FetchStatus).await?;
    Ok(Json(record.status()))
}

#[derive(Deserialize, Debug)]
struct LogsParams {
    page: Option<String>,
    limit: Option<String>,
}

/// Leading-integer parse that only accepts values of at least 1.
fn positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(parse_leading_int)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
}

async fn get_logs(
    State(state): State<AppState>,
    Path(drone_id): Path<String>,
    Query(params): Query<LogsParams>,
) -> Result<Response, ApiError> {
    let drone_id: i64 = validate_drone_id(&drone_id)?
        .parse()
        .map_err(|_| ApiError::InvalidDroneId)?;
    let limit = positive(params.limit.as_deref())
        .unwrap_or(state.default_page_size)
        .min(state.max_page_size);

    if params.page.as_deref().is_some_and(|p| !p.is_empty()) {
        let page = positive(params.page.as_deref()).unwrap_or(1);
        let page = state
            .logs
            .list_logs_page(drone_id, page, limit)
            .await
            .map_err(ApiError::upstream(Operation::FetchLogs))?;
        return Ok(Json(page).into_response());
    }

    let logs: Vec<LogRecord> = state
        .logs
        .list_logs(drone_id, limit, None)
        .await
        .map_err(ApiError::upstream(Operation::FetchLogs))?;
    Ok(Json(logs).into_response())
}

/// Checks an inbound log body and converts it to the upstream shape.
fn new_log_from_body(body: &Map<String, Value>) -> Result<NewLogRecord, ApiError> {
    let present = |key: &str| body.get(key).filter(|value| !is_unset(value));

    let (Some(drone_id), Some(drone_name), Some(country)) =
        (present("drone_id"), present("drone_name"), present("country"))
    else {
        return Err(ApiError::MissingFields);
    };
    let Some(celsius) = body.get("celsius") else {
        return Err(ApiError::MissingFields);
    };

    let celsius = match celsius {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|c| c.is_finite())
    .ok_or(ApiError::InvalidCelsius)?;

    Ok(NewLogRecord {
        drone_id: coerce_id(drone_id).ok_or(ApiError::InvalidDroneId)?,
        drone_name: drone_name
            .as_str()
            .ok_or(ApiError::InvalidField("drone_name"))?
            .to_string(),
        country: country
            .as_str()
            .ok_or(ApiError::InvalidField("country"))?
            .to_string(),
        celsius,
    })
}

#[derive(Serialize)]
struct CreatedLogResponse {
    success: bool,
    message: &'static str,
    data: LogRecord,
}

async fn create_log(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedLogResponse>), ApiError> {
    let body: Value = serde_json::from_slice(&body).map_err(|_| ApiError::InvalidBody)?;
    let new_log = new_log_from_body(body.as_object().ok_or(ApiError::InvalidBody)?)?;

    let created = state
        .logs
        .create_log(&new_log)
        .await
        .map_err(ApiError::upstream(Operation::CreateLog))?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedLogResponse {
            success: true,
            message: "Log created successfully",
            data: created,
        }),
    ))
}

async fn debug_config_server(
    State(state): State<AppState>,
) -> Result<Json<ConfigSnapshot>, ApiError> {
    let snapshot = state
        .configs
        .inspect()
        .await
        .map_err(ApiError::upstream(Operation::InspectConfig))?;
    Ok(Json(snapshot))
}

async fn not_found(method: Method, uri: OriginalUri) -> ApiError {
    ApiError::RouteNotFound {
        method,
        path: uri.0.path().to_string(),
    }
}
