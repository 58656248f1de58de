//! REST API handlers using axum
//!
//! Every response uses the `{success, message, data}` envelope.

use crate::application::Application;
use crate::constants::api::DEFAULT_LOG_LINES;
use crate::domain::{DomainError, Project, RuntimeState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared application state
pub type AppState = Arc<Application>;

/// Response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    fn ok(message: impl Into<String>, data: Option<T>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

/// Error response
pub type ErrorResponse = Envelope<()>;

type HandlerResult<T> = Result<Json<Envelope<T>>, (StatusCode, Json<ErrorResponse>)>;

fn status_code(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound(_) | DomainError::LogNotCreated(_) => StatusCode::NOT_FOUND,
        DomainError::AlreadyRunning { .. }
        | DomainError::NotRunning(_)
        | DomainError::ProjectRunning(_) => StatusCode::CONFLICT,
        DomainError::ManifestMissing(_)
        | DomainError::InvalidManifest(_)
        | DomainError::NoEntryPoint(_)
        | DomainError::InvalidInstanceCount => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::SpawnFailed { .. } | DomainError::Storage(_) | DomainError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(code: StatusCode, message: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        code,
        Json(ErrorResponse {
            success: false,
            message,
            data: None,
        }),
    )
}

fn domain_error(
    operation: &'static str,
) -> impl Fn(DomainError) -> (StatusCode, Json<ErrorResponse>) {
    move |e| {
        let code = status_code(&e);
        if code.is_server_error() {
            error!(operation = operation, error = %e, "Request failed");
        } else {
            debug!(operation = operation, error = %e, "Request rejected");
        }
        error_response(code, e.to_string())
    }
}

/// Register request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub working_dir: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub name: String,
}

/// `?lines=N`; unparsable values fall back to the default
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub lines: Option<String>,
}

/// `?clusterProcesses=N`; unparsable values mean a single instance
#[derive(Debug, Deserialize)]
pub struct StartQuery {
    #[serde(rename = "clusterProcesses")]
    pub cluster_processes: Option<String>,
}

// ===== Handlers =====

/// GET /status - Daemon liveness
pub async fn server_status() -> Json<Envelope<()>> {
    Envelope::ok("Server is available", None)
}

/// GET /manager/status - Runtime state of every project
pub async fn manager_status(
    State(app): State<AppState>,
) -> HandlerResult<BTreeMap<String, RuntimeState>> {
    debug!("REST manager status request");
    let states = app.status_all().await.map_err(domain_error("status_all"))?;
    Ok(Envelope::ok("Status is available", Some(states)))
}

/// POST /manager/project - Register a project
pub async fn register_project(
    State(app): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> HandlerResult<RegisterResponse> {
    info!(working_dir = %req.working_dir, "REST register request");

    if req.working_dir.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "working_dir is empty".to_string(),
        ));
    }

    let name = app
        .register(&req.working_dir)
        .await
        .map_err(domain_error("register"))?;
    Ok(Envelope::ok(
        "Project is added successfully",
        Some(RegisterResponse { name }),
    ))
}

/// GET /manager/project/:name - Project descriptor
pub async fn get_project(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<Project> {
    let project = app.get(&name).await.map_err(domain_error("get"))?;
    Ok(Envelope::ok("Project data is available", Some(project)))
}

/// DELETE /manager/project/:name - Remove a stopped project
pub async fn remove_project(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<()> {
    info!(project = %name, "REST remove request");
    app.remove(&name).await.map_err(domain_error("remove"))?;
    Ok(Envelope::ok("Project is removed successfully", None))
}

/// GET /manager/project/:name/status - Reconciled runtime state
pub async fn project_status(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<RuntimeState> {
    let state = app.status(&name).await.map_err(domain_error("status"))?;
    Ok(Envelope::ok("Project status is available", Some(state)))
}

/// GET /manager/project/:name/log?lines=N - Trailing log lines
pub async fn project_log(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LogQuery>,
) -> HandlerResult<Vec<String>> {
    let lines = query
        .lines
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_LOG_LINES);

    let tail = app.tail(&name, lines).await.map_err(domain_error("tail"))?;
    Ok(Envelope::ok("log is ready", Some(tail)))
}

/// POST /manager/project/:name/start?clusterProcesses=N - Start a project
pub async fn start_project(
    State(app): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<StartQuery>,
) -> HandlerResult<RuntimeState> {
    let instances = query
        .cluster_processes
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);
    info!(project = %name, instances = instances, "REST start request");

    let state = app
        .start(&name, instances)
        .await
        .map_err(domain_error("start"))?;
    Ok(Envelope::ok("Project is started successfully", Some(state)))
}

/// POST /manager/project/:name/stop - Stop a project
pub async fn stop_project(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<()> {
    info!(project = %name, "REST stop request");
    app.stop(&name).await.map_err(domain_error("stop"))?;
    Ok(Envelope::ok("Project is stopped successfully", None))
}
