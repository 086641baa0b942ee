//! HTTP surface: submit a deployment, inspect jobs.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::jobs::{Job, JobManager, JobStatus, JobSummary};
use crate::pipeline::Pipeline;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub config: Arc<Config>,
    pub manager: JobManager,
    pub pipeline: Pipeline,
}

pub type SharedState = Arc<AppState>;

// ── Request and response types ────────────────────────────────────────

#[derive(Deserialize)]
pub struct DeployRequest {
    pub repo_url: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/request", post(submit_deploy))
        .route("/list", get(list_jobs))
        .route("/job/{id}", get(get_job))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn submit_deploy(
    State(state): State<SharedState>,
    Json(req): Json<DeployRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let repo_url = req.repo_url.trim().to_string();
    if !repo_url.starts_with("http://") && !repo_url.starts_with("https://") {
        return Err(ApiError::BadRequest("repo_url must be an http(s) git URL".to_string()));
    }

    let job = state.manager.create(&state.config.data_dir).await;
    tracing::info!(job_id = %job.id, repo_url = %repo_url, "deploy request accepted");

    let pipeline = state.pipeline.clone();
    let log = state.manager.logger(&job.id);
    let id = job.id.clone();
    let workdir = job.workdir.clone();
    let description = req.description;
    state.manager.spawn(job.id.clone(), async move {
        pipeline.run(&id, &repo_url, &description, &workdir, &log).await
    });

    Ok(Json(SubmitResponse { job_id: job.id, status: JobStatus::Queued }))
}

async fn get_job(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    match state.manager.get(&id).await {
        Some(job) => Ok(Json(job)),
        None => Err(ApiError::NotFound("Job not found".to_string())),
    }
}

async fn list_jobs(State(state): State<SharedState>) -> Json<Vec<JobSummary>> {
    Json(state.manager.list().await)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
