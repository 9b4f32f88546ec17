use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::jobs::checklist::generate_checklist;
use crate::jobs::intake::parse_email;
use crate::jobs::models::{JobRecord, JobStatus, JobTable};
use crate::jobs::report::generate_status_report;
use crate::sheets::PullOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub subject: String,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub job: JobRecord,
    pub checklist: String,
    pub synced: bool,
}

/// POST /api/v1/jobs/intake
pub async fn handle_intake(
    State(state): State<AppState>,
    Json(req): Json<IntakeRequest>,
) -> Result<Json<IntakeResponse>, AppError> {
    if req.subject.trim().is_empty() && req.details.trim().is_empty() {
        return Err(AppError::Validation(
            "subject and details are both empty".to_string(),
        ));
    }

    let record = parse_email(&req.subject, &req.details, &state.llm).await?;
    state.jobs.write().await.append(record.clone());

    let synced = push_best_effort(&state).await;
    let checklist = generate_checklist(&record.scope, &state.llm).await?;

    Ok(Json(IntakeResponse {
        job: record,
        checklist,
        synced,
    }))
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobRecord>,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    let jobs = state.jobs.read().await.records().to_vec();
    Json(JobListResponse { jobs })
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub synced: bool,
}

/// PATCH /api/v1/jobs/:job_id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    state
        .jobs
        .write()
        .await
        .update_status(&job_id, req.status)
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    let synced = push_best_effort(&state).await;

    Ok(Json(StatusUpdateResponse {
        job_id,
        status: req.status,
        synced,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChecklistRequest {
    pub job_type: String,
}

#[derive(Debug, Serialize)]
pub struct ChecklistResponse {
    pub checklist: String,
}

/// POST /api/v1/checklist
pub async fn handle_checklist(
    State(state): State<AppState>,
    Json(req): Json<ChecklistRequest>,
) -> Result<Json<ChecklistResponse>, AppError> {
    if req.job_type.trim().is_empty() {
        return Err(AppError::Validation("job_type is empty".to_string()));
    }
    let checklist = generate_checklist(&req.job_type, &state.llm).await?;
    Ok(Json(ChecklistResponse { checklist }))
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: String,
}

/// GET /api/v1/report
pub async fn handle_report(
    State(state): State<AppState>,
) -> Result<Json<ReportResponse>, AppError> {
    let table = state.jobs.read().await.clone();
    let report = generate_status_report(&table, &state.llm).await?;
    Ok(Json(ReportResponse { report }))
}

#[derive(Debug, Serialize)]
pub struct SyncPushResponse {
    pub pushed: usize,
}

/// POST /api/v1/sync/push
pub async fn handle_sync_push(
    State(state): State<AppState>,
) -> Result<Json<SyncPushResponse>, AppError> {
    let sheets = state.sheets.as_ref().ok_or(AppError::SyncDisabled)?;
    let table = state.jobs.read().await.clone();
    sheets.lock().await.push(&table).await?;
    Ok(Json(SyncPushResponse {
        pushed: table.len(),
    }))
}

#[derive(Debug, Serialize)]
pub struct SyncPullResponse {
    pub refreshed: bool,
    pub jobs: usize,
}

/// POST /api/v1/sync/pull
pub async fn handle_sync_pull(
    State(state): State<AppState>,
) -> Result<Json<SyncPullResponse>, AppError> {
    let sheets = state.sheets.as_ref().ok_or(AppError::SyncDisabled)?;
    let outcome = sheets.lock().await.pull().await?;

    match outcome {
        PullOutcome::Refreshed(table) => {
            let jobs = table.len();
            *state.jobs.write().await = table;
            Ok(Json(SyncPullResponse {
                refreshed: true,
                jobs,
            }))
        }
        PullOutcome::NoChange => {
            let jobs = state.jobs.read().await.len();
            Ok(Json(SyncPullResponse {
                refreshed: false,
                jobs,
            }))
        }
    }
}

/// Pushes the current table if sync is configured. A failure is logged and
/// reported as `false`; local state stays authoritative and the caller may
/// retry through the sync endpoint later.
async fn push_best_effort(state: &AppState) -> bool {
    let Some(sheets) = state.sheets.as_ref() else {
        return false;
    };
    let table: JobTable = state.jobs.read().await.clone();
    match sheets.lock().await.push(&table).await {
        Ok(()) => true,
        Err(e) => {
            warn!("job table push failed, continuing with local state: {e}");
            false
        }
    }
}
