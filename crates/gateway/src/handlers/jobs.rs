//! Ingestion job status handlers

use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::extractors::ValidUuid;
use crate::AppState;
use gazette_common::errors::{AppError, Result};

/// Job status response
#[derive(Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub source: String,
    pub status: String,
    /// No further updates will happen
    pub terminal: bool,
    pub notices_found: i32,
    pub entries_created: i32,
    pub duplicates_skipped: i32,
    pub failures: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub created_at: String,
}

/// Get job status
pub async fn get_job(
    State(state): State<AppState>,
    ValidUuid(job_id): ValidUuid,
) -> Result<Json<JobResponse>> {
    let job = state
        .repository
        .find_job(job_id)
        .await?
        .ok_or_else(|| AppError::JobNotFound {
            id: job_id.to_string(),
        })?;

    let terminal = job.is_terminal();

    Ok(Json(JobResponse {
        job_id: job.id,
        source: job.source,
        status: job.status,
        terminal,
        notices_found: job.notices_found,
        entries_created: job.entries_created,
        duplicates_skipped: job.duplicates_skipped,
        failures: job.failures,
        error_message: job.error_message,
        started_at: job.started_at.map(|dt| dt.to_rfc3339()),
        completed_at: job.completed_at.map(|dt| dt.to_rfc3339()),
        created_at: job.created_at.to_rfc3339(),
    }))
}
