//! Gazette extraction, ingestion and search handlers

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::{not_blank, PageResponse};
use crate::extractors::{ValidJson, ValidQuery, ValidUuid};
use crate::AppState;
use gazette_common::{
    db::{models::GazetteEntry, models::NoticeKind, GazetteQuery},
    errors::{AppError, Result},
    metrics,
};
use gazette_extractor::{run_tracked, Document, Extraction, IngestionReport};

/// Request to preview what a gazette contains
#[derive(Debug, Deserialize, Validate)]
pub struct ExtractRequest {
    #[validate(custom(function = "not_blank"))]
    pub text: String,
}

/// Request to ingest a gazette
#[derive(Debug, Deserialize, Validate)]
pub struct IngestRequest {
    #[validate(custom(function = "not_blank"))]
    pub text: String,

    /// Label stored on each entry (file name, URL); defaults to the configured source
    #[validate(length(max = 500))]
    pub source: Option<String>,
}

/// Response after ingesting a gazette
#[derive(Serialize)]
pub struct IngestResponse {
    pub job_id: Uuid,
    pub status: String,
    pub poll_url: String,
    pub report: IngestionReport,
}

/// Filters for gazette search
#[derive(Debug, Default, Deserialize)]
pub struct GazetteListParams {
    pub q: Option<String>,
    pub kind: Option<String>,
    pub gazette_number: Option<String>,
    pub person_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl GazetteListParams {
    fn into_query(self) -> Result<GazetteQuery> {
        let kind = match self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(kind) => Some(kind.parse::<NoticeKind>().map_err(|message| {
                AppError::Validation {
                    message,
                    field: Some("kind".to_string()),
                }
            })?),
            None => None,
        };

        Ok(GazetteQuery {
            q: self.q.filter(|q| !q.trim().is_empty()),
            kind,
            gazette_number: self.gazette_number.filter(|n| !n.trim().is_empty()),
            person_id: self.person_id,
            from: self.from,
            to: self.to,
            page: self.page,
            per_page: self.per_page,
        })
    }
}

/// A stored gazette entry
#[derive(Serialize)]
pub struct EntryResponse {
    pub id: Uuid,
    pub kind: String,
    pub item_number: Option<i32>,
    pub gazette_number: Option<String>,
    pub gazette_date: Option<NaiveDate>,
    pub person_id: Option<Uuid>,
    pub title: Option<String>,
    pub name: String,
    pub aliases: Vec<String>,
    pub gender: String,
    pub new_name: Option<String>,
    pub new_title: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub profession: Option<String>,
    pub church: Option<String>,
    pub location: Option<String>,
    pub raw_text: String,
    pub source: Option<String>,
    pub created_at: String,
}

impl From<GazetteEntry> for EntryResponse {
    fn from(entry: GazetteEntry) -> Self {
        let aliases = entry.alias_list();
        Self {
            id: entry.id,
            kind: entry.kind,
            item_number: entry.item_number,
            gazette_number: entry.gazette_number,
            gazette_date: entry.gazette_date,
            person_id: entry.person_id,
            title: entry.title,
            name: entry.name,
            aliases,
            gender: entry.gender,
            new_name: entry.new_name,
            new_title: entry.new_title,
            effective_date: entry.effective_date,
            old_value: entry.old_value,
            new_value: entry.new_value,
            profession: entry.profession,
            church: entry.church,
            location: entry.location,
            raw_text: entry.raw_text,
            source: entry.source,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Parse a gazette without storing anything
#[instrument(skip(state, request), fields(bytes = request.text.len()))]
pub async fn extract_gazette(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<ExtractRequest>,
) -> Json<Extraction> {
    Json(state.processor.extract(&request.text))
}

/// Extract and store every notice in a gazette
#[instrument(skip(state, request), fields(bytes = request.text.len()))]
pub async fn ingest_gazette(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<IngestRequest>,
) -> Result<(StatusCode, Json<IngestResponse>)> {
    let source = request
        .source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.config.extraction.default_source.clone());

    let (job, report) = run_tracked(
        &state.repository,
        &state.processor,
        &source,
        Document::Text(request.text),
    )
    .await?;

    tracing::info!(
        job_id = %job.id,
        source = %source,
        entries_created = report.entries_created,
        "Gazette ingested"
    );

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            job_id: job.id,
            status: job.status.clone(),
            poll_url: format!("/v1/jobs/{}", job.id),
            report,
        }),
    ))
}

/// Search gazette entries
#[instrument(skip(state))]
pub async fn list_gazettes(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<GazetteListParams>,
) -> Result<Json<PageResponse<EntryResponse>>> {
    let start = Instant::now();
    let query = params.into_query()?;

    let page = state.repository.search_entries(&query).await?;
    metrics::record_search(start.elapsed().as_secs_f64(), "gazettes");

    Ok(Json(PageResponse::from_page(page, EntryResponse::from)))
}

/// Get one gazette entry
pub async fn get_gazette(
    State(state): State<AppState>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<EntryResponse>> {
    let entry = state
        .repository
        .find_entry(id)
        .await?
        .ok_or_else(|| AppError::GazetteEntryNotFound { id: id.to_string() })?;

    Ok(Json(entry.into()))
}
