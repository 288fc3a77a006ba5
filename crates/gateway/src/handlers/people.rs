//! Person registry handlers

use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

use super::{gazettes::EntryResponse, PageResponse};
use crate::extractors::{ValidQuery, ValidUuid};
use crate::AppState;
use gazette_common::{
    db::models::Person,
    errors::{AppError, Result},
    metrics,
};

#[derive(Debug, Default, Deserialize)]
pub struct PeopleParams {
    /// Matches any name the person has been known by
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize)]
pub struct PersonResponse {
    pub id: Uuid,
    pub full_name: String,
    pub title: Option<String>,
    pub gender: String,
    pub date_of_birth: Option<NaiveDate>,
    pub place_of_birth: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Person> for PersonResponse {
    fn from(person: Person) -> Self {
        Self {
            id: person.id,
            full_name: person.full_name,
            title: person.title,
            gender: person.gender,
            date_of_birth: person.date_of_birth,
            place_of_birth: person.place_of_birth,
            created_at: person.created_at.to_rfc3339(),
            updated_at: person.updated_at.to_rfc3339(),
        }
    }
}

/// A person with every name they have held and the notices about them
#[derive(Serialize)]
pub struct PersonDetailResponse {
    #[serde(flatten)]
    pub person: PersonResponse,
    pub names: Vec<String>,
    pub entries: Vec<EntryResponse>,
}

/// Search people
#[instrument(skip(state))]
pub async fn list_people(
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<PeopleParams>,
) -> Result<Json<PageResponse<PersonResponse>>> {
    let start = Instant::now();
    let q = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

    let page = state
        .repository
        .search_people(q, params.page, params.per_page)
        .await?;
    metrics::record_search(start.elapsed().as_secs_f64(), "people");

    Ok(Json(PageResponse::from_page(page, PersonResponse::from)))
}

/// Get a person with their name history and gazette entries
pub async fn get_person(
    State(state): State<AppState>,
    ValidUuid(id): ValidUuid,
) -> Result<Json<PersonDetailResponse>> {
    let person = state
        .repository
        .find_person(id)
        .await?
        .ok_or_else(|| AppError::PersonNotFound { id: id.to_string() })?;

    let (names, entries) = tokio::try_join!(
        state.repository.person_names(id),
        state.repository.entries_for_person(id),
    )?;

    Ok(Json(PersonDetailResponse {
        person: person.into(),
        names: names.into_iter().map(|n| n.name).collect(),
        entries: entries.into_iter().map(EntryResponse::from).collect(),
    }))
}
