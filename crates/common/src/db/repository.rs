//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbBackend, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set, SqlErr, Statement,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Input for creating a person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerson {
    pub full_name: String,
    pub title: Option<String>,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub place_of_birth: Option<String>,
}

/// Input for storing one extracted notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGazetteEntry {
    pub kind: NoticeKind,
    pub item_number: Option<i32>,
    pub gazette_number: Option<String>,
    pub gazette_date: Option<NaiveDate>,
    pub person_id: Option<Uuid>,
    pub title: Option<String>,
    pub name: String,
    pub aliases: Vec<String>,
    pub gender: Gender,
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
    pub dedup_key: String,
}

impl NewGazetteEntry {
    /// Lower-cased text the search filter matches against
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        parts.extend(self.aliases.iter().map(String::as_str));
        for field in [
            &self.new_name,
            &self.old_value,
            &self.new_value,
            &self.profession,
            &self.church,
            &self.location,
            &self.gazette_number,
        ] {
            if let Some(value) = field {
                parts.push(value.as_str());
            }
        }
        search_terms(&parts.join(" ")).join(" ")
    }
}

/// Filters for gazette entry search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GazetteQuery {
    pub q: Option<String>,
    pub kind: Option<NoticeKind>,
    pub gazette_number: Option<String>,
    pub person_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Final counters written to a completed job
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct JobCounts {
    pub notices_found: i32,
    pub entries_created: i32,
    pub duplicates_skipped: i32,
    pub failures: i32,
}

/// Split free text into lower-case alphanumeric search terms
pub fn search_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Clamp user supplied paging to (1-based page, per_page)
pub(crate) fn page_bounds(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);
    (page, per_page)
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Person Operations
    // ========================================================================

    /// Create a person
    pub async fn create_person(&self, input: NewPerson) -> Result<Person> {
        let now = chrono::Utc::now();

        let person = PersonActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(input.full_name),
            title: Set(input.title),
            gender: Set(input.gender.into()),
            date_of_birth: Set(input.date_of_birth),
            place_of_birth: Set(input.place_of_birth),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        person.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find person by ID
    pub async fn find_person(&self, id: Uuid) -> Result<Option<Person>> {
        PersonEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Resolve a name key to the person it was registered against.
    /// Reads from the primary so a person created moments ago is visible.
    pub async fn find_person_id_by_name_key(&self, name_key: &str) -> Result<Option<Uuid>> {
        let name = PersonNameEntity::find()
            .filter(PersonNameColumn::NameKey.eq(name_key))
            .order_by_asc(PersonNameColumn::CreatedAt)
            .one(self.write_conn())
            .await?;

        Ok(name.map(|n| n.person_id))
    }

    /// Register a name for a person; repeated keys are ignored
    pub async fn add_person_name(&self, person_id: Uuid, name: &str, name_key: &str) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO person_names (id, person_id, name, name_key, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (person_id, name_key) DO NOTHING
            "#,
            vec![
                Uuid::new_v4().into(),
                person_id.into(),
                name.into(),
                name_key.into(),
            ],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// All names recorded for a person, oldest first
    pub async fn person_names(&self, person_id: Uuid) -> Result<Vec<PersonName>> {
        PersonNameEntity::find()
            .filter(PersonNameColumn::PersonId.eq(person_id))
            .order_by_asc(PersonNameColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Make `full_name` the person's current name
    pub async fn rename_person(
        &self,
        person_id: Uuid,
        full_name: &str,
        title: Option<String>,
    ) -> Result<Person> {
        let mut person: PersonActiveModel = self
            .find_person_for_update(person_id)
            .await?
            .into();

        person.full_name = Set(full_name.to_string());
        if title.is_some() {
            person.title = Set(title);
        }
        person.updated_at = Set(chrono::Utc::now().into());

        person.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Record corrected birth details; `None` leaves a field untouched
    pub async fn update_birth_details(
        &self,
        person_id: Uuid,
        date_of_birth: Option<NaiveDate>,
        place_of_birth: Option<String>,
    ) -> Result<Person> {
        let mut person: PersonActiveModel = self
            .find_person_for_update(person_id)
            .await?
            .into();

        if let Some(dob) = date_of_birth {
            person.date_of_birth = Set(Some(dob));
        }
        if let Some(pob) = place_of_birth {
            person.place_of_birth = Set(Some(pob));
        }
        person.updated_at = Set(chrono::Utc::now().into());

        person.update(self.write_conn()).await.map_err(Into::into)
    }

    async fn find_person_for_update(&self, person_id: Uuid) -> Result<Person> {
        PersonEntity::find_by_id(person_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::PersonNotFound { id: person_id.to_string() })
    }

    /// Search people by any name they have been known by
    pub async fn search_people(
        &self,
        q: Option<&str>,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<Page<Person>> {
        let (page, per_page) = page_bounds(page, per_page);

        let mut select = PersonEntity::find();

        let terms = q.map(search_terms).unwrap_or_default();
        if !terms.is_empty() {
            let mut names = Condition::all();
            for term in &terms {
                names = names.add(PersonNameColumn::NameKey.contains(term.as_str()));
            }

            let matching = PersonNameEntity::find()
                .select_only()
                .column(PersonNameColumn::PersonId)
                .filter(names)
                .into_query();

            select = select.filter(PersonColumn::Id.in_subquery(matching));
        }

        let paginator = select
            .order_by_asc(PersonColumn::FullName)
            .paginate(self.read_conn(), per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(Page { items, total, page, per_page })
    }

    // ========================================================================
    // Gazette Entry Operations
    // ========================================================================

    /// Whether an entry with this dedup key is already stored
    pub async fn entry_exists(&self, dedup_key: &str) -> Result<bool> {
        let count = GazetteEntryEntity::find()
            .filter(GazetteEntryColumn::DedupKey.eq(dedup_key))
            .count(self.write_conn())
            .await?;

        Ok(count > 0)
    }

    /// Store an extracted notice
    pub async fn insert_entry(&self, input: NewGazetteEntry) -> Result<GazetteEntry> {
        let search_text = input.search_text();
        let aliases = serde_json::to_value(&input.aliases)?;

        let entry = GazetteEntryActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(input.kind.as_str().to_string()),
            item_number: Set(input.item_number),
            gazette_number: Set(input.gazette_number),
            gazette_date: Set(input.gazette_date),
            person_id: Set(input.person_id),
            title: Set(input.title),
            name: Set(input.name),
            aliases: Set(aliases),
            gender: Set(input.gender.into()),
            new_name: Set(input.new_name),
            new_title: Set(input.new_title),
            effective_date: Set(input.effective_date),
            old_value: Set(input.old_value),
            new_value: Set(input.new_value),
            profession: Set(input.profession),
            church: Set(input.church),
            location: Set(input.location),
            raw_text: Set(input.raw_text),
            source: Set(input.source),
            search_text: Set(search_text),
            dedup_key: Set(input.dedup_key),
            created_at: Set(chrono::Utc::now().into()),
        };

        entry.insert(self.write_conn()).await.map_err(insert_error)
    }

    /// Attach a stored entry to the person it was linked to
    pub async fn link_entry(&self, entry_id: Uuid, person_id: Uuid) -> Result<()> {
        let result = GazetteEntryEntity::update_many()
            .col_expr(GazetteEntryColumn::PersonId, Expr::value(person_id))
            .filter(GazetteEntryColumn::Id.eq(entry_id))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::GazetteEntryNotFound { id: entry_id.to_string() });
        }
        Ok(())
    }

    /// Find entry by ID
    pub async fn find_entry(&self, id: Uuid) -> Result<Option<GazetteEntry>> {
        GazetteEntryEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// All entries linked to a person, newest gazette first
    pub async fn entries_for_person(&self, person_id: Uuid) -> Result<Vec<GazetteEntry>> {
        GazetteEntryEntity::find()
            .filter(GazetteEntryColumn::PersonId.eq(person_id))
            .order_by_desc(GazetteEntryColumn::GazetteDate)
            .order_by_asc(GazetteEntryColumn::ItemNumber)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Filtered, paginated gazette search
    pub async fn search_entries(&self, query: &GazetteQuery) -> Result<Page<GazetteEntry>> {
        let (page, per_page) = page_bounds(query.page, query.per_page);

        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(AppError::Validation {
                    message: format!("'from' ({}) is after 'to' ({})", from, to),
                    field: Some("from".to_string()),
                });
            }
        }

        let mut condition = Condition::all();

        if let Some(q) = query.q.as_deref() {
            for term in search_terms(q) {
                condition = condition.add(GazetteEntryColumn::SearchText.contains(term.as_str()));
            }
        }
        if let Some(kind) = query.kind {
            condition = condition.add(GazetteEntryColumn::Kind.eq(kind.as_str()));
        }
        if let Some(number) = query.gazette_number.as_deref() {
            condition = condition.add(GazetteEntryColumn::GazetteNumber.eq(number.trim()));
        }
        if let Some(person_id) = query.person_id {
            condition = condition.add(GazetteEntryColumn::PersonId.eq(person_id));
        }
        if let Some(from) = query.from {
            condition = condition.add(GazetteEntryColumn::GazetteDate.gte(from));
        }
        if let Some(to) = query.to {
            condition = condition.add(GazetteEntryColumn::GazetteDate.lte(to));
        }

        let paginator = GazetteEntryEntity::find()
            .filter(condition)
            .order_by_desc(GazetteEntryColumn::GazetteDate)
            .order_by_asc(GazetteEntryColumn::ItemNumber)
            .order_by_asc(GazetteEntryColumn::CreatedAt)
            .paginate(self.read_conn(), per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(Page { items, total, page, per_page })
    }

    // ========================================================================
    // Job Operations
    // ========================================================================

    /// Create an ingestion job
    pub async fn create_job(&self, source: &str) -> Result<IngestionJob> {
        let now = chrono::Utc::now();

        let job = IngestionJobActiveModel {
            id: Set(Uuid::new_v4()),
            source: Set(source.to_string()),
            status: Set(JobStatus::Pending.into()),
            notices_found: Set(0),
            entries_created: Set(0),
            duplicates_skipped: Set(0),
            failures: Set(0),
            error_message: Set(None),
            created_at: Set(now.into()),
            started_at: Set(None),
            completed_at: Set(None),
        };

        job.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find job by ID
    pub async fn find_job(&self, id: Uuid) -> Result<Option<IngestionJob>> {
        IngestionJobEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Move a job to a new status, stamping start/completion times
    pub async fn update_job_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        counts: Option<JobCounts>,
        error_message: Option<String>,
    ) -> Result<IngestionJob> {
        let now = chrono::Utc::now();

        let mut job: IngestionJobActiveModel = IngestionJobEntity::find_by_id(job_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::JobNotFound { id: job_id.to_string() })?
            .into();

        job.status = Set(String::from(status.clone()));

        if let Some(counts) = counts {
            job.notices_found = Set(counts.notices_found);
            job.entries_created = Set(counts.entries_created);
            job.duplicates_skipped = Set(counts.duplicates_skipped);
            job.failures = Set(counts.failures);
        }

        if let Some(err) = error_message {
            job.error_message = Set(Some(err));
        }

        match status {
            JobStatus::Extracting => {
                job.started_at = Set(Some(now.into()));
            }
            JobStatus::Completed | JobStatus::Failed => {
                job.completed_at = Set(Some(now.into()));
            }
            JobStatus::Pending => {}
        }

        job.update(self.write_conn()).await.map_err(Into::into)
    }
}

/// A unique `dedup_key` violation means another run stored the entry first
fn insert_error(err: DbErr) -> AppError {
    duplicate_entry(err.sql_err()).unwrap_or(AppError::Database(err))
}

fn duplicate_entry(sql_err: Option<SqlErr>) -> Option<AppError> {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(message)) => Some(AppError::Duplicate { message }),
        _ => None,
    }
}
