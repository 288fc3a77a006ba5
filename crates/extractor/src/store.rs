//! Persistence seam for the extraction pipeline
//!
//! `RegistryStore` is implemented by the Postgres `Repository` and by
//! `MemoryStore`, which backs the CLI dry run and the pipeline tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use gazette_common::db::models::Gender;
use gazette_common::db::{NewGazetteEntry, NewPerson, Repository};
use gazette_common::errors::{AppError, Result};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Storage operations needed to record notices and link people
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Person registered under this name key, if any
    async fn find_person_by_key(&self, name_key: &str) -> Result<Option<Uuid>>;

    async fn create_person(&self, input: NewPerson) -> Result<Uuid>;

    /// Record a name for a person; repeated keys are ignored
    async fn add_person_name(&self, person_id: Uuid, name: &str, name_key: &str) -> Result<()>;

    /// Make `full_name` the person's current name
    async fn rename_person(&self, person_id: Uuid, full_name: &str, title: Option<String>) -> Result<()>;

    /// Set corrected birth details; `None` leaves a field untouched
    async fn update_birth_details(
        &self,
        person_id: Uuid,
        date_of_birth: Option<NaiveDate>,
        place_of_birth: Option<String>,
    ) -> Result<()>;

    async fn entry_exists(&self, dedup_key: &str) -> Result<bool>;

    /// Store an entry; `AppError::Duplicate` when its dedup key is taken
    async fn insert_entry(&self, input: NewGazetteEntry) -> Result<Uuid>;

    /// Attach a stored entry to a person
    async fn link_entry(&self, entry_id: Uuid, person_id: Uuid) -> Result<()>;
}

#[async_trait]
impl RegistryStore for Repository {
    async fn find_person_by_key(&self, name_key: &str) -> Result<Option<Uuid>> {
        self.find_person_id_by_name_key(name_key).await
    }

    async fn create_person(&self, input: NewPerson) -> Result<Uuid> {
        Ok(Repository::create_person(self, input).await?.id)
    }

    async fn add_person_name(&self, person_id: Uuid, name: &str, name_key: &str) -> Result<()> {
        Repository::add_person_name(self, person_id, name, name_key).await
    }

    async fn rename_person(&self, person_id: Uuid, full_name: &str, title: Option<String>) -> Result<()> {
        Repository::rename_person(self, person_id, full_name, title).await?;
        Ok(())
    }

    async fn update_birth_details(
        &self,
        person_id: Uuid,
        date_of_birth: Option<NaiveDate>,
        place_of_birth: Option<String>,
    ) -> Result<()> {
        Repository::update_birth_details(self, person_id, date_of_birth, place_of_birth).await?;
        Ok(())
    }

    async fn entry_exists(&self, dedup_key: &str) -> Result<bool> {
        Repository::entry_exists(self, dedup_key).await
    }

    async fn insert_entry(&self, input: NewGazetteEntry) -> Result<Uuid> {
        Ok(Repository::insert_entry(self, input).await?.id)
    }

    async fn link_entry(&self, entry_id: Uuid, person_id: Uuid) -> Result<()> {
        Repository::link_entry(self, entry_id, person_id).await
    }
}

/// A person held by `MemoryStore`
#[derive(Debug, Clone, Serialize)]
pub struct StoredPerson {
    pub id: Uuid,
    pub full_name: String,
    pub title: Option<String>,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub place_of_birth: Option<String>,
    /// Every name registered for the person, oldest first
    pub names: Vec<String>,
}

/// An entry held by `MemoryStore`
#[derive(Debug, Clone, Serialize)]
pub struct StoredEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub entry: NewGazetteEntry,
}

#[derive(Debug, Default)]
struct MemoryState {
    people: Vec<StoredPerson>,
    name_keys: HashMap<String, Uuid>,
    person_keys: HashMap<Uuid, Vec<String>>,
    entries: Vec<StoredEntry>,
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// People in creation order
    pub async fn people(&self) -> Vec<StoredPerson> {
        self.state.read().await.people.clone()
    }

    /// Entries in insertion order
    pub async fn entries(&self) -> Vec<StoredEntry> {
        self.state.read().await.entries.clone()
    }

    pub async fn person(&self, id: Uuid) -> Option<StoredPerson> {
        self.state.read().await.people.iter().find(|p| p.id == id).cloned()
    }
}

impl MemoryState {
    fn person_mut(&mut self, id: Uuid) -> Result<&mut StoredPerson> {
        self.people
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::PersonNotFound { id: id.to_string() })
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn find_person_by_key(&self, name_key: &str) -> Result<Option<Uuid>> {
        Ok(self.state.read().await.name_keys.get(name_key).copied())
    }

    async fn create_person(&self, input: NewPerson) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.state.write().await.people.push(StoredPerson {
            id,
            full_name: input.full_name,
            title: input.title,
            gender: input.gender,
            date_of_birth: input.date_of_birth,
            place_of_birth: input.place_of_birth,
            names: Vec::new(),
        });
        Ok(id)
    }

    async fn add_person_name(&self, person_id: Uuid, name: &str, name_key: &str) -> Result<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let person = state
            .people
            .iter_mut()
            .find(|p| p.id == person_id)
            .ok_or_else(|| AppError::PersonNotFound { id: person_id.to_string() })?;

        let keys = state.person_keys.entry(person_id).or_default();
        if keys.iter().any(|k| k == name_key) {
            return Ok(());
        }
        keys.push(name_key.to_string());
        person.names.push(name.to_string());
        state.name_keys.entry(name_key.to_string()).or_insert(person_id);
        Ok(())
    }

    async fn rename_person(&self, person_id: Uuid, full_name: &str, title: Option<String>) -> Result<()> {
        let mut state = self.state.write().await;
        let person = state.person_mut(person_id)?;
        person.full_name = full_name.to_string();
        if title.is_some() {
            person.title = title;
        }
        Ok(())
    }

    async fn update_birth_details(
        &self,
        person_id: Uuid,
        date_of_birth: Option<NaiveDate>,
        place_of_birth: Option<String>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let person = state.person_mut(person_id)?;
        if date_of_birth.is_some() {
            person.date_of_birth = date_of_birth;
        }
        if place_of_birth.is_some() {
            person.place_of_birth = place_of_birth;
        }
        Ok(())
    }

    async fn entry_exists(&self, dedup_key: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.entries.iter().any(|e| e.entry.dedup_key == dedup_key))
    }

    async fn insert_entry(&self, input: NewGazetteEntry) -> Result<Uuid> {
        let mut state = self.state.write().await;
        if state.entries.iter().any(|e| e.entry.dedup_key == input.dedup_key) {
            return Err(AppError::Duplicate {
                message: format!("gazette entry {}", input.dedup_key),
            });
        }

        let id = Uuid::new_v4();
        state.entries.push(StoredEntry { id, entry: input });
        Ok(id)
    }

    async fn link_entry(&self, entry_id: Uuid, person_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| AppError::GazetteEntryNotFound { id: entry_id.to_string() })?;
        entry.entry.person_id = Some(person_id);
        Ok(())
    }
}
