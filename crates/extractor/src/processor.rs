//! Gazette processor
//!
//! Core pipeline: normalise text, read the issue header, split sections and
//! items, parse notices, then deduplicate, link and store them. A notice
//! that fails at any step is recorded and the batch carries on.

use crate::dedupe::{dedup_key, Deduplicator};
use crate::errors::{ExtractionError, NoticeError};
use crate::issue::{parse_issue, GazetteIssue};
use crate::items::{split_items, RawItem};
use crate::linker::link_person;
use crate::normalize::normalize_text;
use crate::notices::{classify, parse_notice, ExtractedNotice};
use crate::pdf::extract_text_from_pdf;
use crate::sections::split_sections;
use crate::store::RegistryStore;
use gazette_common::config::ExtractionConfig;
use gazette_common::db::models::{IngestionJob, JobStatus, NoticeKind};
use gazette_common::db::{JobCounts, NewGazetteEntry, Repository};
use gazette_common::errors::AppError;
use gazette_common::metrics::record_ingestion;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// An item that produced no record, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub item_number: Option<u32>,
    pub kind: Option<NoticeKind>,
    pub reason: String,
}

/// Result of parsing one document, before anything is stored
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub issue: GazetteIssue,
    pub notices: Vec<ExtractedNotice>,
    pub failures: Vec<FailureRecord>,
}

/// Outcome of ingesting one document
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub issue: GazetteIssue,
    pub notices_found: usize,
    pub entries_created: usize,
    pub duplicates_skipped: usize,
    pub failures: Vec<FailureRecord>,
}

impl IngestionReport {
    /// Counters persisted on the ingestion job
    pub fn job_counts(&self) -> JobCounts {
        let count = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        JobCounts {
            notices_found: count(self.notices_found),
            entries_created: count(self.entries_created),
            duplicates_skipped: count(self.duplicates_skipped),
            failures: count(self.failures.len()),
        }
    }
}

/// Input to a tracked ingestion run
#[derive(Debug, Clone)]
pub enum Document {
    Text(String),
    File(PathBuf),
}

/// Gazette processor
pub struct GazetteProcessor {
    config: ExtractionConfig,
    store: Arc<dyn RegistryStore>,
}

impl GazetteProcessor {
    pub fn new(config: ExtractionConfig, store: Arc<dyn RegistryStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Parse a document into notices without touching the store
    pub fn extract(&self, text: &str) -> Extraction {
        let text = normalize_text(text);
        let issue = parse_issue(&text);

        let mut notices = Vec::new();
        let mut failures = Vec::new();

        for section in split_sections(&text) {
            for item in split_items(&section.body) {
                match self.parse_item(section.kind, &item) {
                    Ok(Some(mut notice)) => {
                        notice.gazette_number = issue.number.clone();
                        notice.gazette_date = issue.date;
                        notices.push(notice);
                    }
                    Ok(None) => {}
                    Err(failure) => {
                        debug!(
                            item = ?failure.item_number,
                            reason = %failure.reason,
                            "Item skipped"
                        );
                        failures.push(failure);
                    }
                }
            }
        }

        Extraction { issue, notices, failures }
    }

    /// `Ok(None)` for unnumbered unheaded text such as the masthead
    fn parse_item(
        &self,
        heading: Option<NoticeKind>,
        item: &RawItem,
    ) -> Result<Option<ExtractedNotice>, FailureRecord> {
        let failure = |kind: Option<NoticeKind>, reason: String| FailureRecord {
            item_number: item.number,
            kind,
            reason,
        };

        let inferred = match heading {
            Some(kind) => Some(kind),
            None if self.config.infer_unheaded_items => classify(&item.text),
            None => None,
        };
        let kind = match inferred {
            Some(kind) => kind,
            // Unnumbered text outside a section is masthead or preamble
            None if item.number.is_none() => return Ok(None),
            None => return Err(failure(None, "no notice kind".to_string())),
        };

        match parse_notice(kind, item) {
            Ok(notice) => Ok(Some(notice)),
            // Items are sometimes printed under the wrong heading
            Err(NoticeError::UnrecognisedLayout(reason)) => {
                match classify(&item.text).filter(|other| *other != kind) {
                    Some(other) => parse_notice(other, item)
                        .map(Some)
                        .map_err(|e| failure(Some(other), e.to_string())),
                    None => Err(failure(Some(kind), format!("unrecognised layout: {}", reason))),
                }
            }
            Err(e) => Err(failure(Some(kind), e.to_string())),
        }
    }

    /// Extract, deduplicate, link and store every notice in `text`
    #[instrument(skip(self, text), fields(source = %source, bytes = text.len()))]
    pub async fn process_text(&self, text: &str, source: &str) -> IngestionReport {
        let started = Instant::now();
        let Extraction { issue, notices, failures } = self.extract(text);

        let mut report = IngestionReport {
            issue,
            notices_found: notices.len(),
            failures,
            ..Default::default()
        };
        let mut seen = Deduplicator::new();

        for notice in &notices {
            let key = dedup_key(notice);
            if !seen.insert(&key) {
                report.duplicates_skipped += 1;
                continue;
            }

            match self.store_notice(notice, key, source).await {
                Ok(Some(entry_id)) => {
                    debug!(entry_id = %entry_id, item = ?notice.item_number, "Entry stored");
                    report.entries_created += 1;
                }
                Ok(None) => report.duplicates_skipped += 1,
                Err(e) => {
                    warn!(
                        item = ?notice.item_number,
                        kind = %notice.kind,
                        error = %e,
                        "Failed to store notice"
                    );
                    report.failures.push(FailureRecord {
                        item_number: notice.item_number,
                        kind: Some(notice.kind),
                        reason: e.to_string(),
                    });
                }
            }
        }

        record_ingestion(
            started.elapsed().as_secs_f64(),
            report.notices_found,
            report.entries_created,
            report.duplicates_skipped,
            report.failures.len(),
        );

        info!(
            notices_found = report.notices_found,
            entries_created = report.entries_created,
            duplicates_skipped = report.duplicates_skipped,
            failures = report.failures.len(),
            "Document processed"
        );

        report
    }

    /// `Ok(None)` when the entry was stored by an earlier or concurrent run.
    ///
    /// The entry is inserted before linking so a run that loses the insert
    /// race leaves the person untouched.
    async fn store_notice(
        &self,
        notice: &ExtractedNotice,
        dedup_key: String,
        source: &str,
    ) -> Result<Option<Uuid>, AppError> {
        if self.store.entry_exists(&dedup_key).await? {
            return Ok(None);
        }

        let entry_id = match self
            .store
            .insert_entry(new_entry(notice, source, dedup_key))
            .await
        {
            Ok(id) => id,
            Err(AppError::Duplicate { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if self.config.link_people {
            let person_id = link_person(self.store.as_ref(), notice).await?;
            self.store.link_entry(entry_id, person_id).await?;
        }

        Ok(Some(entry_id))
    }

    /// Process a single gazette PDF
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn process_pdf(
        &self,
        path: &Path,
        source: &str,
    ) -> Result<IngestionReport, ExtractionError> {
        if !is_pdf(path) {
            return Err(ExtractionError::UnsupportedFile(path.display().to_string()));
        }
        let text = load_document(path)?;
        Ok(self.process_text(&text, source).await)
    }

    /// Process every PDF in a directory; files that fail are logged and skipped
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn process_directory(
        &self,
        dir: &Path,
    ) -> Result<Vec<(PathBuf, IngestionReport)>, ExtractionError> {
        info!("Processing directory of gazette PDFs");

        let mut results = Vec::new();

        for path in pdf_files(dir)? {
            let source = source_name(&path);
            match self.process_pdf(&path, &source).await {
                Ok(report) => results.push((path, report)),
                Err(e) => {
                    error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to process PDF"
                    );
                }
            }
        }

        info!(total = results.len(), "Directory processing complete");

        Ok(results)
    }
}

/// Run one document through the processor inside an ingestion job.
///
/// The job moves pending → extracting → completed, or to failed when the
/// document cannot be read.
#[instrument(skip(repository, processor, document), fields(source = %source))]
pub async fn run_tracked(
    repository: &Repository,
    processor: &GazetteProcessor,
    source: &str,
    document: Document,
) -> Result<(IngestionJob, IngestionReport), AppError> {
    let job = repository.create_job(source).await?;
    let job_id = job.id;
    repository
        .update_job_status(job_id, JobStatus::Extracting, None, None)
        .await?;

    let text = match document {
        Document::Text(text) => Ok(text),
        Document::File(path) => load_document(&path),
    };

    let text = match text {
        Ok(text) => text,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Document could not be read");
            repository
                .update_job_status(job_id, JobStatus::Failed, None, Some(e.to_string()))
                .await?;
            return Err(e.into());
        }
    };

    let report = processor.process_text(&text, source).await;
    let job = repository
        .update_job_status(job_id, JobStatus::Completed, Some(report.job_counts()), None)
        .await?;

    info!(job_id = %job_id, entries_created = report.entries_created, "Ingestion job completed");

    Ok((job, report))
}

/// Read a gazette from a `.pdf` or `.txt` file
pub fn load_document(path: &Path) -> Result<String, ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::FileNotFound(path.display().to_string()));
    }

    if is_pdf(path) {
        return extract_text_from_pdf(path);
    }

    match extension(path).as_deref() {
        Some("txt") | Some("text") => Ok(std::fs::read_to_string(path)?),
        _ => Err(ExtractionError::UnsupportedFile(path.display().to_string())),
    }
}

/// PDF files directly inside `dir`, sorted by path
pub fn pdf_files(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_pdf(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Source label recorded for a file: its name without directories
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_pdf(path: &Path) -> bool {
    extension(path).as_deref() == Some("pdf")
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn new_entry(
    notice: &ExtractedNotice,
    source: &str,
    dedup_key: String,
) -> NewGazetteEntry {
    NewGazetteEntry {
        kind: notice.kind,
        item_number: notice.item_number.and_then(|n| i32::try_from(n).ok()),
        gazette_number: notice.gazette_number.clone(),
        gazette_date: notice.gazette_date,
        person_id: None,
        title: notice.title.map(|t| t.as_str().to_string()),
        name: notice.name.clone(),
        aliases: notice.aliases.clone(),
        gender: notice.gender,
        new_name: notice.new_name.clone(),
        new_title: notice.new_title.map(|t| t.as_str().to_string()),
        effective_date: notice.effective_date,
        old_value: notice.old_value.clone(),
        new_value: notice.new_value.clone(),
        profession: notice.profession.clone(),
        church: notice.church.clone(),
        location: notice.location.clone(),
        raw_text: notice.raw_text.clone(),
        source: Some(source.trim().to_string()).filter(|s| !s.is_empty()),
        dedup_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use gazette_common::db::models::Gender;
    use gazette_common::db::NewPerson;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ISSUE: &str = "GHANA GAZETTE\n\
        Published by Authority\n\
        No. 45 ACCRA, Friday, 12th March, 2021\n\
        \n\
        CHANGE OF NAME\n\
        1024. Mr. Kwame Mensah a.k.a. Kwame Asante, a Teacher of Accra wishes to be\n\
        known and called Kwame Asante-Mensah with effect from 1st January,\n\
        2020. All documents bearing his former name are still valid.\n\
        1025. Miss Ama Serwaa wishes to be known as Mrs. Ama Serwaa Owusu.\n\
        1026. Mr. Kofi Ato of Kumasi.\n\
        \n\
        CORRECTION OF DATE OF BIRTH\n\
        1027. Mrs. Ama Serwaa Owusu wishes to confirm that her date of birth is\n\
        5th April, 1990 and not 5th April, 1991.\n\
        \n\
        APPOINTMENT OF MARRIAGE OFFICERS\n\
        1028. Rev. Samuel Kwaku Osei, Methodist Church Ghana, Wesley Chapel, Kumasi.\n";

    fn setup(config: ExtractionConfig) -> (GazetteProcessor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (GazetteProcessor::new(config, store.clone()), store)
    }

    #[test]
    fn test_extract_issue() {
        let (processor, _) = setup(ExtractionConfig::default());
        let extraction = processor.extract(ISSUE);

        assert_eq!(extraction.issue.number.as_deref(), Some("45"));
        assert_eq!(extraction.issue.date, NaiveDate::from_ymd_opt(2021, 3, 12));

        let numbers: Vec<_> = extraction.notices.iter().map(|n| n.item_number).collect();
        assert_eq!(numbers, vec![Some(1024), Some(1025), Some(1027), Some(1028)]);

        let first = &extraction.notices[0];
        assert_eq!(first.kind, NoticeKind::ChangeOfName);
        assert_eq!(first.name, "Kwame Mensah");
        assert_eq!(first.aliases, vec!["Kwame Asante"]);
        assert_eq!(first.new_name.as_deref(), Some("Kwame Asante-Mensah"));
        assert_eq!(first.effective_date, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(first.gender, Gender::Male);
        assert_eq!(first.gazette_number.as_deref(), Some("45"));
        assert_eq!(first.gazette_date, NaiveDate::from_ymd_opt(2021, 3, 12));

        assert_eq!(extraction.failures.len(), 1);
        assert_eq!(extraction.failures[0].item_number, Some(1026));
        assert_eq!(extraction.failures[0].kind, Some(NoticeKind::ChangeOfName));
    }

    #[test]
    fn test_misfiled_item_is_reclassified() {
        let (processor, _) = setup(ExtractionConfig::default());
        let extraction = processor.extract(
            "CHANGE OF NAME\n\
             1. Mr. Yaw Boakye wishes to confirm that his place of birth is Ho and not Tema.\n",
        );

        assert!(extraction.failures.is_empty());
        assert_eq!(extraction.notices[0].kind, NoticeKind::ChangeOfPlaceOfBirth);
        assert_eq!(extraction.notices[0].new_value.as_deref(), Some("Ho"));
    }

    #[test]
    fn test_unheaded_items() {
        let text = "1. Mr. Kofi Ato wishes to be known as Kofi Mensah.\n\
                    2. Mr. Yaw Boakye wishes to confirm that his place of birth is Ho and not Tema.\n";

        let (processor, _) = setup(ExtractionConfig::default());
        let kinds: Vec<_> = processor.extract(text).notices.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![NoticeKind::ChangeOfName, NoticeKind::ChangeOfPlaceOfBirth]
        );

        let config = ExtractionConfig { infer_unheaded_items: false, ..Default::default() };
        let (processor, _) = setup(config);
        let extraction = processor.extract(text);
        assert!(extraction.notices.is_empty());
        let numbers: Vec<_> = extraction.failures.iter().map(|f| f.item_number).collect();
        assert_eq!(numbers, vec![Some(1), Some(2)]);
        assert!(extraction.failures.iter().all(|f| f.kind.is_none()));
    }

    #[test]
    fn test_unclassifiable_item_is_reported() {
        let (processor, _) = setup(ExtractionConfig::default());
        let extraction = processor.extract(
            "GHANA GAZETTE\n\
             1. Mr. Kofi Ato of Accra, a Trader.\n\
             2. Mr. Yaw Boakye wishes to be known as Yaw Mensah.\n",
        );

        assert_eq!(extraction.notices.len(), 1);
        assert_eq!(extraction.notices[0].item_number, Some(2));
        assert_eq!(
            extraction.failures,
            vec![FailureRecord {
                item_number: Some(1),
                kind: None,
                reason: "no notice kind".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_process_text_stores_and_links() {
        let (processor, store) = setup(ExtractionConfig::default());
        let report = processor.process_text(ISSUE, "gazette-45.pdf").await;

        assert_eq!(report.notices_found, 4);
        assert_eq!(report.entries_created, 4);
        assert_eq!(report.duplicates_skipped, 0);
        assert_eq!(report.failures.len(), 1);

        // Ama's date of birth notice is filed under the name she took in item 1025
        let people = store.people().await;
        assert_eq!(people.len(), 3);
        let ama = people.iter().find(|p| p.full_name == "Ama Serwaa Owusu").unwrap();
        assert_eq!(ama.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 5));
        assert_eq!(ama.title.as_deref(), Some("Mrs."));

        let entries = store.entries().await;
        assert!(entries.iter().all(|e| e.entry.person_id.is_some()));
        assert_eq!(entries[0].entry.source.as_deref(), Some("gazette-45.pdf"));
        assert_eq!(entries[0].entry.item_number, Some(1024));
        assert_eq!(entries[0].entry.title.as_deref(), Some("Mr."));
    }

    #[tokio::test]
    async fn test_reingest_is_all_duplicates() {
        let (processor, store) = setup(ExtractionConfig::default());
        processor.process_text(ISSUE, "first").await;
        let report = processor.process_text(ISSUE, "second").await;

        assert_eq!(report.notices_found, 4);
        assert_eq!(report.entries_created, 0);
        assert_eq!(report.duplicates_skipped, 4);
        assert_eq!(store.entries().await.len(), 4);
        assert_eq!(store.people().await.len(), 3);
    }

    /// Misses the `entry_exists` check, as a concurrent run would
    struct RacingStore {
        inner: MemoryStore,
        renames: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RegistryStore for RacingStore {
        async fn find_person_by_key(&self, name_key: &str) -> gazette_common::Result<Option<Uuid>> {
            self.inner.find_person_by_key(name_key).await
        }

        async fn create_person(&self, input: NewPerson) -> gazette_common::Result<Uuid> {
            self.inner.create_person(input).await
        }

        async fn add_person_name(
            &self,
            person_id: Uuid,
            name: &str,
            name_key: &str,
        ) -> gazette_common::Result<()> {
            self.inner.add_person_name(person_id, name, name_key).await
        }

        async fn rename_person(
            &self,
            person_id: Uuid,
            full_name: &str,
            title: Option<String>,
        ) -> gazette_common::Result<()> {
            self.renames.fetch_add(1, Ordering::SeqCst);
            self.inner.rename_person(person_id, full_name, title).await
        }

        async fn update_birth_details(
            &self,
            person_id: Uuid,
            date_of_birth: Option<NaiveDate>,
            place_of_birth: Option<String>,
        ) -> gazette_common::Result<()> {
            self.inner
                .update_birth_details(person_id, date_of_birth, place_of_birth)
                .await
        }

        async fn entry_exists(&self, _dedup_key: &str) -> gazette_common::Result<bool> {
            Ok(false)
        }

        async fn insert_entry(&self, input: NewGazetteEntry) -> gazette_common::Result<Uuid> {
            self.inner.insert_entry(input).await
        }

        async fn link_entry(&self, entry_id: Uuid, person_id: Uuid) -> gazette_common::Result<()> {
            self.inner.link_entry(entry_id, person_id).await
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_counts_as_duplicate() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            renames: AtomicUsize::new(0),
        });
        let processor = GazetteProcessor::new(ExtractionConfig::default(), store.clone());

        processor.process_text(ISSUE, "first").await;
        let renames = store.renames.load(Ordering::SeqCst);
        assert!(renames > 0);

        let report = processor.process_text(ISSUE, "second").await;
        assert_eq!(report.entries_created, 0);
        assert_eq!(report.duplicates_skipped, 4);
        assert_eq!(report.failures.len(), 1);

        // The losing run never reached the linker
        assert_eq!(store.renames.load(Ordering::SeqCst), renames);
        assert_eq!(store.inner.people().await.len(), 3);
    }

    #[tokio::test]
    async fn test_republished_notice_in_same_batch() {
        let (processor, store) = setup(ExtractionConfig::default());
        let text = "CHANGE OF NAME\n\
                    1. Mr. Kofi Ato wishes to be known as Kofi Mensah.\n\
                    2. Mr. Kofi Ato wishes to be known as Kofi Mensah.\n";

        let report = processor.process_text(text, "").await;

        assert_eq!(report.entries_created, 1);
        assert_eq!(report.duplicates_skipped, 1);
        assert_eq!(store.entries().await[0].entry.source, None);
    }

    #[tokio::test]
    async fn test_linking_disabled() {
        let config = ExtractionConfig { link_people: false, ..Default::default() };
        let (processor, store) = setup(config);
        let report = processor.process_text(ISSUE, "upload").await;

        assert_eq!(report.entries_created, 4);
        assert!(store.people().await.is_empty());
        assert!(store.entries().await.iter().all(|e| e.entry.person_id.is_none()));
    }

    #[test]
    fn test_job_counts() {
        let report = IngestionReport {
            notices_found: 5,
            entries_created: 3,
            duplicates_skipped: 1,
            failures: vec![FailureRecord {
                item_number: Some(9),
                kind: None,
                reason: "no subject name found".to_string(),
            }],
            ..Default::default()
        };
        let counts = report.job_counts();
        assert_eq!(
            (counts.notices_found, counts.entries_created, counts.duplicates_skipped, counts.failures),
            (5, 3, 1, 1)
        );
    }

    #[test]
    fn test_load_document() {
        let dir = tempfile::tempdir().unwrap();

        let txt = dir.path().join("issue.txt");
        std::fs::write(&txt, "CHANGE OF NAME").unwrap();
        assert_eq!(load_document(&txt).unwrap(), "CHANGE OF NAME");

        let doc = dir.path().join("issue.docx");
        std::fs::write(&doc, "x").unwrap();
        assert!(matches!(load_document(&doc), Err(ExtractionError::UnsupportedFile(_))));

        let missing = dir.path().join("missing.pdf");
        assert!(matches!(load_document(&missing), Err(ExtractionError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_process_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(pdf_files(dir.path()).unwrap().len(), 1);

        let (processor, _) = setup(ExtractionConfig::default());
        let results = processor.process_directory(dir.path()).await.unwrap();
        assert!(results.is_empty());

        let err = processor
            .process_pdf(&dir.path().join("notes.txt"), "notes")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFile(_)));
    }

    #[test]
    fn test_source_name() {
        assert_eq!(source_name(Path::new("/data/gazettes/2021-45.pdf")), "2021-45.pdf");
    }
}
