//! Gazette text extraction
//!
//! Turns the text of a Ghana Government Gazette issue into structured
//! notices and records them:
//! - PDF text extraction and normalisation
//! - Issue header, section and item splitting
//! - Per-kind field parsing (names, aliases, titles, dates)
//! - Deduplication and linking to person records

pub mod dates;
pub mod dedupe;
pub mod errors;
pub mod issue;
pub mod items;
pub mod linker;
pub mod names;
pub mod normalize;
pub mod notices;
pub mod pdf;
pub mod processor;
pub mod sections;
pub mod store;

pub use errors::{ExtractionError, NoticeError};
pub use notices::ExtractedNotice;
pub use processor::{
    run_tracked, Document, Extraction, FailureRecord, GazetteProcessor, IngestionReport,
};
pub use store::{MemoryStore, RegistryStore};
