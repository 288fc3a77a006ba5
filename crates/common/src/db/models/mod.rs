//! SeaORM entity models
//!
//! Database entities for the gazette registry

mod gazette_entry;
mod ingestion_job;
mod person;
mod person_name;

pub use person::{
    Entity as PersonEntity,
    Model as Person,
    ActiveModel as PersonActiveModel,
    Column as PersonColumn,
    Gender,
};

pub use person_name::{
    Entity as PersonNameEntity,
    Model as PersonName,
    ActiveModel as PersonNameActiveModel,
    Column as PersonNameColumn,
};

pub use gazette_entry::{
    Entity as GazetteEntryEntity,
    Model as GazetteEntry,
    ActiveModel as GazetteEntryActiveModel,
    Column as GazetteEntryColumn,
    NoticeKind,
};

pub use ingestion_job::{
    Entity as IngestionJobEntity,
    Model as IngestionJob,
    ActiveModel as IngestionJobActiveModel,
    Column as IngestionJobColumn,
    JobStatus,
};
