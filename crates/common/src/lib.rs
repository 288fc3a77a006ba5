//! Gazette Registry Common Library
//!
//! Shared code for the registry services including:
//! - Database models and repository patterns
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability
//! - The gazette search assistant

pub mod assistant;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{DbPool, Repository};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of records per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Upper bound on records per page
pub const MAX_PAGE_SIZE: u64 = 100;
