//! API handlers module

pub mod assistant;
pub mod gazettes;
pub mod health;
pub mod jobs;
pub mod people;

use gazette_common::db::Page;
use serde::Serialize;
use validator::ValidationError;

/// One page of a list response
#[derive(Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    pub fn from_page<U>(page: Page<U>, convert: impl FnMut(U) -> T) -> Self {
        Self {
            items: page.items.into_iter().map(convert).collect(),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total.div_ceil(page.per_page.max(1)),
        }
    }
}

/// Rejects strings that are empty once whitespace is trimmed
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
