//! Data access for courses
//!
//! Stores report failures as [`DataError`] so the error normalizer can
//! classify them; they know nothing about HTTP.

pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::DataError;
use crate::models::{Course, NewCourse};
use crate::pagination::{PaginationDescriptor, SortOrder};

pub use memory::MemoryCourseStore;

/// One window of a listing: `{skip, take, order_by, where}`
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub skip: u64,
    pub take: u64,
    pub order_by: (String, SortOrder),
    /// Exact-match conditions by field name
    pub filters: BTreeMap<String, String>,
    /// Case-insensitive substring search and the fields it covers
    pub search: Option<(String, Vec<String>)>,
}

impl From<&PaginationDescriptor> for ListQuery {
    fn from(descriptor: &PaginationDescriptor) -> Self {
        let (field, order) = descriptor.order_by();
        Self {
            skip: descriptor.skip(),
            take: descriptor.take(),
            order_by: (field.to_string(), order),
            filters: descriptor.filters.clone(),
            search: descriptor.search.clone().map(|term| {
                (
                    term,
                    descriptor.search_fields.clone().unwrap_or_default(),
                )
            }),
        }
    }
}

/// Items in the requested window plus the total matching the conditions
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Page<Course>, DataError>;

    /// Fails with [`DataError::RecordNotFound`] when `id` is unknown
    async fn get(&self, id: Uuid) -> Result<Course, DataError>;

    /// Fails with [`DataError::UniqueConstraint`] on a duplicate title
    async fn create(&self, new: NewCourse) -> Result<Course, DataError>;
}
