use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CourseStore, ListQuery, Page};
use crate::errors::DataError;
use crate::models::{Course, NewCourse};
use crate::pagination::SortOrder;

/// Course store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryCourseStore {
    courses: RwLock<HashMap<Uuid, Course>>,
}

impl MemoryCourseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_courses(courses: Vec<NewCourse>) -> Result<Self, DataError> {
        let store = Self::new();
        for course in courses {
            store.create(course).await?;
        }
        Ok(store)
    }
}

fn compare(a: &Course, b: &Course, field: &str) -> Ordering {
    match field {
        "title" => a.title.cmp(&b.title),
        "language" => a.language.cmp(&b.language),
        "level" => a.level.cmp(&b.level),
        "updatedAt" => a.updated_at.cmp(&b.updated_at),
        _ => a.created_at.cmp(&b.created_at),
    }
}

fn matches(course: &Course, query: &ListQuery) -> bool {
    let filters_match = query.filters.iter().all(|(field, expected)| {
        course
            .field_text(field)
            .map(|actual| actual.eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    });
    if !filters_match {
        return false;
    }

    match &query.search {
        Some((term, fields)) => {
            let needle = term.trim().to_lowercase();
            let default_fields = ["title".to_string()];
            let fields = if fields.is_empty() { &default_fields[..] } else { &fields[..] };
            fields.iter().any(|field| {
                course
                    .field_text(field)
                    .map(|text| text.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        }
        None => true,
    }
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    async fn list(&self, query: &ListQuery) -> Result<Page<Course>, DataError> {
        let courses = self.courses.read().await;

        let mut selected: Vec<&Course> = courses.values().filter(|c| matches(c, query)).collect();
        let (field, order) = &query.order_by;
        selected.sort_by(|a, b| {
            // Id breaks ties so pages are stable
            let ordering = compare(a, b, field).then_with(|| a.id.cmp(&b.id));
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = selected.len() as u64;
        let items = selected
            .into_iter()
            .skip(query.skip as usize)
            .take(query.take as usize)
            .cloned()
            .collect();

        Ok(Page { items, total })
    }

    async fn get(&self, id: Uuid) -> Result<Course, DataError> {
        self.courses
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DataError::RecordNotFound)
    }

    async fn create(&self, new: NewCourse) -> Result<Course, DataError> {
        let mut courses = self.courses.write().await;
        if courses
            .values()
            .any(|c| c.title.eq_ignore_ascii_case(&new.title))
        {
            return Err(DataError::unique("title"));
        }

        let course = Course::create(new);
        courses.insert(course.id, course.clone());
        Ok(course)
    }
}
