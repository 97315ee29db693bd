use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "postgres")]
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// CEFR levels a course can target
pub const LEVELS: &[&str] = &["A1", "A2", "B1", "B2", "C1", "C2"];

/// A language course as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres", derive(FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// ISO 639-1 code of the language taught
    pub language: String,
    pub level: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated creation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    pub language: String,
    pub level: String,
    #[serde(default)]
    pub published: bool,
}

impl Course {
    pub fn create(new: NewCourse) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            language: new.language,
            level: new.level,
            published: new.published,
            created_at: now,
            updated_at: now,
        }
    }

    /// Field value by its wire name, for filtering
    pub fn field_text(&self, field: &str) -> Option<String> {
        match field {
            "title" => Some(self.title.clone()),
            "description" => self.description.clone(),
            "language" => Some(self.language.clone()),
            "level" => Some(self.level.clone()),
            "published" => Some(self.published.to_string()),
            _ => None,
        }
    }
}
