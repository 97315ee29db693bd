use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::config::PaginationConfig;
use crate::errors::OperationalError;
use crate::validation::{FieldIssue, IssueCode};

/// Query keys consumed by the resolver itself; never treated as filters
const RESERVED_KEYS: &[&str] = &["page", "limit", "offset", "sortBy", "sortOrder", "search"];

/// Largest offset a page may address; matches the ceiling on a raw `offset`
pub const MAX_OFFSET: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Per-route pagination rules
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationPolicy {
    pub default_limit: u64,
    pub max_limit: u64,
    /// Empty means any sort field is accepted
    pub allowed_sort_fields: Vec<String>,
    pub allowed_filter_keys: Vec<String>,
    pub default_sort_field: String,
    pub search_fields: Vec<String>,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}

impl PaginationPolicy {
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
            allowed_sort_fields: Vec::new(),
            allowed_filter_keys: Vec::new(),
            default_sort_field: config.default_sort_field.clone(),
            search_fields: Vec::new(),
        }
    }

    pub fn sort_fields(mut self, fields: &[&str]) -> Self {
        self.allowed_sort_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filter_keys(mut self, keys: &[&str]) -> Self {
        self.allowed_filter_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn default_sort(mut self, field: &str) -> Self {
        self.default_sort_field = field.to_string();
        self
    }
}

/// Resolved result window, sort and filters for one request
///
/// `offset == (page - 1) * limit` holds for every descriptor produced by
/// [`resolve`], whichever addressing mode the client used.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDescriptor {
    pub page: u64,
    pub limit: u64,
    pub offset: u64,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub filters: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_fields: Option<Vec<String>>,
}

impl PaginationDescriptor {
    /// Rows to skip in a skip/take query
    pub fn skip(&self) -> u64 {
        self.offset
    }

    /// Rows to take in a skip/take query
    pub fn take(&self) -> u64 {
        self.limit
    }

    pub fn order_by(&self) -> (&str, SortOrder) {
        (&self.sort_by, self.sort_order)
    }
}

/// Resolve decoded query pairs against `policy`
///
/// Page- and offset-based addressing are both accepted; when both are sent
/// the offset wins. Non-integer `page`, `limit` or `offset` values are
/// rejected, while an unknown `sortBy` silently falls back to the default.
pub fn resolve(
    pairs: &[(String, String)],
    policy: &PaginationPolicy,
) -> Result<PaginationDescriptor, OperationalError> {
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    };

    let mut issues = Vec::new();

    let page = get("page").and_then(|raw| match raw.parse::<i64>() {
        Ok(n) if n >= 1 => Some(n as u64),
        _ => {
            issues.push(FieldIssue::new(
                "page",
                "page must be a positive integer",
                IssueCode::InvalidType,
            ));
            None
        }
    });
    let limit = get("limit").and_then(|raw| match raw.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            issues.push(FieldIssue::new(
                "limit",
                "limit must be an integer",
                IssueCode::InvalidType,
            ));
            None
        }
    });
    let offset = get("offset").and_then(|raw| match raw.parse::<i64>() {
        Ok(n) if n >= 0 => Some(n as u64),
        _ => {
            issues.push(FieldIssue::new(
                "offset",
                "offset must be a non-negative integer",
                IssueCode::InvalidType,
            ));
            None
        }
    });

    if !issues.is_empty() {
        return Err(invalid_parameters(&issues));
    }

    let max_limit = policy.max_limit.max(1);
    let limit = match limit {
        Some(n) => n.clamp(1, max_limit as i64) as u64,
        None => policy.default_limit.clamp(1, max_limit),
    };

    let (page, offset) = match (offset, page) {
        (Some(offset), _) => {
            let page = offset / limit + 1;
            (page, (page - 1) * limit)
        }
        (None, Some(page)) => match (page - 1).checked_mul(limit).filter(|o| *o <= MAX_OFFSET) {
            Some(offset) => (page, offset),
            None => {
                return Err(invalid_parameters(&[FieldIssue::new(
                    "page",
                    format!("page is too large for a limit of {limit}"),
                    IssueCode::TooBig,
                )]));
            }
        },
        (None, None) => (1, 0),
    };

    let sort_by = match get("sortBy") {
        Some(field)
            if policy.allowed_sort_fields.is_empty()
                || policy.allowed_sort_fields.iter().any(|f| f == field) =>
        {
            field.to_string()
        }
        _ => policy.default_sort_field.clone(),
    };
    let sort_order = get("sortOrder")
        .and_then(SortOrder::parse)
        .unwrap_or_default();

    let mut filters = BTreeMap::new();
    for (key, value) in pairs {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if policy.allowed_filter_keys.iter().any(|k| k == key) {
            filters.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    let search = pairs
        .iter()
        .find(|(k, _)| k == "search")
        .map(|(_, v)| v.clone())
        .filter(|v| !v.is_empty());
    let search_fields = match &search {
        Some(_) if !policy.search_fields.is_empty() => Some(policy.search_fields.clone()),
        _ => None,
    };

    Ok(PaginationDescriptor {
        page,
        limit,
        offset,
        sort_by,
        sort_order,
        filters,
        search,
        search_fields,
    })
}

fn invalid_parameters(issues: &[FieldIssue]) -> OperationalError {
    OperationalError::validation("Invalid pagination parameters")
        .with_details(serde_json::to_value(issues).unwrap_or_default())
}
