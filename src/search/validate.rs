use serde_json::json;

use crate::config::SearchLimits;
use crate::error::ValidationError;
use crate::models::{Language, SearchRequest, SortOption};
use crate::query::ParsedOperators;

/// A search whose parameters passed every bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSearch {
    /// Trimmed raw query, operators included
    pub query: String,
    pub page: u32,
    pub per_page: u32,
    pub sort: SortOption,
    /// Labels from the `labels` parameter, in request order
    pub labels: Vec<String>,
    pub language: Option<Language>,
}

impl ValidatedSearch {
    /// Every parameter that changes the upstream answer, joined as a JSON
    /// array so that no two distinct searches can collide.
    pub fn cache_key(&self) -> String {
        json!([
            self.query,
            self.language.map(|l| l.as_str()),
            self.labels,
            self.sort.as_str(),
            self.page,
            self.per_page,
        ])
        .to_string()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bounded(value: Option<&str>, default: u32, max: u32) -> Option<u32> {
    match value {
        None => Some(default),
        Some(v) => v.parse::<u32>().ok().filter(|n| (1..=max).contains(n)),
    }
}

/// Split a comma-separated label list, dropping empty entries.
pub fn split_labels(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Check request parameters in a fixed order and stop at the first failure.
pub fn validate(
    request: &SearchRequest,
    limits: &SearchLimits,
) -> Result<ValidatedSearch, ValidationError> {
    let query = request.q.as_deref().unwrap_or("").trim().to_string();
    if query.chars().count() < limits.min_query_len {
        return Err(ValidationError::QueryTooShort {
            min: limits.min_query_len,
        });
    }

    let page = parse_bounded(non_empty(&request.page), limits.default_page, limits.max_page)
        .ok_or(ValidationError::PageOutOfRange {
            max: limits.max_page,
        })?;

    let per_page = parse_bounded(
        non_empty(&request.per_page),
        limits.default_per_page,
        limits.max_per_page,
    )
    .ok_or(ValidationError::PerPageOutOfRange {
        max: limits.max_per_page,
    })?;

    let sort = match non_empty(&request.sort) {
        None => SortOption::default(),
        Some(s) => s
            .parse::<SortOption>()
            .map_err(|_| ValidationError::UnsupportedSort(s.to_string()))?,
    };

    let labels = split_labels(non_empty(&request.labels));
    let total_labels = labels.len() + ParsedOperators::parse(&query).labels.len();
    if total_labels > limits.max_labels {
        return Err(ValidationError::TooManyLabels {
            max: limits.max_labels,
            got: total_labels,
        });
    }

    let language = match non_empty(&request.language) {
        None => None,
        Some(l) => Some(
            l.parse::<Language>()
                .map_err(|_| ValidationError::UnsupportedLanguage(l.to_string()))?,
        ),
    };

    Ok(ValidatedSearch {
        query,
        page,
        per_page,
        sort,
        labels,
        language,
    })
}
