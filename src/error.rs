use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Rejections raised while checking `/api/search` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query must be at least {min} characters long")]
    QueryTooShort { min: usize },
    #[error("page must be a number between 1 and {max}")]
    PageOutOfRange { max: u32 },
    #[error("per_page must be a number between 1 and {max}")]
    PerPageOutOfRange { max: u32 },
    #[error("unsupported sort option '{0}'")]
    UnsupportedSort(String),
    #[error("at most {max} labels are allowed, got {got}")]
    TooManyLabels { max: usize, got: usize },
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),
    #[error("malformed query string: {0}")]
    MalformedQuery(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::QueryTooShort { .. } => "query_too_short",
            ValidationError::PageOutOfRange { .. } => "invalid_page",
            ValidationError::PerPageOutOfRange { .. } => "invalid_per_page",
            ValidationError::UnsupportedSort(_) => "invalid_sort",
            ValidationError::TooManyLabels { .. } => "too_many_labels",
            ValidationError::UnsupportedLanguage(_) => "unsupported_language",
            ValidationError::MalformedQuery(_) => "invalid_query",
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("too many requests, retry in {} seconds", retry_after_secs(.retry_after))]
    RateLimitExceeded {
        retry_after: Duration,
        reset_time: DateTime<Utc>,
    },
    #[error("{}", upstream_rate_limit_message(.reset_time))]
    UpstreamRateLimited { reset_time: Option<DateTime<Utc>> },
    #[error("upstream search did not answer within {} seconds", .0.as_secs())]
    UpstreamTimeout(Duration),
    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },
    #[error("search was superseded by a newer request")]
    Superseded,
}

fn retry_after_secs(d: &Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn upstream_rate_limit_message(reset: &Option<DateTime<Utc>>) -> String {
    match reset {
        Some(at) => format!(
            "API rate limit exceeded. Try again after {} UTC",
            at.format("%H:%M:%S")
        ),
        None => "API rate limit exceeded. Try again later".to_string(),
    }
}

impl SearchError {
    /// Stable machine-readable identifier sent as `error` in the body.
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::Validation(v) => v.code(),
            SearchError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            SearchError::UpstreamRateLimited { .. } => "upstream_rate_limit_exceeded",
            SearchError::UpstreamTimeout(_) => "upstream_timeout",
            SearchError::Upstream { .. } => "upstream_error",
            SearchError::Superseded => "search_superseded",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SearchError::Validation(_) => StatusCode::BAD_REQUEST,
            SearchError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            SearchError::UpstreamRateLimited { .. } => StatusCode::FORBIDDEN,
            SearchError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SearchError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SearchError::Superseded => StatusCode::CONFLICT,
        }
    }

    pub fn reset_time(&self) -> Option<DateTime<Utc>> {
        match self {
            SearchError::RateLimitExceeded { reset_time, .. } => Some(*reset_time),
            SearchError::UpstreamRateLimited { reset_time } => *reset_time,
            _ => None,
        }
    }

    fn retry_after(&self) -> Option<u64> {
        match self {
            SearchError::RateLimitExceeded { retry_after, .. } => {
                Some(retry_after_secs(retry_after))
            }
            SearchError::UpstreamRateLimited {
                reset_time: Some(at),
            } => Some((*at - Utc::now()).num_seconds().max(0) as u64),
            _ => None,
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<DateTime<Utc>>,
}

impl From<&SearchError> for ErrorBody {
    fn from(err: &SearchError) -> Self {
        Self {
            error: err.code(),
            message: err.to_string(),
            reset_time: err.reset_time(),
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(ErrorBody::from(&self))).into_response();
        if let Some(secs) = self.retry_after() {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kinds_have_distinct_codes() {
        let errors = [
            ValidationError::QueryTooShort { min: 2 },
            ValidationError::PageOutOfRange { max: 100 },
            ValidationError::PerPageOutOfRange { max: 100 },
            ValidationError::UnsupportedSort("x".into()),
            ValidationError::TooManyLabels { max: 5, got: 6 },
            ValidationError::UnsupportedLanguage("x".into()),
            ValidationError::MalformedQuery("x".into()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_status_mapping() {
        let validation: SearchError = ValidationError::QueryTooShort { min: 2 }.into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SearchError::UpstreamTimeout(Duration::from_secs(10)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            SearchError::UpstreamRateLimited { reset_time: None }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            SearchError::Upstream {
                status: Some(502),
                message: "bad gateway".into()
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_local_rate_limit_response_has_retry_after() {
        let err = SearchError::RateLimitExceeded {
            retry_after: Duration::from_millis(1500),
            reset_time: Utc::now(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[test]
    fn test_error_body_shape() {
        let err = SearchError::UpstreamRateLimited {
            reset_time: Some(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
        };
        let body = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(body["error"], "upstream_rate_limit_exceeded");
        assert_eq!(body["reset_time"], "2023-11-14T22:13:20Z");
        assert!(body["message"].as_str().unwrap().contains("22:13:20"));
    }

    #[test]
    fn test_error_body_omits_reset_time_when_absent() {
        let body = serde_json::to_value(ErrorBody::from(&SearchError::Superseded)).unwrap();
        assert_eq!(body["error"], "search_superseded");
        assert!(body.get("reset_time").is_none());
    }
}
