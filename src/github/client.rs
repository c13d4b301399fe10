use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;

use crate::config::GitHubConfig;
use crate::error::SearchError;
use crate::models::{RateLimitInfo, SortOption};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One page request against the upstream repository search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub query: String,
    pub sort: SortOption,
    pub page: u32,
    pub per_page: u32,
}

/// Upstream answer before normalization.
#[derive(Debug, Clone)]
pub struct UpstreamPage {
    pub total_count: u64,
    pub items: Vec<Value>,
    pub rate_limit: RateLimitInfo,
}

/// Anything that can answer a repository search. The coordinator only sees
/// this trait, so tests can swap in a scripted backend.
pub trait RepoSearchUpstream: Send + Sync {
    fn search<'a>(
        &'a self,
        request: &'a UpstreamRequest,
    ) -> BoxFuture<'a, Result<UpstreamPage, SearchError>>;
}

/// Client for the GitHub REST search endpoint.
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
}

#[derive(Deserialize)]
struct SearchPayload {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<Value>,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build upstream HTTP client")?;
        Ok(Self { http, config })
    }

    async fn fetch(&self, request: &UpstreamRequest) -> Result<UpstreamPage, SearchError> {
        let url = format!("{}/search/repositories", self.config.api_url);

        let mut builder = self
            .http
            .get(&url)
            .query(&[
                ("q", request.query.as_str()),
                ("sort", request.sort.as_str()),
                ("order", "desc"),
            ])
            .query(&[("page", request.page), ("per_page", request.per_page)])
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, self.config.user_agent.as_str());
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send().await.map_err(transport_error)?;
        let rate_limit = rate_limit_from_headers(resp.headers());
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!("Upstream search returned {status}: {body}");
            return Err(classify_status(status.as_u16(), &rate_limit));
        }

        let payload: SearchPayload = resp.json().await.map_err(|e| {
            tracing::warn!("Failed to decode upstream search response: {e}");
            SearchError::Upstream {
                status: Some(status.as_u16()),
                message: "upstream search returned an unreadable response".to_string(),
            }
        })?;

        Ok(UpstreamPage {
            total_count: payload.total_count,
            items: payload.items,
            rate_limit,
        })
    }
}

impl RepoSearchUpstream for GitHubClient {
    fn search<'a>(
        &'a self,
        request: &'a UpstreamRequest,
    ) -> BoxFuture<'a, Result<UpstreamPage, SearchError>> {
        Box::pin(self.fetch(request))
    }
}

/// Read `x-ratelimit-remaining` / `x-ratelimit-reset` (epoch seconds).
pub fn rate_limit_from_headers(headers: &HeaderMap) -> RateLimitInfo {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    RateLimitInfo {
        remaining: header_str("x-ratelimit-remaining").and_then(|v| v.trim().parse().ok()),
        reset: header_str("x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
    }
}

/// Map a non-2xx upstream status to an error kind. The upstream body is
/// never forwarded.
pub fn classify_status(status: u16, rate_limit: &RateLimitInfo) -> SearchError {
    match status {
        403 | 429 => SearchError::UpstreamRateLimited {
            reset_time: rate_limit.reset,
        },
        _ => SearchError::Upstream {
            status: Some(status),
            message: format!("upstream search failed with HTTP {status}"),
        },
    }
}

fn transport_error(e: reqwest::Error) -> SearchError {
    tracing::warn!("Upstream search request failed: {e}");
    if e.is_timeout() {
        SearchError::UpstreamTimeout(CONNECT_TIMEOUT)
    } else {
        SearchError::Upstream {
            status: None,
            message: "could not reach upstream search".to_string(),
        }
    }
}
