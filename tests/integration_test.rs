//! Integration tests for the search service.
//!
//! These tests drive the HTTP handlers directly against a scripted upstream,
//! so no network access is needed.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;
use serde_json::json;

use open_source_hub::api;
use open_source_hub::config::Config;
use open_source_hub::error::SearchError;
use open_source_hub::github::{RepoSearchUpstream, UpstreamPage, UpstreamRequest};
use open_source_hub::models::{RateLimitInfo, SearchRequest};
use open_source_hub::query::compile;
use open_source_hub::state::AppState;

/// Upstream double: records every query it receives and answers with one
/// repository per call. Queries containing "slow" take `delay` to answer.
struct FakeGitHub {
    delay: Duration,
    calls: AtomicUsize,
    queries: parking_lot::Mutex<Vec<UpstreamRequest>>,
}

impl FakeGitHub {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
            queries: parking_lot::Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RepoSearchUpstream for FakeGitHub {
    fn search<'a>(
        &'a self,
        request: &'a UpstreamRequest,
    ) -> BoxFuture<'a, Result<UpstreamPage, SearchError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().push(request.clone());
            if request.query.contains("slow") {
                tokio::time::sleep(self.delay).await;
            }
            Ok(UpstreamPage {
                total_count: 4242,
                items: vec![json!({
                    "id": 10270250,
                    "name": "react",
                    "full_name": "facebook/react",
                    "owner": { "login": "facebook" },
                    "html_url": "https://github.com/facebook/react",
                    "description": "The library for web and native user interfaces.",
                    "stargazers_count": 230000,
                    "watchers_count": 230000,
                    "forks_count": 47000,
                    "open_issues_count": 1000,
                    "language": "JavaScript",
                    "topics": ["react", "ui"],
                    "has_issues": true,
                    "has_wiki": true,
                    "license": { "name": "MIT License" },
                    "default_branch": "main",
                    "permissions": { "admin": false }
                })],
                rate_limit: RateLimitInfo {
                    remaining: Some(9),
                    reset: None,
                },
            })
        })
    }
}

fn state_with(config: Config, upstream: Arc<FakeGitHub>) -> AppState {
    AppState::with_upstream(config, upstream)
}

fn addr(last_octet: u8) -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([10, 0, 0, last_octet], 40000)))
}

fn slot(name: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(api::search::SLOT_HEADER, HeaderValue::from_static(name));
    headers
}

fn params(pairs: &[(&str, &str)]) -> Result<Query<SearchRequest>, QueryRejection> {
    let mut req = SearchRequest::default();
    for (k, v) in pairs {
        let v = Some(v.to_string());
        match *k {
            "q" => req.q = v,
            "page" => req.page = v,
            "per_page" => req.per_page = v,
            "language" => req.language = v,
            "labels" => req.labels = v,
            "sort" => req.sort = v,
            other => panic!("unknown parameter {other}"),
        }
    }
    Ok(Query(req))
}

#[tokio::test]
async fn test_search_compiles_fetches_and_normalizes() {
    let upstream = FakeGitHub::new(Duration::ZERO);
    let state = state_with(Config::default(), upstream.clone());

    let resp = api::search::search(
        State(state),
        addr(1),
        HeaderMap::new(),
        params(&[
            ("q", "react @javascript #good-first-issue >1000"),
            ("sort", "forks"),
            ("page", "2"),
            ("per_page", "20"),
        ]),
    )
    .await
    .unwrap();

    let sent = upstream.queries.lock()[0].clone();
    assert_eq!(
        sent.query,
        "react language:javascript label:\"good-first-issue\" stars:1000+is:public"
    );
    assert_eq!(sent.sort.as_str(), "forks");
    assert_eq!(sent.page, 2);
    assert_eq!(sent.per_page, 20);

    let body = serde_json::to_value(&resp.0).unwrap();
    assert_eq!(body["total_count"], 4242);
    assert_eq!(body["cached"], false);
    assert_eq!(body["items"][0]["full_name"], "facebook/react");
    assert_eq!(body["items"][0]["license_name"], "MIT License");
    assert!(body["items"][0].get("permissions").is_none());
    assert_eq!(body["rate_limit"]["remaining"], 9);
    assert_eq!(
        body["query_info"]["parsed_operators"]["labels"],
        json!(["good-first-issue"])
    );
}

#[tokio::test]
async fn test_repeat_search_served_from_cache() {
    let upstream = FakeGitHub::new(Duration::ZERO);
    let state = state_with(Config::default(), upstream.clone());

    for round in 0..3 {
        let resp = api::search::search(
            State(state.clone()),
            addr(1),
            HeaderMap::new(),
            params(&[("q", "tokio"), ("language", "rust")]),
        )
        .await
        .unwrap();
        assert_eq!(resp.0.cached, round > 0);
    }
    assert_eq!(upstream.calls(), 1);

    // Any parameter change is a different cache entry
    let resp = api::search::search(
        State(state.clone()),
        addr(1),
        HeaderMap::new(),
        params(&[("q", "tokio"), ("language", "go")]),
    )
    .await
    .unwrap();
    assert!(!resp.0.cached);
    assert_eq!(upstream.calls(), 2);

    let health = api::meta::health(State(state)).await.0;
    assert_eq!(health.status, "ok");
    assert_eq!(health.cache.keys, 2);
    assert_eq!(health.cache.hits, 2);
    assert_eq!(health.cache.misses, 2);
    assert_eq!(health.in_flight, 0);
}

#[tokio::test]
async fn test_validation_errors_render_as_400() {
    let upstream = FakeGitHub::new(Duration::ZERO);
    let state = state_with(Config::default(), upstream.clone());

    let cases = [
        (vec![("q", "a")], "query_too_short"),
        (vec![("q", "react"), ("page", "0")], "invalid_page"),
        (vec![("q", "react"), ("per_page", "500")], "invalid_per_page"),
        (vec![("q", "react"), ("sort", "best")], "invalid_sort"),
        (vec![("q", "react"), ("labels", "a,b,c,d,e,f")], "too_many_labels"),
        (vec![("q", "react"), ("language", "klingon")], "unsupported_language"),
    ];

    for (pairs, code) in cases {
        let err = api::search::search(
            State(state.clone()),
            addr(1),
            HeaderMap::new(),
            params(&pairs),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), code);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_rate_shaper_rejects_before_coordinator() {
    let mut config = Config::default();
    config.rate_limit.max_requests = 2;
    let upstream = FakeGitHub::new(Duration::ZERO);
    let state = state_with(config, upstream.clone());

    for q in ["alpha", "beta"] {
        let resp = api::search::search(
            State(state.clone()),
            addr(7),
            HeaderMap::new(),
            params(&[("q", q)]),
        )
        .await
        .unwrap();
        assert!(!resp.0.cached);
    }

    let err = api::search::search(
        State(state.clone()),
        addr(7),
        HeaderMap::new(),
        params(&[("q", "gamma")]),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "rate_limit_exceeded");
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    assert_eq!(upstream.calls(), 2);

    // Another client is unaffected
    assert!(api::search::search(
        State(state),
        addr(8),
        HeaderMap::new(),
        params(&[("q", "gamma")]),
    )
    .await
    .is_ok());
}

#[tokio::test]
async fn test_superseded_search_never_delivers() {
    let upstream = FakeGitHub::new(Duration::from_millis(400));
    let state = state_with(Config::default(), upstream.clone());

    let first = {
        let state = state.clone();
        tokio::spawn(async move {
            api::search::search(
                State(state),
                addr(3),
                slot("search-box"),
                params(&[("q", "slow search")]),
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = api::search::search(
        State(state.clone()),
        addr(3),
        slot("search-box"),
        params(&[("q", "fast search")]),
    )
    .await
    .unwrap();
    assert_eq!(
        second.0.query_info.as_ref().unwrap().original_query,
        "fast search"
    );

    let err = first.await.unwrap().unwrap_err();
    assert_eq!(err.code(), "search_superseded");
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);

    // The superseded result was never cached
    let health = api::meta::health(State(state)).await.0;
    assert_eq!(health.cache.keys, 1);
}

#[tokio::test]
async fn test_separate_slots_for_same_client() {
    let upstream = FakeGitHub::new(Duration::from_millis(100));
    let state = state_with(Config::default(), upstream.clone());

    let tab_a = slot("a");
    let tab_b = slot("b");

    let first = {
        let state = state.clone();
        tokio::spawn(async move {
            api::search::search(State(state), addr(4), tab_a, params(&[("q", "slow one")])).await
        })
    };
    let second =
        api::search::search(State(state), addr(4), tab_b, params(&[("q", "slow two")])).await;

    assert!(second.is_ok());
    assert!(first.await.unwrap().is_ok());
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_unnamed_searches_from_one_address_both_succeed() {
    let upstream = FakeGitHub::new(Duration::from_millis(200));
    let state = state_with(Config::default(), upstream.clone());

    let first = {
        let state = state.clone();
        tokio::spawn(async move {
            api::search::search(
                State(state),
                addr(9),
                HeaderMap::new(),
                params(&[("q", "slow user-a query")]),
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = api::search::search(
        State(state),
        addr(9),
        HeaderMap::new(),
        params(&[("q", "slow user-b other")]),
    )
    .await;

    assert!(second.is_ok());
    assert!(first.await.unwrap().is_ok());
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn test_identical_concurrent_searches_reach_upstream_once() {
    let upstream = FakeGitHub::new(Duration::from_millis(200));
    let state = state_with(Config::default(), upstream.clone());

    let handles: Vec<_> = (1..=5)
        .map(|n| {
            let state = state.clone();
            tokio::spawn(async move {
                api::search::search(
                    State(state),
                    addr(n),
                    HeaderMap::new(),
                    params(&[("q", "slow react")]),
                )
                .await
            })
        })
        .collect();

    for handle in handles {
        let resp = handle.await.unwrap().unwrap();
        assert_eq!(resp.0.items[0].full_name, "facebook/react");
    }
    assert_eq!(upstream.calls(), 1);
    assert_eq!(state.coordinator.in_flight_fetches(), 0);

    let health = api::meta::health(State(state)).await.0;
    assert_eq!(health.cache.keys, 1);
}

#[tokio::test]
async fn test_malformed_query_string_is_json_400() {
    let upstream = FakeGitHub::new(Duration::ZERO);
    let state = state_with(Config::default(), upstream.clone());

    let uri: axum::http::Uri = "/api/search?q=react&q=vue".parse().unwrap();
    let rejected = Query::<SearchRequest>::try_from_uri(&uri);
    assert!(rejected.is_err());

    let err = api::search::search(State(state), addr(1), HeaderMap::new(), rejected)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_query");

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[axum::http::header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_upstream_timeout_renders_as_504() {
    let mut config = Config::default();
    config.fetch_timeout_secs = 1;
    let upstream = FakeGitHub::new(Duration::from_secs(3));
    let state = state_with(config, upstream);

    let err = api::search::search(
        State(state),
        addr(5),
        HeaderMap::new(),
        params(&[("q", "slow upstream")]),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "upstream_timeout");
    assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_static_endpoints() {
    let languages = serde_json::to_value(api::meta::languages().await.0).unwrap();
    assert!(languages["languages"]
        .as_array()
        .unwrap()
        .contains(&json!("rust")));

    let sorts = serde_json::to_value(api::meta::sort_options().await.0).unwrap();
    let values: Vec<&str> = sorts["sort_options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, vec!["stars", "forks", "updated", "help-wanted-issues"]);

    let syntax = serde_json::to_value(api::meta::search_syntax().await.0).unwrap();
    let prefixes: Vec<&str> = syntax["operators"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["prefix"].as_str().unwrap())
        .collect();
    assert_eq!(prefixes, vec!["@/", "@", "#", ">", "^", "~", "+"]);
}

#[test]
fn test_compile_reference_round_trip() {
    let compiled = compile(
        "react @javascript #good-first-issue >1000",
        "stars".parse().unwrap(),
    );
    assert_eq!(
        compiled.query_string,
        "react language:javascript label:\"good-first-issue\" stars:1000+is:public"
    );
}
