use std::net::SocketAddr;

use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::error::{SearchError, ValidationError};
use crate::models::{SearchRequest, SearchResponse};
use crate::state::AppState;

/// Names a search slot. A newer search in the same slot cancels the older
/// one (e.g. a search-as-you-type box).
pub const SLOT_HEADER: &str = "x-search-slot";
const MAX_SLOT_LEN: usize = 64;

/// GET /api/search - Operator-aware repository search:
///   1. Per-client rate shaping (rejects before any other work)
///   2. Validation, cache lookup, compilation, upstream fetch
///   3. Normalized results plus query and rate-limit metadata
pub async fn search(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchResponse>, SearchError> {
    let client = addr.ip().to_string();
    state.rate_shaper.check(&client)?;

    let Query(request) =
        query.map_err(|rejection| ValidationError::MalformedQuery(rejection.body_text()))?;

    let slot = search_slot(&headers, &client);
    let outcome = state
        .coordinator
        .search(slot.as_deref(), &request)
        .await?;

    Ok(Json(outcome.into_response()))
}

/// Slot named by the request, scoped to the client so one client can never
/// cancel another client's search. Without the header there is no slot:
/// many unrelated callers can share one address.
pub fn search_slot(headers: &HeaderMap, client: &str) -> Option<String> {
    let slot = headers
        .get(SLOT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    let slot: String = slot.chars().take(MAX_SLOT_LEN).collect();
    Some(format!("{client}/{slot}"))
}
