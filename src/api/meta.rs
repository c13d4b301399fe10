use axum::extract::State;
use axum::Json;

use crate::models::{
    HealthResponse, Language, LanguagesResponse, SortOption, SortOptionEntry, SortOptionsResponse,
};
use crate::query::operators::{syntax_docs, SyntaxDocs};
use crate::state::AppState;

/// GET /api/languages - Values accepted by the `language` parameter
pub async fn languages() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: Language::ALL.to_vec(),
    })
}

/// GET /api/sort-options - Values accepted by the `sort` parameter
pub async fn sort_options() -> Json<SortOptionsResponse> {
    Json(SortOptionsResponse {
        sort_options: SortOption::ALL
            .into_iter()
            .map(|value| SortOptionEntry {
                value,
                label: value.label(),
            })
            .collect(),
    })
}

/// GET /api/search-syntax - Operator reference for the query language
pub async fn search_syntax() -> Json<SyntaxDocs> {
    Json(syntax_docs())
}

/// GET /api/health - Liveness plus cache counters
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.coordinator.cache().stats(),
        uptime: state.started_at.elapsed().as_secs(),
        in_flight: state.coordinator.in_flight(),
    })
}
