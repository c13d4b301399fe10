pub mod meta;
pub mod search;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// All HTTP routes, with tracing and (optionally) permissive CORS.
pub fn router(state: AppState) -> Router {
    let allow_any_origin = state.config.allow_any_origin;

    let router = Router::new()
        .route("/api/search", get(search::search))
        .route("/api/languages", get(meta::languages))
        .route("/api/sort-options", get(meta::sort_options))
        .route("/api/search-syntax", get(meta::search_syntax))
        .route("/api/health", get(meta::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
