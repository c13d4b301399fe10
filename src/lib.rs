//! # open-source-hub
//!
//! A small web service for finding public repositories on GitHub. Users
//! type a compact query language on top of GitHub's own search syntax, and
//! the service shields the upstream API with caching, per-client rate
//! shaping and cancellable, deadline-bound requests.
//!
//! ## Request flow
//!
//! ```text
//!            GET /api/search?q=react @javascript #good-first-issue >1000
//!                               │
//!                               ▼
//!                  ┌───────────────────────┐
//!                  │     Rate Shaper       │──► 429 rate_limit_exceeded
//!                  │  N req / window / IP  │
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │      Validation       │──► 400 <validation code>
//!                  │ len, page, sort, ...  │
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │ Claim slot (cancel    │
//!                  │ the previous search)  │
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐   hit
//!                  │    TTL cache (FIFO)   │──────────► cached: true
//!                  └───────────┬───────────┘
//!                              │ miss
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │    Query compiler     │
//!                  │ react language:... +  │
//!                  │ ... stars:1000+is:... │
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │   Upstream fetch      │──► 504 / 403 / 409 / 500
//!                  │ one per key, timeout  │
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │ Normalize → cache →   │
//!                  │ respond (cached:false)│
//!                  └───────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration and search limits
//! - [`models`] - Closed enumerations (`Language`, `SortOption`) and wire types
//! - [`error`] - Error kinds, machine codes and their HTTP rendering
//! - [`query`] - Operator table and the query compiler
//! - [`github`] - Upstream search client and response normalization
//! - [`cache`] - Bounded TTL cache with FIFO eviction
//! - [`search`] - Validation, rate shaping and the search coordinator
//! - [`api`] - Axum HTTP handlers and router
//! - [`state`] - Shared application state

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod models;
pub mod query;
pub mod search;
pub mod state;
