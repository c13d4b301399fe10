use std::sync::Arc;
use std::time::Instant;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::github::{GitHubClient, RepoSearchUpstream};
use crate::search::{RateShaper, SearchCoordinator};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub coordinator: Arc<SearchCoordinator>,
    pub rate_shaper: Arc<RateShaper>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let upstream = GitHubClient::new(config.github.clone())?;
        Ok(Self::with_upstream(config, Arc::new(upstream)))
    }

    /// Build state around any upstream implementation.
    pub fn with_upstream(config: Config, upstream: Arc<dyn RepoSearchUpstream>) -> Self {
        let cache = Arc::new(TtlCache::new(config.cache_ttl(), config.cache_capacity));
        let coordinator = SearchCoordinator::new(
            upstream,
            cache,
            config.limits,
            config.fetch_timeout(),
        );
        let rate_shaper = RateShaper::new(config.rate_limit.max_requests, config.rate_window());

        Self {
            config,
            coordinator: Arc::new(coordinator),
            rate_shaper: Arc::new(rate_shaper),
            started_at: Instant::now(),
        }
    }
}
