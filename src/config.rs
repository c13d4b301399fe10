use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Upstream search API configuration
    pub github: GitHubConfig,
    /// Seconds a cached result set stays fresh (0 disables caching)
    pub cache_ttl_secs: u64,
    /// Maximum number of cached result sets
    pub cache_capacity: usize,
    /// Deadline for a single upstream search call, in seconds
    pub fetch_timeout_secs: u64,
    /// Per-client request shaping
    pub rate_limit: RateLimitConfig,
    /// Input bounds for /api/search
    pub limits: SearchLimits,
    /// Answer cross-origin requests from any origin
    pub allow_any_origin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Base URL of the REST API, without trailing slash
    pub api_url: String,
    /// Bearer token passed through to the upstream API
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
            user_agent: "Open-Source-Hub".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client within one window
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_secs: 60,
        }
    }
}

/// Bounds applied to search parameters before anything touches the cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchLimits {
    /// Minimum query length in characters, after trimming
    pub min_query_len: usize,
    pub max_page: u32,
    pub max_per_page: u32,
    pub max_labels: usize,
    pub default_page: u32,
    pub default_per_page: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            min_query_len: 2,
            max_page: 100,
            max_per_page: 100,
            max_labels: 5,
            default_page: 1,
            default_per_page: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            github: GitHubConfig::default(),
            cache_ttl_secs: 300,
            cache_capacity: 500,
            fetch_timeout_secs: 10,
            rate_limit: RateLimitConfig::default(),
            limits: SearchLimits::default(),
            allow_any_origin: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if port.parse::<u16>().is_ok() {
                config.bind_addr = format!("0.0.0.0:{port}");
            }
        }
        if let Ok(addr) = std::env::var("HUB_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("GITHUB_API_URL") {
            config.github.api_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                config.github.token = Some(token.trim().to_string());
            }
        }
        if let Ok(agent) = std::env::var("HUB_USER_AGENT") {
            config.github.user_agent = agent;
        }
        if let Ok(val) = std::env::var("HUB_CACHE_TTL_SECS") {
            if let Ok(v) = val.parse() {
                config.cache_ttl_secs = v;
            }
        }
        if let Ok(val) = std::env::var("HUB_CACHE_CAPACITY") {
            if let Ok(v) = val.parse::<usize>() {
                config.cache_capacity = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("HUB_FETCH_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.fetch_timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("HUB_RATE_LIMIT_MAX") {
            if let Ok(v) = val.parse() {
                config.rate_limit.max_requests = v;
            }
        }
        if let Ok(val) = std::env::var("HUB_RATE_LIMIT_WINDOW_SECS") {
            if let Ok(v) = val.parse() {
                config.rate_limit.window_secs = v;
            }
        }
        if let Ok(val) = std::env::var("HUB_ALLOW_ANY_ORIGIN") {
            config.allow_any_origin = matches!(val.as_str(), "1" | "true" | "yes");
        }

        config
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit.window_secs)
    }
}
