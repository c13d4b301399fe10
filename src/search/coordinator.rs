use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio_util::sync::CancellationToken;

use crate::cache::TtlCache;
use crate::config::SearchLimits;
use crate::error::SearchError;
use crate::github::{normalize, RepoSearchUpstream, UpstreamPage, UpstreamRequest};
use crate::models::{QueryInfo, RateLimitInfo, ResultSet, SearchRequest, SearchResponse};
use crate::query::{compile_with_filters, CompiledQuery};
use crate::search::validate::{validate, ValidatedSearch};

/// Result of a successful search, before it is turned into a response.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: ResultSet,
    pub cached: bool,
    pub query_info: QueryInfo,
    pub rate_limit: Option<RateLimitInfo>,
}

impl SearchOutcome {
    pub fn into_response(self) -> SearchResponse {
        SearchResponse {
            total_count: self.results.total_count,
            items: self.results.items,
            query_info: Some(self.query_info),
            rate_limit: self.rate_limit,
            cached: self.cached,
        }
    }
}

/// What one upstream fetch hands to every caller waiting on it.
#[derive(Debug, Clone)]
struct Fetched {
    results: ResultSet,
    rate_limit: RateLimitInfo,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Fetched, SearchError>>>;

struct SlotTicket {
    generation: u64,
    token: CancellationToken,
}

struct Flight {
    id: u64,
    fetch: SharedFetch,
    waiters: usize,
}

/// Runs searches end to end: validation, cache, compilation, upstream
/// fetch, normalization.
///
/// A search may run under a named slot. Starting a search in a slot cancels
/// whatever search currently holds that slot, and a superseded search's
/// result is dropped. Searches without a slot name get a slot of their own.
///
/// Concurrent misses for the same cache key share a single upstream fetch.
/// A caller that is superseded stops waiting; the fetch itself keeps going
/// as long as anyone else still waits on it.
pub struct SearchCoordinator {
    upstream: Arc<dyn RepoSearchUpstream>,
    cache: Arc<TtlCache<ResultSet>>,
    limits: SearchLimits,
    fetch_timeout: Duration,
    slots: Mutex<HashMap<String, SlotTicket>>,
    flights: Mutex<HashMap<String, Flight>>,
    next_generation: AtomicU64,
}

impl SearchCoordinator {
    pub fn new(
        upstream: Arc<dyn RepoSearchUpstream>,
        cache: Arc<TtlCache<ResultSet>>,
        limits: SearchLimits,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            upstream,
            cache,
            limits,
            fetch_timeout,
            slots: Mutex::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &TtlCache<ResultSet> {
        &self.cache
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Slots with a search currently running.
    pub fn in_flight(&self) -> usize {
        self.slots.lock().len()
    }

    /// Upstream fetches currently shared between waiting searches.
    pub fn in_flight_fetches(&self) -> usize {
        self.flights.lock().len()
    }

    pub async fn search(
        &self,
        slot: Option<&str>,
        request: &SearchRequest,
    ) -> Result<SearchOutcome, SearchError> {
        let search = validate(request, &self.limits)?;
        let guard = self.claim_slot(slot);

        let key = search.cache_key();
        if let Some(results) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {key}");
            let compiled = compile_search(&search);
            return Ok(SearchOutcome {
                results,
                cached: true,
                query_info: query_info(&search, compiled),
                rate_limit: None,
            });
        }
        tracing::debug!("Cache miss for {key}");

        let compiled = compile_search(&search);
        let upstream_request = UpstreamRequest {
            query: compiled.query_string.clone(),
            sort: search.sort,
            page: search.page,
            per_page: search.per_page,
        };

        let flight = self.join_flight(&key, upstream_request);
        let outcome = tokio::select! {
            biased;
            _ = guard.token.cancelled() => Err(SearchError::Superseded),
            result = flight.fetch.clone() => result,
        };
        let fetched = outcome.inspect_err(|e| match e {
            SearchError::Superseded => tracing::debug!("Search in slot {} superseded", guard.slot),
            other => tracing::warn!("Upstream search failed ({}): {other}", other.code()),
        })?;

        // A result that arrives after supersession is never acted on.
        if guard.token.is_cancelled() {
            tracing::debug!("Discarding late result for slot {}", guard.slot);
            return Err(SearchError::Superseded);
        }

        // Cached while the flight is still registered, so a search arriving
        // now finds either the flight or the entry.
        self.cache.set(&key, fetched.results.clone());
        drop(flight);

        Ok(SearchOutcome {
            results: fetched.results,
            cached: false,
            query_info: query_info(&search, compiled),
            rate_limit: Some(fetched.rate_limit),
        })
    }

    fn claim_slot(&self, slot: Option<&str>) -> SlotGuard<'_> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let slot = match slot {
            Some(name) => name.to_string(),
            None => format!("#{generation}"),
        };

        let previous = self.slots.lock().insert(
            slot.clone(),
            SlotTicket {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            tracing::debug!("Cancelling outstanding search in slot {slot}");
            previous.token.cancel();
        }

        SlotGuard {
            coordinator: self,
            slot,
            generation,
            token,
        }
    }

    /// Wait on the running fetch for `key`, or start one.
    fn join_flight(&self, key: &str, request: UpstreamRequest) -> FlightGuard<'_> {
        let mut flights = self.flights.lock();

        if let Some(flight) = flights.get_mut(key) {
            tracing::debug!("Joining in-flight fetch for {key}");
            flight.waiters += 1;
            return FlightGuard {
                coordinator: self,
                key: key.to_string(),
                id: flight.id,
                fetch: flight.fetch.clone(),
            };
        }

        let id = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let upstream = Arc::clone(&self.upstream);
        let timeout = self.fetch_timeout;
        let fetch = async move {
            let page = fetch_with_deadline(upstream.as_ref(), &request, timeout).await?;
            Ok::<_, SearchError>(Fetched {
                results: ResultSet {
                    total_count: page.total_count,
                    items: page.items.iter().map(normalize).collect(),
                },
                rate_limit: page.rate_limit,
            })
        }
        .boxed()
        .shared();

        flights.insert(
            key.to_string(),
            Flight {
                id,
                fetch: fetch.clone(),
                waiters: 1,
            },
        );

        FlightGuard {
            coordinator: self,
            key: key.to_string(),
            id,
            fetch,
        }
    }
}

/// Releases a slot when its search ends, unless a newer search has taken it.
struct SlotGuard<'a> {
    coordinator: &'a SearchCoordinator,
    slot: String,
    generation: u64,
    token: CancellationToken,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.coordinator.slots.lock();
        if slots
            .get(&self.slot)
            .is_some_and(|t| t.generation == self.generation)
        {
            slots.remove(&self.slot);
        }
    }
}

/// One waiter on a shared fetch. The last waiter to leave removes the
/// flight, which drops the fetch if it has not finished.
struct FlightGuard<'a> {
    coordinator: &'a SearchCoordinator,
    key: String,
    id: u64,
    fetch: SharedFetch,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut flights = self.coordinator.flights.lock();
        let Some(flight) = flights.get_mut(&self.key) else {
            return;
        };
        if flight.id != self.id {
            return;
        }
        flight.waiters = flight.waiters.saturating_sub(1);
        if flight.waiters == 0 {
            flights.remove(&self.key);
        }
    }
}

fn compile_search(search: &ValidatedSearch) -> CompiledQuery {
    compile_with_filters(&search.query, search.sort, search.language, &search.labels)
}

fn query_info(search: &ValidatedSearch, compiled: CompiledQuery) -> QueryInfo {
    QueryInfo {
        original_query: search.query.clone(),
        compiled_query: compiled.query_string,
        sort: compiled.sort,
        parsed_operators: compiled.parsed_operators,
    }
}

/// Run one upstream call under a deadline.
///
/// When the deadline passes the call is dropped, which closes the
/// underlying connection.
pub async fn fetch_with_deadline(
    upstream: &dyn RepoSearchUpstream,
    request: &UpstreamRequest,
    timeout: Duration,
) -> Result<UpstreamPage, SearchError> {
    match tokio::time::timeout(timeout, upstream.search(request)).await {
        Ok(page) => page,
        Err(_) => Err(SearchError::UpstreamTimeout(timeout)),
    }
}
