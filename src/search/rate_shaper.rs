use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::SearchError;

/// Windows are swept once this many clients are being tracked.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-client request counter over a fixed-length window.
///
/// A client's window opens with its first accepted request and lasts
/// `window`; within it at most `max_requests` are accepted. Rejected
/// requests neither count nor move the window.
pub struct RateShaper {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateShaper {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, client: &str) -> Result<(), SearchError> {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> Result<(), SearchError> {
        let mut clients = self.clients.lock();

        if clients.len() >= SWEEP_THRESHOLD && !clients.contains_key(client) {
            let window = self.window;
            clients.retain(|_, w| now.saturating_duration_since(w.started) < window);
        }

        let slot = clients.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(slot.started);
        if elapsed >= self.window {
            *slot = Window {
                started: now,
                count: 0,
            };
        }

        if slot.count < self.max_requests {
            slot.count += 1;
            return Ok(());
        }

        let retry_after = self
            .window
            .saturating_sub(now.saturating_duration_since(slot.started));
        tracing::debug!("Rate limit hit for {client}, retry in {retry_after:?}");

        let until_reset = chrono::Duration::from_std(retry_after)
            .unwrap_or_else(|_| chrono::Duration::zero());
        Err(SearchError::RateLimitExceeded {
            retry_after,
            reset_time: Utc::now() + until_reset,
        })
    }

    /// Clients with an open window.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}
