use std::collections::VecDeque;
use std::hash::Hash;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Per-client sliding-window request quota: at most `max_requests` admitted
/// requests in any `window`. Rejected requests do not count against the
/// quota.
pub struct SlidingWindowLimiter<K = IpAddr> {
    window: Duration,
    max_requests: u32,
    hits: DashMap<K, VecDeque<Instant>>,
}

impl<K: Hash + Eq + Clone> SlidingWindowLimiter<K> {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            window,
            max_requests: max_requests.max(1),
            hits: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&self, key: &K) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &K, now: Instant) -> RateDecision {
        let mut hits = self.hits.entry(key.clone()).or_default();

        while hits
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests as usize {
            let oldest = hits.front().copied().unwrap_or(now);
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(oldest));
            return RateDecision::Limited { retry_after };
        }

        hits.push_back(now);
        RateDecision::Allowed {
            remaining: self.max_requests - hits.len() as u32,
        }
    }

    /// Forget clients with no requests inside the window.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let before = self.hits.len();
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|&t| now.saturating_duration_since(t) < self.window)
        });
        let removed = before.saturating_sub(self.hits.len());
        if removed > 0 {
            debug!("purged {removed} idle rate-limit entries");
        }
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }
}
