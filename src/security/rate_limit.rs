//! Sliding-window rate limiting.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window admission control keyed by an opaque identity.
///
/// Each identity owns an ordered window of admission timestamps bounded to
/// the trailing `window`. The map's entry lock serializes decisions for one
/// identity (arrival order is respected) while different identities proceed
/// in parallel.
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    window: Duration,
    max_requests: usize,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Admit or reject one request for `identity`.
    ///
    /// Timestamps older than `now - window` are evicted first; if fewer than
    /// `max_requests` remain the request is admitted and recorded. Rejected
    /// requests are not recorded, so a hammering client still recovers as
    /// soon as its admitted requests age out.
    pub fn allow(&self, identity: &str) -> bool {
        let now = Instant::now();
        let mut window = self.windows.entry(identity.to_string()).or_default();
        Self::prune(&mut window, now, self.window);

        if window.len() < self.max_requests {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// Drop identities whose window has been empty for at least one window
    /// length, bounding memory for one-shot callers.
    pub fn sweep(&self) {
        let now = Instant::now();
        let horizon = self.window;
        self.windows.retain(|_, window| {
            Self::prune(window, now, horizon);
            !window.is_empty()
        });
    }

    /// Number of identities currently tracked.
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    fn prune(window: &mut VecDeque<Instant>, now: Instant, horizon: Duration) {
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) >= horizon {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}
