//! Outbound request pacing.
//!
//! [`RateGovernor`] grants at most `quota` slots in any rolling window of
//! `window` length. Callers that arrive when the quota is spent suspend until
//! the oldest grant ages out of the window. Waiters queue on an async mutex,
//! so they are served in arrival order.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

pub struct RateGovernor {
    quota: usize,
    window: Duration,
    warn_remaining: usize,
    /// Grant times within the current window, oldest first.
    grants: Mutex<VecDeque<Instant>>,
}

impl RateGovernor {
    /// A `quota` of zero is treated as one.
    pub fn new(quota: u32, window: Duration, warn_remaining: u32) -> Self {
        let quota = quota.max(1) as usize;
        Self {
            quota,
            window,
            warn_remaining: warn_remaining as usize,
            grants: Mutex::new(VecDeque::with_capacity(quota)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.quota,
            Duration::from_secs(config.window_secs),
            config.warn_remaining,
        )
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for a request slot.
    pub async fn acquire(&self) {
        let mut grants = self.grants.lock().await;
        loop {
            let now = Instant::now();
            self.expire(&mut grants, now);

            if grants.len() < self.quota {
                grants.push_back(now);
                let remaining = self.quota - grants.len();
                if remaining == self.warn_remaining && remaining > 0 {
                    warn!(
                        remaining,
                        quota = self.quota,
                        window_secs = self.window.as_secs(),
                        "request quota nearly exhausted"
                    );
                }
                return;
            }

            // Full: the front entry is the next one to age out.
            let Some(&oldest) = grants.front() else {
                continue;
            };
            let resume_at = oldest + self.window;
            warn!(
                quota = self.quota,
                wait_ms = resume_at.saturating_duration_since(now).as_millis() as u64,
                "request quota exhausted, waiting for window to roll over"
            );
            tokio::time::sleep_until(resume_at).await;
            debug!("rate window rolled over");
        }
    }

    /// Slots granted within the window ending now.
    pub async fn in_window(&self) -> usize {
        let mut grants = self.grants.lock().await;
        self.expire(&mut grants, Instant::now());
        grants.len()
    }

    fn expire(&self, grants: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = grants.front() {
            if now.duration_since(oldest) >= self.window {
                grants.pop_front();
            } else {
                break;
            }
        }
    }
}
