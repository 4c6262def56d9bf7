//! Rate limiting for remote catalog calls.
//!
//! A [`ScanLimiter`] hands out at most `permits` permits within any rolling
//! `window`, backed by a [`governor`] GCRA limiter with a burst equal to the
//! permit count. Every task in a scan shares one limiter per catalog; callers
//! wait in [`ScanLimiter::acquire`] until a permit is free or the scan is
//! cancelled.

use std::num::NonZeroU32;
use std::time::Duration;

use episodex_common::{Error, MediaId, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio_util::sync::CancellationToken;

use crate::config::RateBudget;

/// Sliding-window permit limiter shared by all groups of one scan.
pub struct ScanLimiter {
    inner: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    permits: u32,
    window: Duration,
    cancel: CancellationToken,
}

impl ScanLimiter {
    /// Create a limiter issuing at most `permits` permits per `window`.
    pub fn new(permits: u32, window: Duration) -> Result<Self> {
        let burst = NonZeroU32::new(permits)
            .ok_or_else(|| Error::config("rate limiter needs at least one permit"))?;
        let quota = Quota::with_period(window / permits)
            .ok_or_else(|| Error::config(format!("rate limiter window {window:?} is too short")))?
            .allow_burst(burst);

        Ok(Self {
            inner: RateLimiter::direct(quota),
            permits,
            window,
            cancel: CancellationToken::new(),
        })
    }

    pub fn from_budget(budget: &RateBudget) -> Result<Self> {
        Self::new(budget.permits, budget.window())
    }

    /// Tie waits to `token`; once it is cancelled every wait fails.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Wait for a permit before running `operation` for `media_id`.
    ///
    /// Fails with [`Error::RemoteFetch`] when the scan is cancelled while
    /// waiting, which callers treat like any other failed remote call.
    pub async fn acquire(&self, operation: &str, media_id: MediaId) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::remote(operation, media_id, "rate limiter wait cancelled"));
        }

        tokio::select! {
            _ = self.inner.until_ready() => Ok(()),
            _ = self.cancel.cancelled() => {
                Err(Error::remote(operation, media_id, "rate limiter wait cancelled"))
            }
        }
    }

    pub fn permits(&self) -> u32 {
        self.permits
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl std::fmt::Debug for ScanLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanLimiter")
            .field("permits", &self.permits)
            .field("window", &self.window)
            .finish()
    }
}
