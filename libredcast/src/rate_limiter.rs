//! Pacing between API calls
//!
//! Every pause the bot takes goes through a [`Sleeper`] so tests can observe
//! pauses without waiting for them.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::platforms::Platform;

/// Remaining-request count below which the guard backs off
pub const DEFAULT_LOW_WATER: f64 = 10.0;

/// Pause taken when the quota runs low
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Proactive backoff before a submission when the quota is nearly spent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitGuard {
    pub low_water: f64,
    pub backoff: Duration,
}

impl Default for RateLimitGuard {
    fn default() -> Self {
        Self {
            low_water: DEFAULT_LOW_WATER,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RateLimitGuard {
    /// Inspect the platform quota and pause if it is below the low-water mark
    ///
    /// An unreadable quota is logged and ignored.
    pub async fn check(&self, platform: &dyn Platform, sleeper: &dyn Sleeper) {
        match platform.rate_limit().await {
            Ok(status) => {
                info!(
                    "Rate limit - Remaining: {}, Used: {}",
                    status.remaining, status.used
                );
                if status.remaining < self.low_water {
                    warn!(
                        "Low rate limit remaining, waiting {}",
                        humantime::format_duration(self.backoff)
                    );
                    sleeper.sleep(self.backoff).await;
                }
            }
            Err(e) => warn!("Could not check rate limit: {}", e),
        }
    }
}
