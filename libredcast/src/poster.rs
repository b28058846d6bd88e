//! Sequential posting to every configured subreddit
//!
//! Each destination is attempted exactly once, in configuration order. A
//! failed attempt is recorded and the loop moves on; pacing between
//! attempts is unconditional.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::platforms::{Platform, Submission};
use crate::rate_limiter::{RateLimitGuard, Sleeper};
use crate::types::{PostRequest, PostResult};

/// Default pause between two submissions
pub const DEFAULT_POST_DELAY: Duration = Duration::from_secs(30);

/// Phases of one posting run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    Validating,
    Posting { index: usize, total: usize },
    Completed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::NotStarted => write!(f, "not started"),
            RunPhase::Validating => write!(f, "validating"),
            RunPhase::Posting { index, total } => write!(f, "posting {}/{}", index + 1, total),
            RunPhase::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosterSettings {
    pub post_delay: Duration,
    pub rate_limit: RateLimitGuard,
}

impl Default for PosterSettings {
    fn default() -> Self {
        Self {
            post_delay: DEFAULT_POST_DELAY,
            rate_limit: RateLimitGuard::default(),
        }
    }
}

/// Posts one [`PostRequest`] to all of its destinations through a [`Platform`]
pub struct Poster {
    platform: Arc<dyn Platform>,
    sleeper: Arc<dyn Sleeper>,
    settings: PosterSettings,
}

impl Poster {
    pub fn new(
        platform: Arc<dyn Platform>,
        sleeper: Arc<dyn Sleeper>,
        settings: PosterSettings,
    ) -> Self {
        Self {
            platform,
            sleeper,
            settings,
        }
    }

    /// Post to every destination and return one result per destination
    ///
    /// The result order matches `request.destinations()`. An image that fails
    /// validation is dropped for the whole run and every destination gets a
    /// text post instead.
    pub async fn post_all(&self, request: &PostRequest) -> Vec<PostResult> {
        let destinations = request.destinations();
        let total = destinations.len();
        let mut phase = RunPhase::NotStarted;
        debug!(%phase, "Posting run created");

        phase = RunPhase::Validating;
        debug!(%phase, "Checking post image");
        let image = request.image_path().filter(|path| {
            let valid = self.platform.validate_image(path);
            if !valid {
                error!("Image validation failed, skipping image posts");
            }
            valid
        });

        info!(
            "Posting to {} subreddits via {} (image: {})",
            total,
            self.platform.name(),
            if image.is_some() { "yes" } else { "no" }
        );

        let mut results = Vec::with_capacity(total);
        for (index, destination) in destinations.iter().enumerate() {
            phase = RunPhase::Posting { index, total };
            debug!(%phase, destination = %destination, "Submitting");

            self.settings
                .rate_limit
                .check(self.platform.as_ref(), self.sleeper.as_ref())
                .await;

            let submission = Submission {
                destination,
                title: request.title(),
                body: request.body(),
                flair: request.flair(),
                image,
            };
            let kind = submission.kind();

            let result = match self.platform.submit(&submission).await {
                Ok(posted) => {
                    info!("✅ Posted to r/{}: {}", destination, posted.url);
                    PostResult::posted(destination, kind, posted.url, posted.post_id, Utc::now())
                }
                Err(e) => {
                    warn!("❌ Failed to post to r/{}: {}", destination, e);
                    PostResult::failed(destination, kind, e.to_string(), Utc::now())
                }
            };
            results.push(result);

            if index + 1 < total {
                info!(
                    "Waiting {} before next post...",
                    humantime::format_duration(self.settings.post_delay)
                );
                self.sleeper.sleep(self.settings.post_delay).await;
            }
        }

        phase = RunPhase::Completed;
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            %phase,
            "Posting completed: {} successful, {} failed",
            succeeded,
            total - succeeded
        );

        results
    }
}
