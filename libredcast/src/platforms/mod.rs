//! Publishing client abstraction and implementations
//!
//! The [`Platform`] trait is the seam between the posting pipeline and the
//! network. [`reddit::RedditClient`] talks to the real API; [`mock::MockPlatform`]
//! stands in for it in tests.
//!
//! # Examples
//!
//! ```no_run
//! use libredcast::platforms::{Platform, Submission, reddit::RedditClient};
//! use libredcast::Settings;
//!
//! # async fn example() -> libredcast::Result<()> {
//! let settings = Settings::from_env()?;
//! let mut client = RedditClient::new(&settings.credentials)?;
//! client.authenticate().await?;
//!
//! let posted = client
//!     .submit(&Submission {
//!         destination: "test",
//!         title: "Hello",
//!         body: "Posted by redcast",
//!         flair: None,
//!         image: None,
//!     })
//!     .await?;
//! println!("Posted: {}", posted.url);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::media::{self, MAX_IMAGE_BYTES, MAX_IMAGE_DIMENSION};
use crate::types::{EngagementStats, PostKind};

pub mod mock;
pub mod reddit;

/// One post to send to one destination
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub destination: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub flair: Option<&'a str>,
    /// Present only when the image already passed validation
    pub image: Option<&'a Path>,
}

impl Submission<'_> {
    pub fn kind(&self) -> PostKind {
        if self.image.is_some() {
            PostKind::Image
        } else {
            PostKind::Text
        }
    }
}

/// Identifiers of a post the platform accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedPost {
    pub url: String,
    pub post_id: String,
}

/// Remaining request quota as last reported by the platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitStatus {
    pub remaining: f64,
    pub used: u64,
    /// Seconds until the quota window resets
    pub reset_seconds: Option<u64>,
}

/// Publishing client contract
///
/// `authenticate` must succeed before anything else is called. The other
/// async methods take `&self` so an authenticated client can be shared
/// behind an `Arc` by the poster and the summary builder.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Establish a session and confirm the account identity
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` if credentials are rejected or
    /// the identity check fails.
    async fn authenticate(&mut self) -> Result<()>;

    /// Submit one post
    ///
    /// Uses the image path when `submission.image` is set, the text path
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Submission`, `Network` or `RateLimit`; the
    /// message names the destination.
    async fn submit(&self, submission: &Submission<'_>) -> Result<SubmittedPost>;

    /// Fetch current engagement counters for a post created earlier
    async fn post_stats(&self, post_id: &str) -> Result<EngagementStats>;

    /// Current rate-limit quota
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::RateLimit` when the quota is not known.
    async fn rate_limit(&self) -> Result<RateLimitStatus>;

    /// Lowercase platform identifier
    fn name(&self) -> &str;

    /// Maximum accepted image file size in bytes
    fn max_image_size(&self) -> u64 {
        MAX_IMAGE_BYTES
    }

    /// Maximum accepted image width and height in pixels
    fn max_image_dimension(&self) -> u32 {
        MAX_IMAGE_DIMENSION
    }

    /// Check a local image against this platform's limits
    ///
    /// Returns `false` instead of failing.
    fn validate_image(&self, path: &Path) -> bool {
        media::validate_image(path, self.max_image_size(), self.max_image_dimension())
    }
}
