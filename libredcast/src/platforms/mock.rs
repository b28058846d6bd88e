//! Mock platform implementation for testing
//!
//! Simulates authentication, per-subreddit submission failures, stats
//! lookups and rate-limit quotas without network access. Every call is
//! recorded so tests can check order and submission paths.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PlatformError, Result};
use crate::platforms::{Platform, RateLimitStatus, Submission, SubmittedPost};
use crate::rate_limiter::Sleeper;
use crate::types::{EngagementStats, PostKind};

/// A submission as the mock saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSubmission {
    pub destination: String,
    pub title: String,
    pub flair: Option<String>,
    pub image: Option<PathBuf>,
    pub kind: PostKind,
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,

    /// Whether authentication should succeed
    pub auth_succeeds: bool,

    /// Error to return on authentication failure
    pub auth_error: Option<String>,

    /// Destinations whose submissions fail, with the error to report
    pub failing_destinations: HashMap<String, String>,

    /// Stats served per post id; missing ids fail the lookup
    pub stats: HashMap<String, EngagementStats>,

    /// Quota reported by `rate_limit`; `None` makes the lookup fail
    pub rate_limit: Option<RateLimitStatus>,

    /// Number of times authenticate has been called
    pub auth_call_count: Arc<Mutex<usize>>,

    /// Number of times post_stats has been called
    pub stats_call_count: Arc<Mutex<usize>>,

    /// Submissions in call order
    pub submissions: Arc<Mutex<Vec<RecordedSubmission>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_succeeds: true,
            auth_error: None,
            failing_destinations: HashMap::new(),
            stats: HashMap::new(),
            rate_limit: Some(RateLimitStatus {
                remaining: 600.0,
                used: 0,
                reset_seconds: Some(600),
            }),
            auth_call_count: Arc::new(Mutex::new(0)),
            stats_call_count: Arc::new(Mutex::new(0)),
            submissions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
///
/// Successful submissions get ids `mock1`, `mock2`, ... in call order.
pub struct MockPlatform {
    config: MockConfig,
    authenticated: bool,
}

impl MockPlatform {
    /// Create a new mock platform with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// Create a mock platform that always succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a mock platform that fails authentication
    pub fn auth_failure(error: &str) -> Self {
        Self::new(MockConfig {
            auth_succeeds: false,
            auth_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Make submissions to `destination` fail with `error`
    pub fn failing_on(mut self, destination: &str, error: &str) -> Self {
        self.config
            .failing_destinations
            .insert(destination.to_string(), error.to_string());
        self
    }

    /// Serve `stats` for `post_id`
    pub fn with_stats(mut self, post_id: &str, stats: EngagementStats) -> Self {
        self.config.stats.insert(post_id.to_string(), stats);
        self
    }

    /// Report `status` from `rate_limit`, or fail the lookup with `None`
    pub fn with_rate_limit(mut self, status: Option<RateLimitStatus>) -> Self {
        self.config.rate_limit = status;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Get the number of times authenticate was called
    pub fn auth_call_count(&self) -> usize {
        *lock(&self.config.auth_call_count)
    }

    /// Get the number of times post_stats was called
    pub fn stats_call_count(&self) -> usize {
        *lock(&self.config.stats_call_count)
    }

    /// Get all submissions in call order
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        lock(&self.config.submissions).clone()
    }

    /// Handle to the submission log that stays valid after the mock is moved
    pub fn submission_log(&self) -> Arc<Mutex<Vec<RecordedSubmission>>> {
        Arc::clone(&self.config.submissions)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Platform for MockPlatform {
    async fn authenticate(&mut self) -> Result<()> {
        *lock(&self.config.auth_call_count) += 1;

        if self.config.auth_succeeds {
            self.authenticated = true;
            Ok(())
        } else {
            let error_msg = self
                .config
                .auth_error
                .clone()
                .unwrap_or_else(|| "Mock authentication failed".to_string());
            Err(PlatformError::Authentication(error_msg).into())
        }
    }

    async fn submit(&self, submission: &Submission<'_>) -> Result<SubmittedPost> {
        let index = {
            let mut submissions = lock(&self.config.submissions);
            submissions.push(RecordedSubmission {
                destination: submission.destination.to_string(),
                title: submission.title.to_string(),
                flair: submission.flair.map(str::to_string),
                image: submission.image.map(|p| p.to_path_buf()),
                kind: submission.kind(),
            });
            submissions.len()
        };

        if let Some(error) = self.config.failing_destinations.get(submission.destination) {
            return Err(PlatformError::Submission(error.clone()).into());
        }

        let post_id = format!("mock{index}");
        Ok(SubmittedPost {
            url: format!(
                "https://mock.example/r/{}/comments/{}",
                submission.destination, post_id
            ),
            post_id,
        })
    }

    async fn post_stats(&self, post_id: &str) -> Result<EngagementStats> {
        *lock(&self.config.stats_call_count) += 1;

        self.config
            .stats
            .get(post_id)
            .copied()
            .ok_or_else(|| PlatformError::Stats(format!("no stats for {post_id}")).into())
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        self.config
            .rate_limit
            .ok_or_else(|| PlatformError::RateLimit("quota unknown".to_string()).into())
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

/// Sleeper that records requested pauses instead of waiting
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// All requested pauses in order
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
    }
}
