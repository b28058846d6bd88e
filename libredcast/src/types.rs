//! Core types for Redcast

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What gets posted during one run
///
/// Fields are private so a value can only exist once its invariants hold:
/// at least one destination, non-empty title and body.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRequest {
    destinations: Vec<String>,
    title: String,
    body: String,
    flair: Option<String>,
    image_path: Option<PathBuf>,
}

impl PostRequest {
    /// Build a request, rejecting empty destinations, title or body
    pub fn new(
        destinations: Vec<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        flair: Option<String>,
        image_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let title = title.into();
        let body = body.into();

        if destinations.is_empty() {
            return Err(ConfigError::Invalid("No subreddits configured".to_string()));
        }
        if title.trim().is_empty() {
            return Err(ConfigError::Invalid("No post title configured".to_string()));
        }
        if body.trim().is_empty() {
            return Err(ConfigError::Invalid("No post body configured".to_string()));
        }

        Ok(Self {
            destinations,
            title,
            body,
            flair,
            image_path,
        })
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn flair(&self) -> Option<&str> {
        self.flair.as_deref()
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }
}

/// Which submission path an attempt went through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Image,
}

impl std::fmt::Display for PostKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostKind::Text => write!(f, "text"),
            PostKind::Image => write!(f, "image"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Posted { url: String, post_id: String },
    Failed { error: String },
}

/// Outcome of one submission attempt
///
/// Serialized flat as `{destination, success, kind, url, post_id, error, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PostResultRecord", try_from = "PostResultRecord")]
pub struct PostResult {
    pub destination: String,
    pub kind: PostKind,
    pub outcome: PostOutcome,
    pub timestamp: DateTime<Utc>,
}

impl PostResult {
    pub fn posted(
        destination: impl Into<String>,
        kind: PostKind,
        url: impl Into<String>,
        post_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            destination: destination.into(),
            kind,
            outcome: PostOutcome::Posted {
                url: url.into(),
                post_id: post_id.into(),
            },
            timestamp,
        }
    }

    pub fn failed(
        destination: impl Into<String>,
        kind: PostKind,
        error: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            destination: destination.into(),
            kind,
            outcome: PostOutcome::Failed {
                error: error.into(),
            },
            timestamp,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PostOutcome::Posted { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match &self.outcome {
            PostOutcome::Posted { url, .. } => Some(url),
            PostOutcome::Failed { .. } => None,
        }
    }

    pub fn post_id(&self) -> Option<&str> {
        match &self.outcome {
            PostOutcome::Posted { post_id, .. } => Some(post_id),
            PostOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            PostOutcome::Failed { error } => Some(error),
            PostOutcome::Posted { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PostResultRecord {
    destination: String,
    success: bool,
    kind: PostKind,
    url: Option<String>,
    post_id: Option<String>,
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

impl From<PostResult> for PostResultRecord {
    fn from(result: PostResult) -> Self {
        let (success, url, post_id, error) = match result.outcome {
            PostOutcome::Posted { url, post_id } => (true, Some(url), Some(post_id), None),
            PostOutcome::Failed { error } => (false, None, None, Some(error)),
        };
        Self {
            destination: result.destination,
            success,
            kind: result.kind,
            url,
            post_id,
            error,
            timestamp: result.timestamp,
        }
    }
}

impl TryFrom<PostResultRecord> for PostResult {
    type Error = String;

    fn try_from(record: PostResultRecord) -> Result<Self, Self::Error> {
        let outcome = match (record.success, record.url, record.post_id, record.error) {
            (true, Some(url), Some(post_id), None) => PostOutcome::Posted { url, post_id },
            (false, None, None, Some(error)) => PostOutcome::Failed { error },
            _ => {
                return Err(format!(
                    "inconsistent result for '{}': success={} requires {}",
                    record.destination,
                    record.success,
                    if record.success {
                        "url and post_id without error"
                    } else {
                        "error without url or post_id"
                    }
                ))
            }
        };
        Ok(Self {
            destination: record.destination,
            kind: record.kind,
            outcome,
            timestamp: record.timestamp,
        })
    }
}

/// Engagement counters for a live post
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementStats {
    pub score: i64,
    pub upvotes: i64,
    pub comments: i64,
    /// Percentage of votes that were upvotes (0-100)
    pub upvote_ratio: f64,
}

/// A result plus whatever stats could be fetched for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(flatten)]
    pub result: PostResult,
    pub stats: Option<EngagementStats>,
}

/// Report for one run, built once after the settle delay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_posts_attempted: usize,
    pub successful_posts: usize,
    pub failed_posts: usize,
    pub success_rate: f64,
    pub posts: Vec<PostSummary>,
    pub posts_with_stats: usize,
    pub total_upvotes: i64,
    pub total_comments: i64,
    pub total_score: i64,
    pub average_score: f64,
    pub average_upvotes: f64,
}
