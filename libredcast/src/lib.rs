//! Redcast - scheduled subreddit poster
//!
//! This library posts a fixed piece of content to a list of subreddits,
//! waits for engagement counters to settle and writes a daily report.

pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod platforms;
pub mod poster;
pub mod rate_limiter;
pub mod report;
pub mod scheduling;
pub mod service;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::{ContentSource, Settings};
pub use error::{RedcastError, Result};
pub use storage::ReportStore;
pub use types::{DailySummary, EngagementStats, PostKind, PostOutcome, PostRequest, PostResult};
