//! Daily run orchestration
//!
//! One run posts the configured content everywhere, saves the raw results,
//! waits for engagement to settle, then builds and stores the daily summary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{error, info};

use crate::config::{ContentSource, Settings};
use crate::error::Result;
use crate::platforms::reddit::RedditClient;
use crate::platforms::Platform;
use crate::poster::{Poster, PosterSettings, DEFAULT_POST_DELAY};
use crate::rate_limiter::{RateLimitGuard, Sleeper};
use crate::report::SummaryBuilder;
use crate::storage::{PersistedArtifacts, ReportStore};
use crate::types::{DailySummary, PostRequest, PostResult};

/// Default wait between posting and reading stats
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSettings {
    pub post_delay: Duration,
    pub settle_delay: Duration,
    pub rate_limit: RateLimitGuard,
    /// Zone whose calendar date names the daily summary
    pub timezone: Tz,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            post_delay: DEFAULT_POST_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            rate_limit: RateLimitGuard::default(),
            timezone: Tz::UTC,
        }
    }
}

impl From<&Settings> for RunSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            post_delay: settings.post_delay,
            settle_delay: settings.settle_delay,
            rate_limit: RateLimitGuard::default(),
            timezone: settings.timezone,
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<PostResult>,
    pub summary: DailySummary,
    pub artifacts: PersistedArtifacts,
}

pub struct DailyRunService {
    platform: Arc<dyn Platform>,
    sleeper: Arc<dyn Sleeper>,
    store: ReportStore,
    settings: RunSettings,
}

impl DailyRunService {
    /// `platform` must already be authenticated
    pub fn new(
        platform: Arc<dyn Platform>,
        sleeper: Arc<dyn Sleeper>,
        store: ReportStore,
        settings: RunSettings,
    ) -> Self {
        Self {
            platform,
            sleeper,
            store,
            settings,
        }
    }

    pub async fn run(&self, request: &PostRequest) -> RunReport {
        let poster = Poster::new(
            Arc::clone(&self.platform),
            Arc::clone(&self.sleeper),
            PosterSettings {
                post_delay: self.settings.post_delay,
                rate_limit: self.settings.rate_limit,
            },
        );
        let results = poster.post_all(request).await;

        let finished_at = Utc::now();
        let results_path = self
            .store
            .save_post_results(&results, finished_at)
            .map_err(|e| error!("Error saving post results: {}", e))
            .ok();

        info!(
            "Waiting {} for engagement before building the summary",
            humantime::format_duration(self.settings.settle_delay)
        );
        self.sleeper.sleep(self.settings.settle_delay).await;

        let builder = SummaryBuilder::new(Some(Arc::clone(&self.platform)));
        let summary = builder.build(&results, self.run_date()).await;
        let artifacts = PersistedArtifacts {
            results: results_path,
            ..self.store.persist_summary(&summary)
        };

        info!(
            "Daily run complete: {}/{} posts succeeded ({:.1}%)",
            summary.successful_posts, summary.total_posts_attempted, summary.success_rate
        );

        RunReport {
            results,
            summary,
            artifacts,
        }
    }

    fn run_date(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.timezone).date_naive()
    }
}

/// Load content, authenticate `platform` and run once
///
/// Content is loaded before `platform` is touched, so a configuration error
/// never causes network traffic.
///
/// # Errors
///
/// Returns `ConfigError` for unusable content, `PersistenceError` if the
/// logs directory cannot be created and `PlatformError::Authentication` if
/// login fails. Per-post failures are part of the report, not errors.
pub async fn run_job<P>(
    settings: &Settings,
    mut platform: P,
    sleeper: Arc<dyn Sleeper>,
) -> Result<RunReport>
where
    P: Platform + 'static,
{
    info!("Starting daily Reddit posting job");

    let request = ContentSource::new(&settings.config_dir).load_request()?;
    let store = ReportStore::new(&settings.logs_dir)?;

    platform.authenticate().await?;
    info!("Authenticated with {}", platform.name());

    let service = DailyRunService::new(
        Arc::new(platform),
        sleeper,
        store,
        RunSettings::from(settings),
    );
    Ok(service.run(&request).await)
}

/// [`run_job`] against the live Reddit API
pub async fn run_daily_job(settings: &Settings, sleeper: Arc<dyn Sleeper>) -> Result<RunReport> {
    let client = RedditClient::new(&settings.credentials)?;
    run_job(settings, client, sleeper).await
}
