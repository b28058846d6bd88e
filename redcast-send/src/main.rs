//! redcast-send - Daily subreddit posting daemon
//!
//! Posts the configured content to every subreddit once a day at the
//! configured local time, then writes the daily report.

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use libredcast::logging;
use libredcast::rate_limiter::{Sleeper, TokioSleeper};
use libredcast::scheduling::DailySchedule;
use libredcast::service::run_daily_job;
use libredcast::{RedcastError, Settings};
use tokio::time::{sleep, Duration};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "redcast-send")]
#[command(version)]
#[command(about = "Daily subreddit posting daemon")]
#[command(long_about = "\
redcast-send - Daily subreddit posting daemon

DESCRIPTION:
    Posts one piece of content to every subreddit listed in the config
    directory, waits for engagement to settle and writes a daily summary
    to the logs directory.

    Without flags it runs forever and fires once per day at POST_TIME in
    TIMEZONE. With --run-once it performs a single run immediately.

CONFIGURATION FILES (in REDCAST_CONFIG_DIR, default ./config):
    subreddits.txt      one subreddit per line, # for comments
    post_content.txt    [TITLE], [BODY] and optional [FLAIR] sections
    post_image.<ext>    optional jpg, jpeg, png or gif

ENVIRONMENT (also read from ./.env):
    REDDIT_CLIENT_ID, REDDIT_CLIENT_SECRET,
    REDDIT_USERNAME, REDDIT_PASSWORD    required
    REDDIT_USER_AGENT                   optional
    POST_TIME                           HH:MM, default 09:00
    TIMEZONE                            IANA name, default UTC
    POST_DELAY_SECONDS                  default 30
    SETTLE_DELAY_SECONDS                default 300
    REDCAST_LOGS_DIR                    default ./logs
    REDCAST_LOG_LEVEL, REDCAST_LOG_FORMAT, REDCAST_LOG_FILE

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (a run in progress completes first)

EXIT CODES:
    0 - Success or clean shutdown
    1 - Configuration or runtime error
    2 - Authentication error
")]
struct Cli {
    /// Run the job once immediately and exit
    #[arg(long)]
    run_once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    logging::init_default();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            let e = RedcastError::from(e);
            error!("Configuration error: {}", e);
            process::exit(e.exit_code());
        }
    };

    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

    if cli.run_once {
        info!("Running job once");
        match run_daily_job(&settings, sleeper).await {
            Ok(report) => {
                info!(
                    "Done: {}/{} posts succeeded",
                    report.summary.successful_posts, report.summary.total_posts_attempted
                );
            }
            Err(e) => {
                error!("Job failed: {}", e);
                process::exit(e.exit_code());
            }
        }
        return;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = setup_signal_handlers(Arc::clone(&shutdown)) {
        error!("{}", e);
        process::exit(e.exit_code());
    }

    run_scheduler_loop(&settings, sleeper, shutdown).await;
    info!("redcast-send stopped");
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> libredcast::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| {
        RedcastError::Runtime(format!("Signal setup failed: {}", e))
    })?;

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            info!("Received shutdown signal, stopping gracefully...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) -> libredcast::Result<()> {
    Ok(())
}

/// Fire the job once per day until shutdown is requested
async fn run_scheduler_loop(
    settings: &Settings,
    sleeper: Arc<dyn Sleeper>,
    shutdown: Arc<AtomicBool>,
) {
    let schedule = DailySchedule::new(settings.post_time, settings.timezone);
    info!(
        "Scheduler started: daily at {} {}",
        schedule.time().format("%H:%M"),
        schedule.timezone()
    );

    loop {
        let next = schedule.next_after(Utc::now());
        info!("Next run at {}", next.with_timezone(&schedule.timezone()));

        // Check shutdown every second while waiting
        while Utc::now() < next {
            if shutdown.load(Ordering::Relaxed) {
                info!("Shutdown requested, stopping scheduler");
                return;
            }
            sleep(Duration::from_secs(1)).await;
        }

        if let Err(e) = run_daily_job(settings, Arc::clone(&sleeper)).await {
            error!("{}", job_failure_message(&e));
        }

        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping scheduler");
            return;
        }
    }
}

/// Log line for a scheduled run that returned an error
fn job_failure_message(e: &RedcastError) -> String {
    if e.is_fatal_to_run() {
        format!(
            "Daily job aborted before posting: {}; retrying at the next scheduled time",
            e
        )
    } else {
        format!("Daily job failed: {}", e)
    }
}
