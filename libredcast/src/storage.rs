//! Report files in the logs directory
//!
//! Three artifacts per run: the raw results (`post_results_<YYYYMMDD_HHMMSS>.json`),
//! the daily summary (`daily_summary_<YYYYMMDD>.json`) and its text rendering
//! (`daily_summary_<YYYYMMDD>.txt`). Summary files for the same date are
//! overwritten by a later run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::PersistenceError;
use crate::report::render_text;
use crate::types::{DailySummary, PostResult};

const RESULTS_PREFIX: &str = "post_results_";
const SUMMARY_PREFIX: &str = "daily_summary_";

/// Paths written by [`ReportStore::persist`]; `None` marks a failed write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedArtifacts {
    pub results: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
    pub summary_text: Option<PathBuf>,
}

#[derive(Serialize)]
struct ResultsFile<'a> {
    timestamp: DateTime<Utc>,
    run_date: NaiveDate,
    total_posts_attempted: usize,
    successful_posts: usize,
    failed_posts: usize,
    results: &'a [PostResult],
}

#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    /// Open the store, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn results_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("{}{}.json", RESULTS_PREFIX, at.format("%Y%m%d_%H%M%S")))
    }

    pub fn summary_json_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{}.json", SUMMARY_PREFIX, date.format("%Y%m%d")))
    }

    pub fn summary_text_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{}.txt", SUMMARY_PREFIX, date.format("%Y%m%d")))
    }

    /// Write the raw results of a run finished at `at`
    pub fn save_post_results(
        &self,
        results: &[PostResult],
        at: DateTime<Utc>,
    ) -> Result<PathBuf, PersistenceError> {
        let successful = results.iter().filter(|r| r.is_success()).count();
        let file = ResultsFile {
            timestamp: at,
            run_date: at.date_naive(),
            total_posts_attempted: results.len(),
            successful_posts: successful,
            failed_posts: results.len() - successful,
            results,
        };
        let path = self.results_path(at);
        write_file(&path, serde_json::to_string_pretty(&file)?)?;
        info!("Post results saved to {}", path.display());
        Ok(path)
    }

    pub fn save_daily_summary(&self, summary: &DailySummary) -> Result<PathBuf, PersistenceError> {
        let path = self.summary_json_path(summary.date);
        write_file(&path, serde_json::to_string_pretty(summary)?)?;
        info!("Daily summary saved to {}", path.display());
        Ok(path)
    }

    pub fn save_text_summary(&self, summary: &DailySummary) -> Result<PathBuf, PersistenceError> {
        let path = self.summary_text_path(summary.date);
        write_file(&path, render_text(summary))?;
        info!("Text summary saved to {}", path.display());
        Ok(path)
    }

    /// Write both summary files; each write stands on its own
    pub fn persist_summary(&self, summary: &DailySummary) -> PersistedArtifacts {
        PersistedArtifacts {
            results: None,
            summary_json: logged(self.save_daily_summary(summary)),
            summary_text: logged(self.save_text_summary(summary)),
        }
    }

    /// Write all three artifacts for a run finished at `at`
    pub fn persist(
        &self,
        results: &[PostResult],
        summary: &DailySummary,
        at: DateTime<Utc>,
    ) -> PersistedArtifacts {
        PersistedArtifacts {
            results: logged(self.save_post_results(results, at)),
            ..self.persist_summary(summary)
        }
    }

    /// Stored daily summaries among the `n` newest summary files, newest first
    ///
    /// Files that cannot be read or parsed still count toward `n` and are
    /// skipped, so fewer than `n` summaries may come back.
    pub fn load_recent(&self, n: usize) -> Vec<DailySummary> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(SUMMARY_PREFIX) && name.ends_with(".json"))
            })
            .collect();
        // YYYYMMDD names sort chronologically
        paths.sort_unstable_by(|a, b| b.cmp(a));

        paths
            .iter()
            .take(n)
            .filter_map(|path| match read_summary(path) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!("Skipping unreadable summary: {}", e);
                    None
                }
            })
            .collect()
    }
}

fn read_summary(path: &Path) -> Result<DailySummary, PersistenceError> {
    let text = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| PersistenceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: String) -> Result<(), PersistenceError> {
    std::fs::write(path, contents).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn logged(result: Result<PathBuf, PersistenceError>) -> Option<PathBuf> {
    result.map_err(|e| error!("Error saving report: {}", e)).ok()
}
