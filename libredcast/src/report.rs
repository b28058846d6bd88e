//! Daily summary building and rendering
//!
//! Stats are fetched best-effort: a post whose counters cannot be read is
//! reported without them and left out of the engagement averages.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::platforms::Platform;
use crate::types::{DailySummary, EngagementStats, PostResult, PostSummary};

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage of `part` in `whole`, rounded to one decimal; 0 for an empty whole
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round1(part as f64 / whole as f64 * 100.0)
}

fn average(total: i64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    round1(total as f64 / count as f64)
}

impl DailySummary {
    /// Aggregate counts and engagement over already-collected posts
    pub fn from_posts(date: NaiveDate, posts: Vec<PostSummary>) -> Self {
        let total = posts.len();
        let successful = posts.iter().filter(|p| p.result.is_success()).count();

        let with_stats: Vec<&EngagementStats> =
            posts.iter().filter_map(|p| p.stats.as_ref()).collect();
        let total_upvotes: i64 = with_stats.iter().map(|s| s.upvotes).sum();
        let total_comments: i64 = with_stats.iter().map(|s| s.comments).sum();
        let total_score: i64 = with_stats.iter().map(|s| s.score).sum();
        let posts_with_stats = with_stats.len();

        Self {
            date,
            total_posts_attempted: total,
            successful_posts: successful,
            failed_posts: total - successful,
            success_rate: percentage(successful, total),
            posts_with_stats,
            total_upvotes,
            total_comments,
            total_score,
            average_score: average(total_score, posts_with_stats),
            average_upvotes: average(total_upvotes, posts_with_stats),
            posts,
        }
    }

    /// Destinations whose attempt failed, in posting order
    pub fn failed_destinations(&self) -> Vec<&str> {
        self.posts
            .iter()
            .filter(|p| !p.result.is_success())
            .map(|p| p.result.destination.as_str())
            .collect()
    }
}

/// Builds a [`DailySummary`], optionally enriching posts with live stats
pub struct SummaryBuilder {
    stats_source: Option<Arc<dyn Platform>>,
}

impl SummaryBuilder {
    pub fn new(stats_source: Option<Arc<dyn Platform>>) -> Self {
        Self { stats_source }
    }

    /// Stats for one post, or `None` if they cannot be fetched
    pub async fn fetch_stats(&self, post_id: &str) -> Option<EngagementStats> {
        let platform = self.stats_source.as_ref()?;
        match platform.post_stats(post_id).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Could not fetch stats for post {}: {}", post_id, e);
                None
            }
        }
    }

    pub async fn build(&self, results: &[PostResult], date: NaiveDate) -> DailySummary {
        let mut posts = Vec::with_capacity(results.len());
        for result in results {
            let stats = match result.post_id() {
                Some(post_id) => self.fetch_stats(post_id).await,
                None => None,
            };
            posts.push(PostSummary {
                result: result.clone(),
                stats,
            });
        }

        let summary = DailySummary::from_posts(date, posts);
        info!(
            "Summary for {}: {}/{} posted, stats for {}",
            summary.date,
            summary.successful_posts,
            summary.total_posts_attempted,
            summary.posts_with_stats
        );
        summary
    }
}

/// Render the human-readable report
pub fn render_text(summary: &DailySummary) -> String {
    TextReport(summary).to_string()
}

/// Plain-text layout of a [`DailySummary`]
pub struct TextReport<'a>(pub &'a DailySummary);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        let has_stats = summary.posts_with_stats > 0;
        let metric = |value: String| if has_stats { value } else { "N/A".to_string() };

        writeln!(f)?;
        writeln!(f, "Reddit Bot Daily Summary - {}", summary.date)?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f)?;
        writeln!(f, "POSTING OVERVIEW:")?;
        writeln!(f, "• Total posts attempted: {}", summary.total_posts_attempted)?;
        writeln!(f, "• Successful posts: {}", summary.successful_posts)?;
        writeln!(f, "• Failed posts: {}", summary.failed_posts)?;
        writeln!(f, "• Success rate: {:.1}%", summary.success_rate)?;
        writeln!(f)?;
        writeln!(f, "ENGAGEMENT METRICS:")?;
        writeln!(f, "• Total upvotes: {}", metric(summary.total_upvotes.to_string()))?;
        writeln!(f, "• Total comments: {}", metric(summary.total_comments.to_string()))?;
        writeln!(f, "• Total score: {}", metric(summary.total_score.to_string()))?;
        writeln!(
            f,
            "• Average score per post: {}",
            metric(format!("{:.1}", summary.average_score))
        )?;
        writeln!(
            f,
            "• Average upvotes per post: {}",
            metric(format!("{:.1}", summary.average_upvotes))
        )?;
        writeln!(f)?;
        writeln!(f, "POST DETAILS:")?;

        for post in &summary.posts {
            let result = &post.result;
            let status = if result.is_success() {
                "✅ SUCCESS"
            } else {
                "❌ FAILED"
            };
            writeln!(f)?;
            writeln!(f, "{} - r/{}", status, result.destination)?;

            if let Some(url) = result.url() {
                writeln!(f, "  URL: {}", url)?;
                if let Some(stats) = &post.stats {
                    writeln!(
                        f,
                        "  Stats: {} score, {} upvotes, {} comments ({:.1}% upvoted)",
                        stats.score, stats.upvotes, stats.comments, stats.upvote_ratio
                    )?;
                }
            }
            if let Some(error) = result.error() {
                writeln!(f, "  Error: {}", error)?;
            }
        }

        let failed = summary.failed_destinations();
        if !failed.is_empty() {
            writeln!(f)?;
            writeln!(f, "FAILED POSTS SUMMARY:")?;
            writeln!(f, "Failed subreddits: {}", failed.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::mock::MockPlatform;
    use crate::types::PostKind;
    use chrono::{TimeZone, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn posted(dest: &str, id: &str) -> PostResult {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        PostResult::posted(dest, PostKind::Text, format!("https://redd.it/{id}"), id, ts)
    }

    fn failed(dest: &str, error: &str) -> PostResult {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 9, 1, 0).unwrap();
        PostResult::failed(dest, PostKind::Text, error, ts)
    }

    fn stats(score: i64, upvotes: i64, comments: i64) -> EngagementStats {
        EngagementStats {
            score,
            upvotes,
            comments,
            upvote_ratio: 90.0,
        }
    }

    #[test]
    fn test_round1_and_percentage() {
        assert_eq!(round1(66.666), 66.7);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(4, 4), 100.0);
    }

    #[test]
    fn test_from_posts_without_stats_has_zero_averages() {
        let posts = vec![PostSummary {
            result: posted("a", "id1"),
            stats: None,
        }];
        let summary = DailySummary::from_posts(date(), posts);
        assert_eq!(summary.posts_with_stats, 0);
        assert_eq!(summary.average_score, 0.0);
        assert_eq!(summary.average_upvotes, 0.0);
        assert_eq!(summary.success_rate, 100.0);
    }

    #[test]
    fn test_from_posts_averages_only_posts_with_stats() {
        let posts = vec![
            PostSummary {
                result: posted("a", "id1"),
                stats: Some(stats(10, 12, 3)),
            },
            PostSummary {
                result: posted("b", "id2"),
                stats: Some(stats(5, 7, 0)),
            },
            PostSummary {
                result: posted("c", "id3"),
                stats: None,
            },
        ];
        let summary = DailySummary::from_posts(date(), posts);
        assert_eq!(summary.total_score, 15);
        assert_eq!(summary.total_upvotes, 19);
        assert_eq!(summary.total_comments, 3);
        assert_eq!(summary.average_score, 7.5);
        assert_eq!(summary.average_upvotes, 9.5);
    }

    #[test]
    fn test_from_posts_empty() {
        let summary = DailySummary::from_posts(date(), vec![]);
        assert_eq!(summary.total_posts_attempted, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[tokio::test]
    async fn test_build_without_stats_source() {
        let builder = SummaryBuilder::new(None);
        let summary = builder.build(&[posted("a", "id1")], date()).await;
        assert!(summary.posts[0].stats.is_none());
    }

    #[tokio::test]
    async fn test_build_skips_failed_posts_and_tolerates_stats_errors() {
        let mock = Arc::new(MockPlatform::success().with_stats("id1", stats(4, 5, 1)));
        let source: Arc<dyn Platform> = mock.clone();
        let builder = SummaryBuilder::new(Some(source));

        let results = vec![posted("a", "id1"), failed("b", "rejected"), posted("c", "gone")];
        let summary = builder.build(&results, date()).await;

        // failed post is never looked up; "gone" lookup fails quietly
        assert_eq!(mock.stats_call_count(), 2);
        assert_eq!(summary.posts_with_stats, 1);
        assert_eq!(summary.posts[0].stats, Some(stats(4, 5, 1)));
        assert!(summary.posts[2].stats.is_none());
        assert_eq!(summary.failed_posts, 1);
    }

    #[test]
    fn test_render_text_with_failure() {
        let posts = vec![
            PostSummary {
                result: failed("a", "rejected"),
                stats: None,
            },
            PostSummary {
                result: posted("b", "id2"),
                stats: Some(stats(3, 4, 2)),
            },
        ];
        let summary = DailySummary::from_posts(date(), posts);
        assert_eq!(summary.failed_posts, 1);
        assert_eq!(summary.success_rate, 50.0);

        let text = render_text(&summary);
        assert!(text.contains("Reddit Bot Daily Summary - 2026-10-19"));
        assert!(text.contains("• Success rate: 50.0%"));
        assert!(text.contains("❌ FAILED - r/a\n  Error: rejected"));
        assert!(text.contains("✅ SUCCESS - r/b\n  URL: https://redd.it/id2"));
        assert!(text.contains("  Stats: 3 score, 4 upvotes, 2 comments (90.0% upvoted)"));
        assert!(text.contains("Failed subreddits: a\n"));
        // details follow posting order
        assert!(text.find("r/a").unwrap() < text.find("r/b").unwrap());
    }

    #[test]
    fn test_render_text_without_stats_shows_na() {
        let posts = vec![PostSummary {
            result: posted("a", "id1"),
            stats: None,
        }];
        let text = render_text(&DailySummary::from_posts(date(), posts));
        assert!(text.contains("• Total upvotes: N/A"));
        assert!(text.contains("• Total comments: N/A"));
        assert!(text.contains("• Total score: N/A"));
        assert!(text.contains("• Average score per post: N/A"));
        assert!(text.contains("• Average upvotes per post: N/A"));
        assert!(!text.contains("FAILED POSTS SUMMARY"));
    }

    #[test]
    fn test_render_text_full_layout() {
        let posts = vec![PostSummary {
            result: failed("a", "rejected"),
            stats: None,
        }];
        let summary = DailySummary::from_posts(date(), posts);
        let expected = format!(
            "\nReddit Bot Daily Summary - 2026-10-19\n{}\n\n\
             POSTING OVERVIEW:\n\
             • Total posts attempted: 1\n\
             • Successful posts: 0\n\
             • Failed posts: 1\n\
             • Success rate: 0.0%\n\n\
             ENGAGEMENT METRICS:\n\
             • Total upvotes: N/A\n\
             • Total comments: N/A\n\
             • Total score: N/A\n\
             • Average score per post: N/A\n\
             • Average upvotes per post: N/A\n\n\
             POST DETAILS:\n\n\
             ❌ FAILED - r/a\n\
             \x20 Error: rejected\n\n\
             FAILED POSTS SUMMARY:\n\
             Failed subreddits: a\n",
            "=".repeat(50)
        );
        assert_eq!(render_text(&summary), expected);
        assert_eq!(TextReport(&summary).to_string(), expected);
    }
}
