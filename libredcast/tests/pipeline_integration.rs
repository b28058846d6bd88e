//! End-to-end runs of the posting pipeline against the mock platform

use std::sync::Arc;

use chrono::Utc;
use libredcast::platforms::mock::{MockPlatform, RecordingSleeper};
use libredcast::poster::{Poster, PosterSettings, DEFAULT_POST_DELAY};
use libredcast::report::render_text;
use libredcast::service::{DailyRunService, RunSettings, DEFAULT_SETTLE_DELAY};
use libredcast::{DailySummary, EngagementStats, PostKind, PostRequest, ReportStore};
use tempfile::TempDir;

fn request(destinations: &[&str]) -> PostRequest {
    PostRequest::new(
        destinations.iter().map(|d| d.to_string()).collect(),
        "Weekly thread",
        "Share what you are working on",
        None,
        None,
    )
    .unwrap()
}

fn service(platform: MockPlatform, sleeper: &RecordingSleeper, dir: &TempDir) -> DailyRunService {
    DailyRunService::new(
        Arc::new(platform),
        Arc::new(sleeper.clone()),
        ReportStore::new(dir.path()).unwrap(),
        RunSettings::default(),
    )
}

#[tokio::test]
async fn two_successes_keep_order_with_one_delay() {
    let sleeper = RecordingSleeper::new();
    let poster = Poster::new(
        Arc::new(MockPlatform::success()),
        Arc::new(sleeper.clone()),
        PosterSettings::default(),
    );

    let results = poster.post_all(&request(&["a", "b"])).await;

    let order: Vec<&str> = results.iter().map(|r| r.destination.as_str()).collect();
    assert_eq!(order, vec!["a", "b"]);
    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(results[0].url(), Some("https://mock.example/r/a/comments/mock1"));
    assert_eq!(results[1].url(), Some("https://mock.example/r/b/comments/mock2"));
    assert_eq!(sleeper.sleeps(), vec![DEFAULT_POST_DELAY]);
}

#[tokio::test]
async fn result_length_matches_destinations() {
    for count in 1..=6 {
        let destinations: Vec<String> = (0..count).map(|i| format!("sub{i}")).collect();
        let refs: Vec<&str> = destinations.iter().map(String::as_str).collect();
        let poster = Poster::new(
            Arc::new(MockPlatform::success().failing_on("sub1", "rejected")),
            Arc::new(RecordingSleeper::new()),
            PosterSettings::default(),
        );

        let results = poster.post_all(&request(&refs)).await;

        assert_eq!(results.len(), count);
        for (result, destination) in results.iter().zip(&destinations) {
            assert_eq!(&result.destination, destination);
            // exactly one of url/post_id or error
            assert_eq!(result.url().is_some(), result.is_success());
            assert_eq!(result.post_id().is_some(), result.is_success());
            assert_eq!(result.error().is_some(), !result.is_success());
        }
    }
}

#[tokio::test]
async fn one_failure_gives_half_success_rate() {
    let dir = TempDir::new().unwrap();
    let sleeper = RecordingSleeper::new();
    let platform = MockPlatform::success().failing_on("a", "rejected");

    let report = service(platform, &sleeper, &dir).run(&request(&["a", "b"])).await;

    assert_eq!(report.summary.failed_posts, 1);
    assert_eq!(report.summary.success_rate, 50.0);
    assert_eq!(report.summary.failed_destinations(), vec!["a"]);

    let text = render_text(&report.summary);
    let failed_block = text
        .split("FAILED POSTS SUMMARY:")
        .nth(1)
        .expect("failed block present");
    assert_eq!(failed_block.trim(), "Failed subreddits: a");
    assert_eq!(sleeper.sleeps(), vec![DEFAULT_POST_DELAY, DEFAULT_SETTLE_DELAY]);
}

#[tokio::test]
async fn no_stats_renders_na_and_stores_zero() {
    let dir = TempDir::new().unwrap();
    let report = service(MockPlatform::success(), &RecordingSleeper::new(), &dir)
        .run(&request(&["a", "b"]))
        .await;

    assert_eq!(report.summary.posts_with_stats, 0);
    let text = std::fs::read_to_string(report.artifacts.summary_text.unwrap()).unwrap();
    for field in [
        "Total upvotes",
        "Total comments",
        "Total score",
        "Average score per post",
        "Average upvotes per post",
    ] {
        assert!(text.contains(&format!("• {field}: N/A")), "{field} should be N/A");
    }

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report.artifacts.summary_json.unwrap()).unwrap())
            .unwrap();
    assert_eq!(json["total_upvotes"], 0);
    assert_eq!(json["average_score"], 0.0);
    assert_eq!(json["average_upvotes"], 0.0);
}

#[tokio::test]
async fn stats_are_averaged_over_posts_that_have_them() {
    let dir = TempDir::new().unwrap();
    let stat = |score, upvotes, comments| EngagementStats {
        score,
        upvotes,
        comments,
        upvote_ratio: 95.0,
    };
    let platform = MockPlatform::success()
        .with_stats("mock1", stat(10, 11, 2))
        .with_stats("mock3", stat(3, 4, 0));

    let report = service(platform, &RecordingSleeper::new(), &dir)
        .run(&request(&["a", "b", "c"]))
        .await;

    let summary = &report.summary;
    assert_eq!(summary.posts_with_stats, 2);
    assert_eq!(summary.total_score, 13);
    assert_eq!(summary.total_upvotes, 15);
    assert_eq!(summary.average_score, 6.5);
    assert_eq!(summary.average_upvotes, 7.5);
    assert!(summary.posts[1].stats.is_none());
}

#[tokio::test]
async fn text_summary_failure_still_writes_json() {
    let dir = TempDir::new().unwrap();
    let store = ReportStore::new(dir.path()).unwrap();
    let today = Utc::now().date_naive();
    std::fs::create_dir(store.summary_text_path(today)).unwrap();

    let report = service(MockPlatform::success(), &RecordingSleeper::new(), &dir)
        .run(&request(&["a"]))
        .await;

    assert!(report.artifacts.summary_text.is_none());
    let json_path = report.artifacts.summary_json.expect("json summary written");
    let saved: DailySummary =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(saved.successful_posts, 1);
    assert!(report.artifacts.results.is_some());
}

#[tokio::test]
async fn invalid_image_posts_text_everywhere() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("post_image.gif");
    std::fs::write(&image, b"GIF89a but truncated").unwrap();

    let platform = MockPlatform::success();
    let log = platform.submission_log();
    let request = PostRequest::new(
        vec!["a".to_string(), "b".to_string()],
        "t",
        "b",
        None,
        Some(image),
    )
    .unwrap();
    let poster = Poster::new(
        Arc::new(platform),
        Arc::new(RecordingSleeper::new()),
        PosterSettings::default(),
    );

    let results = poster.post_all(&request).await;

    assert!(results.iter().all(|r| r.kind == PostKind::Text));
    assert!(log.lock().unwrap().iter().all(|s| s.image.is_none()));
}

#[tokio::test]
async fn recent_summaries_round_trip_through_store() {
    let dir = TempDir::new().unwrap();
    let report = service(MockPlatform::success(), &RecordingSleeper::new(), &dir)
        .run(&request(&["a"]))
        .await;

    let store = ReportStore::new(dir.path()).unwrap();
    let recent = store.load_recent(7);
    assert_eq!(recent, vec![report.summary]);
}
