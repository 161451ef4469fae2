use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use cyber_reporter::{
    analyzer::{Analyzer, RankingBackend},
    types::{ArticleRecord, ReporterError, Result},
};

/// Backend that replays a scripted reply, or fails like a timed-out request.
struct CannedBackend {
    reply: Option<String>,
}

impl CannedBackend {
    fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }

    fn failing() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl RankingBackend for CannedBackend {
    fn backend_name(&self) -> String {
        "canned".to_string()
    }

    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        self.reply
            .clone()
            .ok_or_else(|| ReporterError::Upstream("ranking service timed out".to_string()))
    }
}

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

fn sample_articles(count: usize) -> Vec<ArticleRecord> {
    (0..count)
        .map(|i| ArticleRecord {
            title: format!("Ransomware wave hits sector {}", i),
            link: format!("https://example.com/story-{}", i),
            description: "Attackers exploited an unpatched gateway appliance.".to_string(),
            source: "Example Security News".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap(),
        })
        .collect()
}

fn attack_json(rank: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "rank": rank,
        "title": format!("Attack {}", rank),
        "source": "Example Security News",
        "link": "https://example.com/attack",
        "summary": "Large-scale credential theft."
    })
}

fn lesson_json(rank: u32) -> serde_json::Value {
    serde_json::json!({
        "rank": rank,
        "title": format!("Lesson {}", rank),
        "learning_objectives": ["Understand the attack chain"],
        "real_world_impact": "Weeks of downtime for affected orgs.",
        "mitigation_strategies": ["Patch edge devices promptly"],
        "discussion_questions": ["How would you detect this earlier?"]
    })
}

#[tokio::test]
async fn empty_input_yields_empty_report_without_calling_backend() {
    // A failing backend proves synthesize never reaches it for empty input.
    let analyzer = Analyzer::new(Box::new(CannedBackend::failing()));

    let report = analyzer.synthesize(test_date(), &[]).await;

    assert_eq!(report.date, test_date());
    assert!(report.is_empty());
}

#[tokio::test]
async fn upstream_failure_degrades_to_empty_report() {
    let analyzer = Analyzer::new(Box::new(CannedBackend::failing()));

    let report = analyzer.synthesize(test_date(), &sample_articles(3)).await;

    assert!(report.ranked_attacks.is_empty());
    assert!(report.lessons.is_empty());
}

#[tokio::test]
async fn unparseable_reply_degrades_to_empty_report() {
    let analyzer = Analyzer::new(Box::new(CannedBackend::replying(
        "I'm sorry, I cannot rank these articles.",
    )));

    let report = analyzer.synthesize(test_date(), &sample_articles(3)).await;

    assert!(report.is_empty());
}

#[tokio::test]
async fn fenced_overflowing_reply_is_truncated_and_lessons_filtered() {
    // 12 ranked items and 3 lessons, wrapped in a markdown fence.
    let attacks: Vec<_> = (1..=12).map(|r| attack_json(serde_json::json!(r))).collect();
    let lessons: Vec<_> = (1..=3).map(lesson_json).collect();
    let body = serde_json::json!({ "top_10_attacks": attacks, "lessons": lessons });
    let reply = format!("```json\n{}\n```", body);

    let analyzer = Analyzer::new(Box::new(CannedBackend::replying(reply)));
    let report = analyzer.synthesize(test_date(), &sample_articles(12)).await;

    let ranks: Vec<u32> = report.ranked_attacks.iter().map(|a| a.rank).collect();
    assert_eq!(ranks, (1..=10).collect::<Vec<u32>>());

    let lesson_ranks: Vec<u32> = report.lessons.iter().map(|l| l.rank).collect();
    assert_eq!(lesson_ranks, vec![1, 2]);
}

#[tokio::test]
async fn malformed_and_duplicate_ranks_are_dropped_not_fatal() {
    let attacks = vec![
        attack_json(serde_json::json!(3)),
        attack_json(serde_json::json!("2")),
        attack_json(serde_json::json!("not-a-rank")),
        attack_json(serde_json::json!(3)),
        attack_json(serde_json::json!(1)),
        attack_json(serde_json::json!(0)),
    ];
    let body = serde_json::json!({
        "top_10_attacks": attacks,
        "lessons": [lesson_json(1), lesson_json(2)],
    });

    let analyzer = Analyzer::new(Box::new(CannedBackend::replying(body.to_string())));
    let report = analyzer.synthesize(test_date(), &sample_articles(6)).await;

    let ranks: Vec<u32> = report.ranked_attacks.iter().map(|a| a.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3], "survivors sorted ascending, string rank coerced");
    assert_eq!(report.lessons.len(), 2);
}

#[tokio::test]
async fn lesson_without_matching_attack_is_dropped_and_singletons_cleared() {
    // Only one of the two lessons references a surviving top-2 rank; a
    // report never carries exactly one lesson.
    let body = serde_json::json!({
        "top_10_attacks": [attack_json(serde_json::json!(1)), attack_json(serde_json::json!(2))],
        "lessons": [lesson_json(2), lesson_json(7)],
    });

    let analyzer = Analyzer::new(Box::new(CannedBackend::replying(body.to_string())));
    let report = analyzer.synthesize(test_date(), &sample_articles(2)).await;

    assert_eq!(report.ranked_attacks.len(), 2);
    assert!(report.lessons.is_empty());
}

#[tokio::test]
async fn out_of_order_reply_is_sorted_and_aliases_accepted() {
    // `ranked_attacks` accepted as an alias for `top_10_attacks`.
    let body = serde_json::json!({
        "ranked_attacks": [attack_json(serde_json::json!(2)), attack_json(serde_json::json!(1))],
        "lessons": [lesson_json(2), lesson_json(1)],
    });

    let analyzer = Analyzer::new(Box::new(CannedBackend::replying(body.to_string())));
    let report = analyzer.synthesize(test_date(), &sample_articles(2)).await;

    let ranks: Vec<u32> = report.ranked_attacks.iter().map(|a| a.rank).collect();
    assert_eq!(ranks, vec![1, 2]);

    let lesson_ranks: Vec<u32> = report.lessons.iter().map(|l| l.rank).collect();
    assert_eq!(lesson_ranks, vec![1, 2]);
}

#[tokio::test]
async fn missing_keys_default_to_empty_arrays() {
    let analyzer = Analyzer::new(Box::new(CannedBackend::replying("{}")));

    let report = analyzer.synthesize(test_date(), &sample_articles(1)).await;

    assert!(report.is_empty());
    assert_eq!(report.date, test_date());
}
