use crate::config::RankingConfig;
use crate::types::{ArticleRecord, Lesson, RankedAttack, Report, ReporterError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on ranked entries retained per report.
const MAX_RANKED_ATTACKS: usize = 10;
/// Lessons are generated for exactly this many top-ranked attacks.
const LESSON_COUNT: usize = 2;

const SYSTEM_PROMPT: &str = r#"
You are an expert cybersecurity professor and analyst.
You will be provided with a daily feed of cybersecurity news articles in JSON format.
Your task is to analyze these articles and output a strictly formatted JSON response.

Instructions:
1. Review all the provided articles.
2. Select the "Top 10" most impactful, severe, or notable cyber attacks/threats from the list.
3. For the top 2 out of those 10, generate a brief teaching lesson suitable for university students.

The output MUST be valid JSON matching this exact structure:
{
  "top_10_attacks": [
    {
      "rank": 1,
      "title": "Title of the attack/article",
      "source": "Source Name",
      "link": "https://...",
      "summary": "1-2 sentence summary of why this is impactful"
    },
    ...
  ],
  "lessons": [
    {
      "rank": 1,
      "title": "Title of the attack",
      "learning_objectives": ["Objective 1", "Objective 2"],
      "real_world_impact": "Explanation of the impact.",
      "mitigation_strategies": ["Strategy 1", "Strategy 2"],
      "discussion_questions": ["Question 1", "Question 2"]
    },
    {
      "rank": 2,
      ...
    }
  ]
}
Return ONLY the raw JSON format, without markdown blocks, preambles, or postscripts.
"#;

/// Trait for backends that can rank an article batch.
///
/// The backend is handed to the [`Analyzer`] at construction so tests can
/// substitute a scripted implementation for the real service.
#[async_trait]
pub trait RankingBackend: Send + Sync {
    /// Name of this backend, for logging
    fn backend_name(&self) -> String;

    /// Send one ranking request and return the raw completion text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions backend pointed at the DeepSeek API.
pub struct DeepSeekBackend {
    client: Client,
    config: RankingConfig,
}

impl DeepSeekBackend {
    pub fn new(config: RankingConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl RankingBackend for DeepSeekBackend {
    fn backend_name(&self) -> String {
        format!("DeepSeek ({})", self.config.model)
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ReporterError::Upstream("DEEPSEEK_API_KEY is not set".to_string()))?;

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "temperature": 0.3,
        });

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReporterError::Upstream(format!(
                "ranking service returned HTTP {}",
                status
            )));
        }

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ReporterError::Upstream("ranking service returned no choices".to_string()))
    }
}

// Lenient mirror of the wire format. Both arrays default to empty when the
// key is absent, and `rank` stays untyped until coercion so one malformed
// entry never fails the whole decode.
#[derive(Debug, Default, Deserialize)]
struct RawAnalysis {
    #[serde(default, alias = "ranked_attacks")]
    top_10_attacks: Vec<RawAttack>,
    #[serde(default)]
    lessons: Vec<RawLesson>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAttack {
    #[serde(default)]
    rank: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawLesson {
    #[serde(default)]
    rank: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    learning_objectives: Vec<String>,
    #[serde(default)]
    real_world_impact: String,
    #[serde(default)]
    mitigation_strategies: Vec<String>,
    #[serde(default)]
    discussion_questions: Vec<String>,
}

/// Turns an article batch into a validated daily [`Report`].
pub struct Analyzer {
    backend: Box<dyn RankingBackend>,
}

impl Analyzer {
    pub fn new(backend: Box<dyn RankingBackend>) -> Self {
        Self { backend }
    }

    /// Rank `articles` and synthesize teaching material for the top entries.
    ///
    /// Transport failures, timeouts, and unparseable responses all degrade to
    /// the empty report: a failed ranking must not stop tomorrow's run, and a
    /// persisted empty report records that the pipeline did run today.
    pub async fn synthesize(&self, date: NaiveDate, articles: &[ArticleRecord]) -> Report {
        if articles.is_empty() {
            return Report::empty(date);
        }

        info!(
            "Sending {} articles to {} for ranking",
            articles.len(),
            self.backend.backend_name()
        );

        let batch = match serde_json::to_string_pretty(articles) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize article batch: {}", e);
                return Report::empty(date);
            }
        };
        let user_prompt = format!("Daily News Feed:\n{}", batch);

        let reply = match self.backend.complete(SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Ranking request failed, producing empty report: {}", e);
                return Report::empty(date);
            }
        };

        match serde_json::from_str::<RawAnalysis>(strip_code_fences(&reply)) {
            Ok(raw) => normalize(date, raw),
            Err(e) => {
                warn!(
                    "Ranking response was not valid JSON, producing empty report: {}",
                    e
                );
                Report::empty(date)
            }
        }
    }
}

/// Models often wrap the JSON in a markdown fence despite being told not to.
fn strip_code_fences(text: &str) -> &str {
    let mut trimmed = text.trim();

    for prefix in ["```json", "```"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            trimmed = rest;
            break;
        }
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest;
    }

    trimmed.trim()
}

fn coerce_rank(value: &Value) -> Option<u32> {
    let rank = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;

    if rank == 0 {
        return None;
    }
    u32::try_from(rank).ok()
}

/// Validate and normalize a raw response into the canonical report shape.
///
/// Entries with an unparseable or duplicate rank are dropped individually,
/// the survivors are sorted ascending and capped at [`MAX_RANKED_ATTACKS`].
/// Lessons must reference one of the two lowest surviving ranks; a lesson
/// set that ends up smaller than [`LESSON_COUNT`] is discarded entirely so
/// a report always carries 0 or 2 lessons.
fn normalize(date: NaiveDate, raw: RawAnalysis) -> Report {
    let mut seen_ranks = HashSet::new();
    let mut attacks = Vec::new();

    for entry in raw.top_10_attacks {
        let Some(rank) = coerce_rank(&entry.rank) else {
            warn!("Dropping ranked entry with unparseable rank: {}", entry.rank);
            continue;
        };
        if !seen_ranks.insert(rank) {
            warn!("Dropping ranked entry with duplicate rank {}", rank);
            continue;
        }

        attacks.push(RankedAttack {
            rank,
            title: entry.title,
            source: entry.source,
            link: entry.link,
            summary: entry.summary,
        });
    }

    attacks.sort_by_key(|attack| attack.rank);
    if attacks.len() > MAX_RANKED_ATTACKS {
        debug!(
            "Truncating ranked list from {} to {} entries",
            attacks.len(),
            MAX_RANKED_ATTACKS
        );
        attacks.truncate(MAX_RANKED_ATTACKS);
    }

    let lesson_ranks: HashSet<u32> = attacks
        .iter()
        .take(LESSON_COUNT)
        .map(|attack| attack.rank)
        .collect();

    let mut seen_lessons = HashSet::new();
    let mut lessons = Vec::new();

    for entry in raw.lessons {
        let Some(rank) = coerce_rank(&entry.rank) else {
            warn!("Dropping lesson with unparseable rank: {}", entry.rank);
            continue;
        };
        if !lesson_ranks.contains(&rank) {
            warn!("Dropping lesson for rank {} with no matching top attack", rank);
            continue;
        }
        if !seen_lessons.insert(rank) {
            warn!("Dropping duplicate lesson for rank {}", rank);
            continue;
        }

        lessons.push(Lesson {
            rank,
            title: entry.title,
            learning_objectives: entry.learning_objectives,
            real_world_impact: entry.real_world_impact,
            mitigation_strategies: entry.mitigation_strategies,
            discussion_questions: entry.discussion_questions,
        });
    }

    lessons.sort_by_key(|lesson| lesson.rank);
    if lessons.len() < LESSON_COUNT {
        if !lessons.is_empty() {
            warn!(
                "Discarding incomplete lesson set ({} of {})",
                lessons.len(),
                LESSON_COUNT
            );
        }
        lessons.clear();
    }

    Report {
        date,
        ranked_attacks: attacks,
        lessons,
    }
}
