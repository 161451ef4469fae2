use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A raw news article as collected from a feed source.
///
/// Articles are passed through to the ranking step unchanged; no uniqueness
/// constraint is enforced, so the same story syndicated by two feeds appears
/// twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    pub description: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

/// One entry in the day's ranked attack list.
///
/// Ranks within a report are unique and ascending, at most 10 entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedAttack {
    pub rank: u32,
    pub title: String,
    pub source: String,
    pub link: String,
    pub summary: String,
}

/// Teaching material generated for one of the top-ranked attacks.
///
/// `rank` must reference a rank present in the same report's attack list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub rank: u32,
    pub title: String,
    pub learning_objectives: Vec<String>,
    pub real_world_impact: String,
    pub mitigation_strategies: Vec<String>,
    pub discussion_questions: Vec<String>,
}

/// The daily report artifact. Identity is the `date` field; at most one
/// report exists per date and it is only ever replaced wholesale, never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub date: NaiveDate,
    pub ranked_attacks: Vec<RankedAttack>,
    pub lessons: Vec<Lesson>,
}

impl Report {
    /// "Nothing to report" is a valid terminal state, not a failure.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            ranked_attacks: Vec::new(),
            lessons: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranked_attacks.is_empty() && self.lessons.is_empty()
    }
}

/// Failures of the report store. Kept separate from [`ReporterError`] so
/// callers can tell "produced but unreadable" apart from "never produced".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Stored report {key} is unreadable: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Ranking service error: {0}")]
    Upstream(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, ReporterError>;
