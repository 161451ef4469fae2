use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Cybersecurity feeds polled when `CYBER_FEEDS` is not set.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.feedburner.com/TheHackersNews",
    "https://www.bleepingcomputer.com/feed/",
    "https://www.cisa.gov/uscert/ncas/alerts.xml",
    "https://krebsonsecurity.com/feed/",
    "https://www.darkreading.com/rss.xml",
];

/// Connection settings for the ranking service (OpenAI-compatible API).
#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl RankingConfig {
    fn from_env() -> Self {
        let api_key = env::var("DEEPSEEK_API_KEY")
            .ok()
            .filter(|key| !key.is_empty() && key != "your_deepseek_api_key_here");
        if api_key.is_none() {
            warn!("DEEPSEEK_API_KEY is not set or is using the default placeholder");
        }

        Self {
            api_key,
            base_url: env::var("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string()),
            model: env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string()),
            timeout_seconds: env::var("DEEPSEEK_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub receiver: String,
}

impl SmtpConfig {
    fn from_env() -> Option<Self> {
        let server = env::var("SMTP_SERVER").ok()?;
        let username = env::var("SMTP_USERNAME").ok()?;
        let password = env::var("SMTP_PASSWORD").ok()?;
        let receiver = env::var("RECEIVER_EMAIL").ok()?;
        let port = env::var("SMTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(587);

        Some(Self {
            server,
            port,
            username,
            password,
            receiver,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramConfig {
    fn from_env() -> Option<Self> {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.is_empty() && t != "your_telegram_bot_token_here")?;
        let chat_id = env::var("TELEGRAM_CHAT_ID").ok()?;

        Some(Self { bot_token, chat_id })
    }
}

/// Process configuration, assembled once at startup and passed down
/// explicitly. Missing notification settings disable that channel rather
/// than failing the run.
#[derive(Debug, Clone)]
pub struct Config {
    pub feeds: Vec<String>,
    pub reports_dir: PathBuf,
    pub ranking: RankingConfig,
    pub smtp: Option<SmtpConfig>,
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        let feeds = env::var("CYBER_FEEDS")
            .ok()
            .map(|value| {
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|feeds| !feeds.is_empty())
            .unwrap_or_else(|| DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect());

        Self {
            feeds,
            reports_dir: env::var("REPORTS_DIR")
                .unwrap_or_else(|_| "reports".to_string())
                .into(),
            ranking: RankingConfig::from_env(),
            smtp: SmtpConfig::from_env(),
            telegram: TelegramConfig::from_env(),
        }
    }
}
