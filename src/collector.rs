use crate::types::{ArticleRecord, ReporterError, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

const USER_AGENT: &str = "cyber-reporter/0.1";
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Trait for sources that contribute articles to a daily run.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch articles published at or after `cutoff`.
    async fn fetch(&self, cutoff: DateTime<Utc>) -> Result<Vec<ArticleRecord>>;
}

/// Shared HTTP client for feed polling and outbound notifications.
pub fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// An RSS/Atom feed polled over HTTP.
pub struct RssSource {
    url: String,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl RssSource {
    pub fn new(url: String, client: Client) -> Self {
        Self {
            url,
            client,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }

    async fn try_fetch(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ReporterError::Feed(format!(
                "HTTP {} from {}",
                status, self.url
            )));
        }

        Ok(response.text().await?)
    }

    async fn fetch_body(&self) -> Result<String> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.retry_delay,
            initial_interval: self.retry_delay,
            max_interval: self.retry_delay * 8,
            max_elapsed_time: Some(self.retry_delay * 30),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match self.try_fetch().await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(
                                "Attempt {} failed for {}, retrying in {:?}",
                                attempt + 1,
                                self.url,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ReporterError::General(format!("Failed to fetch {}", self.url))))
    }
}

#[async_trait]
impl ArticleSource for RssSource {
    fn source_name(&self) -> String {
        if let Ok(parsed) = Url::parse(&self.url) {
            if let Some(domain) = parsed.domain() {
                return domain.to_string();
            }
        }
        self.url.clone()
    }

    async fn fetch(&self, cutoff: DateTime<Utc>) -> Result<Vec<ArticleRecord>> {
        info!("Fetching from {}", self.url);

        let body = self.fetch_body().await?;
        let feed = parser::parse(body.as_bytes())
            .map_err(|e| ReporterError::Feed(format!("Failed to parse {}: {}", self.url, e)))?;

        let source_name = feed
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .unwrap_or_else(|| self.url.clone());

        let mut articles = Vec::new();

        for entry in feed.entries {
            // Entries without any timestamp can't be windowed, skip them.
            let Some(published_at) = entry.published.or(entry.updated) else {
                continue;
            };

            if published_at < cutoff {
                continue;
            }

            let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
                continue;
            };

            articles.push(ArticleRecord {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                link,
                description: entry.summary.map(|s| s.content).unwrap_or_default(),
                source: source_name.clone(),
                published_at,
            });
        }

        info!(
            "Collected {} articles from {}",
            articles.len(),
            source_name
        );
        Ok(articles)
    }
}

/// Pull every source once, concatenating the results. A failing source is
/// logged and omitted; the run continues with whatever the others return.
pub async fn collect_all(
    sources: &[Box<dyn ArticleSource>],
    cutoff: DateTime<Utc>,
) -> Vec<ArticleRecord> {
    let mut articles = Vec::new();

    for source in sources {
        match source.fetch(cutoff).await {
            Ok(items) => articles.extend(items),
            Err(e) => error!("Failed to collect from {}: {}", source.source_name(), e),
        }
    }

    info!(
        "Total articles fetched from last 24 hours: {}",
        articles.len()
    );
    articles
}
