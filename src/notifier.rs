use crate::config::{SmtpConfig, TelegramConfig};
use crate::types::{Report, ReporterError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use tracing::{info, warn};

/// Trait for channels that deliver a finished report to humans.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> String;

    async fn publish(&self, report: &Report) -> Result<()>;
}

/// Hand the report to every configured channel. Delivery failures are logged
/// and absorbed; publishing must never fail the run that produced the report.
pub async fn publish_all(publishers: &[Box<dyn Publisher>], report: &Report) {
    for publisher in publishers {
        match publisher.publish(report).await {
            Ok(()) => info!("Published report via {}", publisher.name()),
            Err(e) => warn!("Publisher {} failed: {}", publisher.name(), e),
        }
    }
}

/// Render a report as a self-contained HTML document: one table of ranked
/// attacks followed by a section per teaching lesson.
pub fn render_html(report: &Report) -> String {
    if report.ranked_attacks.is_empty() {
        return "<p>No significant cyber attacks were found in today's news.</p>".to_string();
    }

    let mut html = String::from("<html><body>");
    html.push_str("<h2>Daily Top 10 Cyber Attacks Report</h2>");

    html.push_str("<table border='1' cellpadding='5' cellspacing='0'>");
    html.push_str(
        "<tr style='background-color:#f2f2f2'><th>Rank</th><th>Title</th><th>Source</th><th>Summary</th></tr>",
    );
    for attack in &report.ranked_attacks {
        html.push_str("<tr>");
        html.push_str(&format!("<td>{}</td>", attack.rank));
        html.push_str(&format!(
            "<td><a href='{}'>{}</a></td>",
            attack.link, attack.title
        ));
        html.push_str(&format!("<td>{}</td>", attack.source));
        html.push_str(&format!("<td>{}</td>", attack.summary));
        html.push_str("</tr>");
    }
    html.push_str("</table><br><br>");

    if !report.lessons.is_empty() {
        html.push_str("<h2>Teaching Lessons for Top 2 Attacks</h2>");
    }
    for lesson in &report.lessons {
        html.push_str("<div style='border:1px solid #ccc; padding:10px; margin-bottom:15px;'>");
        html.push_str(&format!(
            "<h3>Rank #{} - {}</h3>",
            lesson.rank, lesson.title
        ));

        html.push_str("<h4>Learning Objectives:</h4><ul>");
        for objective in &lesson.learning_objectives {
            html.push_str(&format!("<li>{}</li>", objective));
        }
        html.push_str("</ul>");

        html.push_str(&format!(
            "<h4>Real-World Impact:</h4><p>{}</p>",
            lesson.real_world_impact
        ));

        html.push_str("<h4>Mitigation Strategies:</h4><ul>");
        for strategy in &lesson.mitigation_strategies {
            html.push_str(&format!("<li>{}</li>", strategy));
        }
        html.push_str("</ul>");

        html.push_str("<h4>Discussion Questions:</h4><ul>");
        for question in &lesson.discussion_questions {
            html.push_str(&format!("<li>{}</li>", question));
        }
        html.push_str("</ul>");

        html.push_str("</div>");
    }

    html.push_str("</body></html>");
    html
}

/// Delivers the HTML report over authenticated SMTP.
pub struct EmailPublisher {
    config: SmtpConfig,
}

impl EmailPublisher {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Publisher for EmailPublisher {
    fn name(&self) -> String {
        format!("email ({})", self.config.receiver)
    }

    async fn publish(&self, report: &Report) -> Result<()> {
        let message = Message::builder()
            .from(self
                .config
                .username
                .parse()
                .map_err(|e| ReporterError::Mail(format!("Invalid sender address: {}", e)))?)
            .to(self
                .config
                .receiver
                .parse()
                .map_err(|e| ReporterError::Mail(format!("Invalid receiver address: {}", e)))?)
            .subject("Daily Cyber Attack Report & Teaching Lessons")
            .header(ContentType::TEXT_HTML)
            .body(render_html(report))
            .map_err(|e| ReporterError::Mail(e.to_string()))?;

        info!(
            "Connecting to SMTP server {}:{}...",
            self.config.server, self.config.port
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.server)
            .map_err(|e| ReporterError::Mail(e.to_string()))?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build();

        transport
            .send(message)
            .await
            .map_err(|e| ReporterError::Mail(e.to_string()))?;

        info!("Report successfully sent to {}", self.config.receiver);
        Ok(())
    }
}

/// Posts a short Markdown summary through the Telegram Bot API.
pub struct TelegramPublisher {
    config: TelegramConfig,
    client: Client,
}

impl TelegramPublisher {
    pub fn new(config: TelegramConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn summary_text(report: &Report) -> String {
        let mut message = String::from("🚨 *Daily Cyber Attack Report* 🚨\n\n");

        if report.ranked_attacks.is_empty() {
            message.push_str("No significant cyber attacks were found in today's news.");
            return message;
        }

        message.push_str(&format!(
            "Found {} critical threats today.\n\n*Top 3 Threats:*\n",
            report.ranked_attacks.len()
        ));
        for (i, attack) in report.ranked_attacks.iter().take(3).enumerate() {
            message.push_str(&format!("{}. [{}]({})\n", i + 1, attack.title, attack.link));
        }

        message.push_str("\n*Lessons Generated:* ");
        message.push_str(if report.lessons.is_empty() {
            "No ❌\n"
        } else {
            "Yes ✅\n"
        });
        message.push_str(
            "\nDashboard updated. Please check the Web UI or your email for the full report and teaching lessons!",
        );

        message
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn name(&self) -> String {
        "telegram".to_string()
    }

    async fn publish(&self, report: &Report) -> Result<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.config.bot_token
        );
        let payload = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": Self::summary_text(report),
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        self.client
            .post(url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
