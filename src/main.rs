use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use cyber_reporter::{
    analyzer::{Analyzer, DeepSeekBackend},
    collector::{http_client, ArticleSource, RssSource},
    config::Config,
    notifier::{render_html, EmailPublisher, Publisher, TelegramPublisher},
    pipeline, server,
    store::ReportStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "cyber-reporter",
    about = "Daily cyber attack reporter and lesson generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daily collection and ranking pipeline once
    Run {
        /// Render the report locally instead of publishing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Serve stored reports over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0:8001")]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Run { dry_run } => run(config, dry_run).await,
        Command::Serve { addr } => {
            let store = Arc::new(ReportStore::open(&config.reports_dir)?);
            server::serve(store, addr).await
        }
    }
}

async fn run(config: Config, dry_run: bool) -> anyhow::Result<()> {
    info!("Starting daily cyber attack reporter");

    if config.ranking.api_key.is_none() {
        bail!("Valid DEEPSEEK_API_KEY is required to proceed");
    }

    let client = http_client(Duration::from_secs(30));

    let sources: Vec<Box<dyn ArticleSource>> = config
        .feeds
        .iter()
        .map(|url| Box::new(RssSource::new(url.clone(), client.clone())) as Box<dyn ArticleSource>)
        .collect();

    let analyzer = Analyzer::new(Box::new(DeepSeekBackend::new(config.ranking.clone())));
    let store = ReportStore::open(&config.reports_dir)?;

    let mut publishers: Vec<Box<dyn Publisher>> = Vec::new();
    if dry_run {
        info!("Dry run mode enabled, skipping publishers");
    } else {
        match config.smtp {
            Some(smtp) => publishers.push(Box::new(EmailPublisher::new(smtp))),
            None => warn!("Missing SMTP environment variables, email report disabled"),
        }
        match config.telegram {
            Some(telegram) => {
                publishers.push(Box::new(TelegramPublisher::new(telegram, client.clone())))
            }
            None => warn!("Missing Telegram environment variables, Telegram message disabled"),
        }
    }

    let today = Utc::now().date_naive();
    let report = pipeline::run_once(&sources, &analyzer, &store, &publishers, today).await?;

    match report {
        None => info!("No report produced for {}", today),
        Some(report) if dry_run => {
            std::fs::write("dry_run_report.html", render_html(&report))?;
            info!("Dry run HTML report saved to dry_run_report.html");

            println!("\n--- DRY RUN SUMMARY ---");
            for attack in &report.ranked_attacks {
                println!("{}. {}", attack.rank, attack.title);
            }
            println!("-----------------------");
        }
        Some(_) => info!("Process completed successfully"),
    }

    Ok(())
}
