pub mod analyzer;
pub mod collector;
pub mod config;
pub mod notifier;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod types;

pub use analyzer::{Analyzer, DeepSeekBackend, RankingBackend};
pub use collector::{collect_all, http_client, ArticleSource, RssSource};
pub use config::Config;
pub use notifier::{render_html, EmailPublisher, Publisher, TelegramPublisher};
pub use pipeline::run_once;
pub use server::{create_router, AppState};
pub use store::ReportStore;
pub use types::*;
