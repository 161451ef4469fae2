use crate::analyzer::Analyzer;
use crate::collector::{collect_all, ArticleSource};
use crate::notifier::{publish_all, Publisher};
use crate::store::ReportStore;
use crate::types::{Report, Result};
use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, warn};

/// One end-to-end run: collect the trailing 24 hours of news, rank it,
/// persist the report, hand it to the publishers.
///
/// Returns `None` when the collectors yield nothing at all; in that case no
/// report is persisted for the date. A non-empty collection that ranks to
/// nothing still persists an empty report, so "ran but found nothing" stays
/// distinguishable from "never ran".
pub async fn run_once(
    sources: &[Box<dyn ArticleSource>],
    analyzer: &Analyzer,
    store: &ReportStore,
    publishers: &[Box<dyn Publisher>],
    date: NaiveDate,
) -> Result<Option<Report>> {
    let cutoff = Utc::now() - Duration::days(1);

    let articles = collect_all(sources, cutoff).await;
    if articles.is_empty() {
        info!("No articles found in the last 24 hours, nothing to rank");
        return Ok(None);
    }

    let report = analyzer.synthesize(date, &articles).await;
    if report.ranked_attacks.is_empty() {
        warn!(
            "Ranking produced no attacks from {} articles, persisting empty report",
            articles.len()
        );
    }

    store.put(&report)?;
    publish_all(publishers, &report).await;

    Ok(Some(report))
}
