use crate::store::{ReportStore, DATE_FORMAT};
use crate::types::{Report, StoreError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReportStore>,
}

/// Read-only query surface over the report store. Reports are produced only
/// by the pipeline; no write routes exist.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reports", get(list_reports))
        .route("/reports/:date", get(get_report))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(store: Arc<ReportStore>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(AppState { store });

    info!("Starting report server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("Store error while serving request: {}", err);
        ApiError::Internal(err.to_string())
    }
}

#[derive(Serialize)]
struct ReportList {
    reports: Vec<String>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_reports(State(state): State<AppState>) -> Result<Json<ReportList>, ApiError> {
    let reports = state
        .store
        .list_dates()?
        .iter()
        .map(|date| date.format(DATE_FORMAT).to_string())
        .collect();

    Ok(Json(ReportList { reports }))
}

async fn get_report(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|_| ApiError::NotFound(format!("{} is not a report date", date)))?;

    match state.store.get(date)? {
        Some(report) => Ok(Json(report)),
        None => Err(ApiError::NotFound(format!(
            "No report for {}",
            date.format(DATE_FORMAT)
        ))),
    }
}
