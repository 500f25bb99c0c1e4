use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
};

use ohanami_core::report::parse_report_payload;
use ohanami_core::{OhanamiError, Result};

use crate::WebState;
use crate::dto::{DatabaseHealthResponse, ReportsQuery, ReportsResponse};
use crate::error::ohanami_error_response;

const DEFAULT_REPORTS_LIMIT: usize = 10;

// rusqlite calls block, so they run on the blocking pool.
async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| OhanamiError::Internal(format!("store task failed: {err}")))?
}

pub async fn ingest_report(State(state): State<WebState>, body: Bytes) -> Response {
    let doc = match std::str::from_utf8(&body)
        .map_err(|err| OhanamiError::Validation(format!("report body is not UTF-8: {err}")))
        .and_then(parse_report_payload)
    {
        Ok(doc) => doc,
        Err(err) => return ohanami_error_response(err, "report.ingest"),
    };

    let store = state.store.clone();
    let provider = state.provider.clone();
    match run_blocking(move || store.persist(&doc, &provider)).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => ohanami_error_response(err, "report.ingest"),
    }
}

pub async fn list_reports(
    State(state): State<WebState>,
    Query(query): Query<ReportsQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_REPORTS_LIMIT);
    if limit == 0 {
        return ohanami_error_response(
            OhanamiError::Validation("limit must be >= 1".to_string()),
            "reports.list",
        );
    }

    let store = state.store.clone();
    match run_blocking(move || store.latest_reports(limit)).await {
        Ok(reports) => Json(ReportsResponse {
            count: reports.len(),
            reports,
        })
        .into_response(),
        Err(err) => ohanami_error_response(err, "reports.list"),
    }
}

pub async fn database_health(State(state): State<WebState>) -> Response {
    let store = state.store.clone();
    match run_blocking(move || store.latest_reports(1)).await {
        Ok(reports) => Json(DatabaseHealthResponse {
            status: "ok",
            database: "sqlite",
            latest_reports_count: reports.len(),
        })
        .into_response(),
        Err(err) => ohanami_error_response(err, "health.database"),
    }
}
