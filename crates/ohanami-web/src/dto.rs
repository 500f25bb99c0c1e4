use serde::{Deserialize, Serialize};

use ohanami_core::models::StoredReportSummary;

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub count: usize,
    pub reports: Vec<StoredReportSummary>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub latest_reports_count: usize,
}
