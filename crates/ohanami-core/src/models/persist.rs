use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSite {
    pub site_id: i64,
    pub path: String,
    pub plugins_count: usize,
    pub themes_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistResult {
    pub report_id: i64,
    pub server_id: i64,
    pub server_info: String,
    pub sites_count: usize,
    pub sites: Vec<PersistedSite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReportSummary {
    pub id: i64,
    pub execution_time: String,
    pub sites_count: i64,
    pub status: String,
    pub hostname: String,
    pub username: String,
    pub display_name: String,
}
