use serde::{Deserialize, Serialize};

use super::site::SiteRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub report: ReportBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBody {
    pub metadata: ReportMetadata,
    #[serde(default)]
    pub environment: EnvironmentFacts,
    pub wordpress: WordPressSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub version: String,
    pub timestamp: String,
    pub hostname: String,
    pub user: String,
    #[serde(default)]
    pub working_directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub sapi: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MysqlInfo {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WpCliInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    pub hostname: String,
    pub user: String,
    pub working_directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFacts {
    #[serde(default)]
    pub php: PhpInfo,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub server_software: Option<String>,
    #[serde(default)]
    pub mysql: MysqlInfo,
    #[serde(default)]
    pub wpcli: WpCliInfo,
    #[serde(skip)]
    pub host: HostIdentity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPressSection {
    #[serde(default)]
    pub sites: Vec<SiteRecord>,
}
