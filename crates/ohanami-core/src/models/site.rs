use serde::{Deserialize, Serialize};

use super::tenant::TenantRef;

pub const UNKNOWN_EXTENSION_NAME: &str = "unknown";
pub const DEFAULT_LANGUAGE: &str = "en_US";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    #[default]
    Complete,
    Partial,
    Fallback,
    Failed,
}

impl CollectionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Fallback => "fallback",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "unknown_name")]
    pub status: String,
    #[serde(default = "no_update")]
    pub update: String,
    #[serde(default = "auto_update_off")]
    pub auto_update: String,
}

pub type PluginInfo = ExtensionInfo;
pub type ThemeInfo = ExtensionInfo;

impl ExtensionInfo {
    #[must_use]
    pub fn from_tool_value(value: &serde_json::Value) -> Self {
        Self {
            name: string_field(value, "name").unwrap_or_else(unknown_name),
            version: string_field(value, "version"),
            status: string_field(value, "status").unwrap_or_else(unknown_name),
            update: string_field(value, "update").unwrap_or_else(no_update),
            auto_update: string_field(value, "auto_update").unwrap_or_else(auto_update_off),
        }
    }

    #[must_use]
    pub fn update_available(&self) -> bool {
        self.update == "available"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreInfo {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub is_multisite: bool,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for CoreInfo {
    fn default() -> Self {
        Self {
            version: None,
            is_multisite: false,
            language: default_language(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantRef>,
    #[serde(default)]
    pub core: CoreInfo,
    #[serde(default)]
    pub database: DatabaseInfo,
    #[serde(default)]
    pub plugins: Vec<PluginInfo>,
    #[serde(default)]
    pub themes: Vec<ThemeInfo>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub status: CollectionStatus,
}

impl SiteRecord {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            tenant: None,
            core: CoreInfo::default(),
            database: DatabaseInfo::default(),
            plugins: Vec::new(),
            themes: Vec::new(),
            errors: Vec::new(),
            status: CollectionStatus::Complete,
        }
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }
}

fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::String(raw) => Some(raw.clone()),
        serde_json::Value::Number(raw) => Some(raw.to_string()),
        serde_json::Value::Bool(raw) => Some(raw.to_string()),
        _ => None,
    }
}

fn unknown_name() -> String {
    UNKNOWN_EXTENSION_NAME.to_string()
}

fn no_update() -> String {
    "none".to_string()
}

fn auto_update_off() -> String {
    "off".to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_defaults_fill_missing_tool_fields() {
        let info = ExtensionInfo::from_tool_value(&serde_json::json!({"version": "1.0"}));
        assert_eq!(info.name, UNKNOWN_EXTENSION_NAME);
        assert_eq!(info.version.as_deref(), Some("1.0"));
        assert_eq!(info.update, "none");
        assert_eq!(info.auto_update, "off");
        assert!(!info.update_available());
    }

    #[test]
    fn site_record_deserializes_with_only_path() {
        let site: SiteRecord =
            serde_json::from_value(serde_json::json!({"path": "/srv/www/a"})).expect("site");
        assert_eq!(site.path, "/srv/www/a");
        assert_eq!(site.core.language, DEFAULT_LANGUAGE);
        assert_eq!(site.status, CollectionStatus::Complete);
        assert!(site.plugins.is_empty());
    }
}
