mod persist;
mod report;
mod site;
mod tenant;

pub use persist::{PersistResult, PersistedSite, StoredReportSummary};
pub use report::{
    EnvironmentFacts, HostIdentity, MysqlInfo, PhpInfo, ReportBody, ReportDocument,
    ReportMetadata, WordPressSection, WpCliInfo,
};
pub use site::{
    CollectionStatus, CoreInfo, DatabaseInfo, ExtensionInfo, PluginInfo, SiteRecord, ThemeInfo,
    UNKNOWN_EXTENSION_NAME,
};
pub use tenant::{PRIMARY_TENANT_ID, TenantDescriptor, TenantKind, TenantRef};
