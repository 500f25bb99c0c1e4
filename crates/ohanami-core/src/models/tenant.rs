use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const PRIMARY_TENANT_ID: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantKind {
    Single,
    MultiPrimary,
    MultiSecondary,
}

impl TenantKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::MultiPrimary => "multi_primary",
            Self::MultiSecondary => "multi_secondary",
        }
    }

    #[must_use]
    pub const fn is_multisite(self) -> bool {
        !matches!(self, Self::Single)
    }

    #[must_use]
    pub const fn for_listed_id(id: u64) -> Self {
        if id == PRIMARY_TENANT_ID {
            Self::MultiPrimary
        } else {
            Self::MultiSecondary
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDescriptor {
    pub root: PathBuf,
    pub id: u64,
    pub kind: TenantKind,
    pub url: Option<String>,
}

impl TenantDescriptor {
    #[must_use]
    pub fn single(root: impl Into<PathBuf>, url: Option<String>) -> Self {
        Self {
            root: root.into(),
            id: PRIMARY_TENANT_ID,
            kind: TenantKind::Single,
            url,
        }
    }

    #[must_use]
    pub fn to_ref(&self) -> TenantRef {
        TenantRef {
            id: self.id,
            kind: self.kind,
            url: self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRef {
    pub id: u64,
    pub kind: TenantKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
