use rusqlite::ErrorCode;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, OhanamiError>;

#[derive(Debug, Error)]
pub enum OhanamiError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistFailureKind {
    Connectivity,
    Constraint,
    Unknown,
}

impl PersistFailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::Constraint => "constraint",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Connectivity)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl OhanamiError {
    pub(crate) fn mutex_poisoned(name: &str) -> Self {
        Self::Internal(format!("{name} mutex poisoned"))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Sqlite(_) => "SQLITE_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub fn persist_failure_kind(&self) -> PersistFailureKind {
        match self {
            Self::Sqlite(err) => classify_sqlite_error(err),
            Self::Io(_) => PersistFailureKind::Connectivity,
            Self::Http(err) if err.is_timeout() || err.is_connect() => {
                PersistFailureKind::Connectivity
            }
            _ => PersistFailureKind::Unknown,
        }
    }

    pub fn to_payload(&self, operation: impl Into<String>) -> ErrorPayload {
        let retryable = match self {
            Self::Sqlite(_) | Self::Io(_) | Self::Http(_) => {
                Some(self.persist_failure_kind().is_retryable())
            }
            _ => None,
        };
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            retryable,
            details: None,
        }
    }
}

fn classify_sqlite_error(err: &rusqlite::Error) -> PersistFailureKind {
    match err.sqlite_error_code() {
        Some(
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::FileLockingProtocolFailed,
        ) => PersistFailureKind::Connectivity,
        Some(ErrorCode::ConstraintViolation) => PersistFailureKind::Constraint,
        _ => PersistFailureKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: ErrorCode) -> OhanamiError {
        let extended = match code {
            ErrorCode::DatabaseBusy => 5,
            ErrorCode::ConstraintViolation => 19,
            _ => 1,
        };
        OhanamiError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code,
                extended_code: extended,
            },
            None,
        ))
    }

    #[test]
    fn busy_database_is_retryable_connectivity() {
        let kind = sqlite_failure(ErrorCode::DatabaseBusy).persist_failure_kind();
        assert_eq!(kind, PersistFailureKind::Connectivity);
        assert!(kind.is_retryable());
    }

    #[test]
    fn constraint_violation_is_not_retryable() {
        let kind = sqlite_failure(ErrorCode::ConstraintViolation).persist_failure_kind();
        assert_eq!(kind, PersistFailureKind::Constraint);
        assert!(!kind.is_retryable());
    }

    #[test]
    fn validation_errors_are_unknown_for_persistence() {
        let err = OhanamiError::Validation("bad".to_string());
        assert_eq!(err.persist_failure_kind(), PersistFailureKind::Unknown);
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(err.to_payload("persist").retryable.is_none());
    }

    #[test]
    fn codes_cover_every_constructed_variant() {
        assert_eq!(
            OhanamiError::PermissionDenied("token".to_string()).code(),
            "PERMISSION_DENIED"
        );
        assert_eq!(OhanamiError::mutex_poisoned("sqlite").code(), "INTERNAL_ERROR");
    }
}
