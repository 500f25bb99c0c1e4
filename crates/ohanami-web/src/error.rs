use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use ohanami_core::OhanamiError;

#[expect(
    clippy::needless_pass_by_value,
    reason = "handlers naturally own error values from `Result` and pass them through"
)]
pub fn ohanami_error_response(err: OhanamiError, operation: &str) -> Response {
    let status = status_for_ohanami_error(&err);
    let mut payload = err.to_payload(operation);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        payload.details = Some(json!({
            "persist_failure_kind": err.persist_failure_kind().as_str(),
        }));
        tracing::error!(operation, code = err.code(), error = %err, "request failed");
    }
    (status, Json(payload)).into_response()
}

fn status_for_ohanami_error(err: &OhanamiError) -> StatusCode {
    match err {
        OhanamiError::Validation(_) | OhanamiError::Json(_) => StatusCode::BAD_REQUEST,
        OhanamiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        OhanamiError::Io(_)
        | OhanamiError::Sqlite(_)
        | OhanamiError::Http(_)
        | OhanamiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
