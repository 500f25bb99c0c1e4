use std::path::PathBuf;

use axum::{
    Router,
    body::{Body, to_bytes},
    response::Response,
};

use ohanami_core::config::SinkConfig;

use crate::{WebState, app_router};

pub(super) const TOKEN: &str = "s3cret-token";

pub(super) const REPORT: &str = r#"{"report":{"metadata":{"version":"0.3.0","timestamp":"2024-05-01T18:30:00+09:00","hostname":"web01","user":"deploy","working_directory":"/home/deploy"},"environment":{"os":"linux","php":{"version":"8.2.12","sapi":"cli"}},"wordpress":{"sites":[{"path":"/home/deploy/www/site","core":{"version":"6.4.2"},"plugins":[{"name":"akismet","version":"5.3","status":"active","update":"none"}],"themes":[]}]}}}"#;

pub(super) struct TestHarness {
    _temp: tempfile::TempDir,
    pub(super) db_path: PathBuf,
    pub(super) state: WebState,
    pub(super) router: Router,
}

impl TestHarness {
    pub(super) fn setup() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let db_path = temp.path().join("sink").join("reports.db");
        let state = WebState::from_config(&SinkConfig {
            db_path: db_path.clone(),
            provider: "sakura".to_string(),
            auth_token: Some(TOKEN.to_string()),
        })
        .expect("web state");
        let router = app_router(state.clone());
        Self {
            _temp: temp,
            db_path,
            state,
            router,
        }
    }
}

pub(super) async fn decode_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body bytes");
    serde_json::from_slice(&bytes).expect("decode json")
}

pub(super) fn header_value<'a>(headers: &'a axum::http::HeaderMap, key: &str) -> Option<&'a str> {
    headers.get(key).and_then(|value| value.to_str().ok())
}

pub(super) fn authorized(method: &str, path: &str, body: impl Into<Body>) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(path)
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .body(body.into())
        .expect("authorized request")
}
