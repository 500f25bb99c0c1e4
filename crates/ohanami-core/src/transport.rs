use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::config::TransportConfig;
use crate::error::{OhanamiError, Result};
use crate::models::ReportDocument;
use crate::report::COLLECTOR_VERSION;

const RESPONSE_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Skipped { reason: &'static str },
    Delivered { status: u16 },
    Rejected { status: u16, body: String },
}

#[derive(Clone)]
pub struct ReportSender {
    endpoint: Option<String>,
    http: Option<Client>,
}

impl std::fmt::Debug for ReportSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportSender")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ReportSender {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self {
                endpoint: None,
                http: None,
            });
        }

        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&format!("Ohanami-Reporter/{COLLECTOR_VERSION}"))
            .map_err(|e| OhanamiError::Internal(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);
        if let Some(token) = &config.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| OhanamiError::Validation(format!("invalid OHANAMI_AUTH_TOKEN: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            http: Some(http),
        })
    }

    pub fn send(&self, doc: &ReportDocument) -> Result<SendOutcome> {
        let Some(http) = &self.http else {
            return Ok(SendOutcome::Skipped {
                reason: "sending disabled",
            });
        };
        let Some(endpoint) = &self.endpoint else {
            tracing::info!("no report endpoint configured; skipping send");
            return Ok(SendOutcome::Skipped {
                reason: "no endpoint configured",
            });
        };

        let resp = http.post(endpoint).json(doc).send()?;
        let status = resp.status();
        if status.is_success() {
            tracing::info!(status = status.as_u16(), %endpoint, "report delivered");
            return Ok(SendOutcome::Delivered {
                status: status.as_u16(),
            });
        }

        let body = resp.text().unwrap_or_default();
        let body: String = body.trim().chars().take(RESPONSE_EXCERPT_CHARS).collect();
        tracing::warn!(status = status.as_u16(), %endpoint, %body, "report rejected by endpoint");
        Ok(SendOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
