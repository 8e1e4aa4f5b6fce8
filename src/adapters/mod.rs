//! External adapters (C7, spec §4.7): thin typed clients for the CRM, AI,
//! scrape providers, blob store, email, and browser automation. Every
//! adapter returns this uniform result instead of throwing, logs one
//! `api_logs` row per call, and retries 429/5xx with backoff.

pub mod ai;
pub mod blob;
pub mod browser_automation;
pub mod crm;
pub mod email;
pub mod provider;

use crate::db::Store;
use serde::Serialize;
use std::time::Duration;

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
pub const BROWSER_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct AdapterResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> AdapterResult<T> {
    pub fn ok(data: T) -> Self {
        AdapterResult { success: true, data: Some(data), error: None, error_code: None }
    }

    pub fn err(error: impl Into<String>, code: &str) -> Self {
        AdapterResult {
            success: false,
            data: None,
            error: Some(error.into()),
            error_code: Some(code.to_string()),
        }
    }
}

pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("failed to build HTTP client")
}

/// Call `attempt` up to `MAX_ATTEMPTS` times, backing off on a retryable
/// response (429 or 5xx), honoring `Retry-After` when present (spec §4.7).
pub async fn with_retry<F, Fut>(mut attempt: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut last_err = None;
    for try_n in 0..MAX_ATTEMPTS {
        match attempt().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_server_error() || status.as_u16() == 429 {
                    let retry_after = resp
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or_else(|| 2u64.pow(try_n));
                    if try_n + 1 < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(retry_after)).await;
                        continue;
                    }
                    return Ok(resp);
                }
                return Ok(resp);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.expect("loop always runs at least once"))
}

/// Every adapter call writes one `api_logs` row (spec §4.7), win or lose.
pub fn log_call(
    store: &Store,
    dealership_id: Option<i64>,
    adapter: &str,
    operation: &str,
    success: bool,
    status_code: Option<i32>,
    started_at: std::time::Instant,
    error: Option<&str>,
) {
    let latency_ms = started_at.elapsed().as_millis() as i64;
    let now = chrono::Utc::now().to_rfc3339();
    crate::store::api_logs::record(
        store, dealership_id, adapter, operation, success, status_code, latency_ms, error, &now,
    );
}
