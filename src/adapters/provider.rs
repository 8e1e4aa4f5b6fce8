//! The scraper fallback chain (spec §4.4, §9): one capability interface,
//! four implementations, tried in order. Swap the chain driver's list to add
//! a fifth provider — the driver in `inventory::scrape` never changes.

use super::{http_client, log_call, AdapterResult, BROWSER_TIMEOUT, HTTP_TIMEOUT};
use crate::db::Store;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    /// Relative cost unit for provider selection telemetry; headless
    /// providers cost far more than a plain HTTP fetch.
    pub cost: f64,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, store: &Store, dealership_id: i64, source_url: &str) -> AdapterResult<FetchedPage>;
}

pub struct ProviderA {
    base_url: String,
}

impl ProviderA {
    pub fn new(base_url: impl Into<String>) -> Self {
        ProviderA { base_url: base_url.into() }
    }
}

#[async_trait]
impl Provider for ProviderA {
    fn name(&self) -> &'static str {
        "provider_a"
    }

    async fn fetch(&self, store: &Store, dealership_id: i64, source_url: &str) -> AdapterResult<FetchedPage> {
        fetch_html(store, dealership_id, self.name(), &self.base_url, source_url).await
    }
}

pub struct ProviderB {
    base_url: String,
}

impl ProviderB {
    pub fn new(base_url: impl Into<String>) -> Self {
        ProviderB { base_url: base_url.into() }
    }
}

#[async_trait]
impl Provider for ProviderB {
    fn name(&self) -> &'static str {
        "provider_b"
    }

    async fn fetch(&self, store: &Store, dealership_id: i64, source_url: &str) -> AdapterResult<FetchedPage> {
        fetch_html(store, dealership_id, self.name(), &self.base_url, source_url).await
    }
}

async fn fetch_html(
    store: &Store,
    dealership_id: i64,
    name: &'static str,
    base_url: &str,
    source_url: &str,
) -> AdapterResult<FetchedPage> {
    let started = std::time::Instant::now();
    let client = http_client(HTTP_TIMEOUT);
    let result = super::with_retry(|| {
        client
            .get(base_url)
            .query(&[("url", source_url)])
            .send()
    })
    .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            let status = resp.status().as_u16() as i32;
            match resp.text().await {
                Ok(html) => {
                    log_call(store, Some(dealership_id), name, "fetch", true, Some(status), started, None);
                    AdapterResult::ok(FetchedPage { html, cost: 1.0 })
                }
                Err(e) => {
                    log_call(store, Some(dealership_id), name, "fetch", false, Some(status), started, Some(&e.to_string()));
                    AdapterResult::err(e.to_string(), "decode_failed")
                }
            }
        }
        Ok(resp) => {
            let status = resp.status().as_u16() as i32;
            log_call(store, Some(dealership_id), name, "fetch", false, Some(status), started, Some("non-success status"));
            AdapterResult::err(format!("upstream status {status}"), "upstream_error")
        }
        Err(e) => {
            log_call(store, Some(dealership_id), name, "fetch", false, None, started, Some(&e.to_string()));
            AdapterResult::err(e.to_string(), "request_failed")
        }
    }
}

/// Headless-browser provider run by a local browser-automation sidecar.
pub struct ProviderC {
    endpoint: String,
}

impl ProviderC {
    pub fn new(endpoint: impl Into<String>) -> Self {
        ProviderC { endpoint: endpoint.into() }
    }
}

#[async_trait]
impl Provider for ProviderC {
    fn name(&self) -> &'static str {
        "provider_c_headless_local"
    }

    async fn fetch(&self, store: &Store, dealership_id: i64, source_url: &str) -> AdapterResult<FetchedPage> {
        fetch_headless(store, dealership_id, self.name(), &self.endpoint, source_url).await
    }
}

/// Headless-browser provider run by a remote browser-automation pool.
pub struct ProviderD {
    endpoint: String,
}

impl ProviderD {
    pub fn new(endpoint: impl Into<String>) -> Self {
        ProviderD { endpoint: endpoint.into() }
    }
}

#[async_trait]
impl Provider for ProviderD {
    fn name(&self) -> &'static str {
        "provider_d_headless_remote"
    }

    async fn fetch(&self, store: &Store, dealership_id: i64, source_url: &str) -> AdapterResult<FetchedPage> {
        fetch_headless(store, dealership_id, self.name(), &self.endpoint, source_url).await
    }
}

async fn fetch_headless(
    store: &Store,
    dealership_id: i64,
    name: &'static str,
    endpoint: &str,
    source_url: &str,
) -> AdapterResult<FetchedPage> {
    let started = std::time::Instant::now();
    let client = http_client(BROWSER_TIMEOUT);
    let result = super::with_retry(|| {
        client
            .post(endpoint)
            .json(&serde_json::json!({"url": source_url}))
            .send()
    })
    .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            let status = resp.status().as_u16() as i32;
            match resp.json::<serde_json::Value>().await {
                Ok(body) => {
                    let html = body.get("html").and_then(|v| v.as_str()).unwrap_or("").to_string();
                    log_call(store, Some(dealership_id), name, "fetch", true, Some(status), started, None);
                    AdapterResult::ok(FetchedPage { html, cost: 10.0 })
                }
                Err(e) => {
                    log_call(store, Some(dealership_id), name, "fetch", false, Some(status), started, Some(&e.to_string()));
                    AdapterResult::err(e.to_string(), "decode_failed")
                }
            }
        }
        Ok(resp) => {
            let status = resp.status().as_u16() as i32;
            log_call(store, Some(dealership_id), name, "fetch", false, Some(status), started, Some("non-success status"));
            AdapterResult::err(format!("upstream status {status}"), "upstream_error")
        }
        Err(e) => {
            log_call(store, Some(dealership_id), name, "fetch", false, None, started, Some(&e.to_string()));
            AdapterResult::err(e.to_string(), "request_failed")
        }
    }
}
