//! Browser-automation adapter (spec §4.5, §4.7): delegates the actual posting
//! to an external controlled-browser service. This process never owns a
//! long-lived browser session itself (spec §1 Non-goals).

use super::{log_call, AdapterResult, BROWSER_TIMEOUT};
use crate::db::Store;
use serde::{Deserialize, Serialize};

pub struct BrowserAutomationAdapter {
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostListingRequest<'a> {
    pub vehicle: &'a serde_json::Value,
    pub images: &'a [String],
    pub description: &'a str,
    pub session_cookies: &'a str,
    pub platform: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostListingResponse {
    pub listing_url: Option<String>,
}

impl BrowserAutomationAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        BrowserAutomationAdapter { base_url: base_url.into(), api_key: api_key.into() }
    }

    pub async fn post_listing(
        &self,
        store: &Store,
        dealership_id: i64,
        req: &PostListingRequest<'_>,
    ) -> AdapterResult<PostListingResponse> {
        let started = std::time::Instant::now();
        let client = super::http_client(BROWSER_TIMEOUT);
        let url = format!("{}/post", self.base_url);
        let result = super::with_retry(|| {
            client.post(&url).bearer_auth(&self.api_key).json(req).send()
        })
        .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status().as_u16() as i32;
                match resp.json::<PostListingResponse>().await {
                    Ok(data) => {
                        log_call(store, Some(dealership_id), "browser_automation", "post_listing", true, Some(status), started, None);
                        AdapterResult::ok(data)
                    }
                    Err(e) => {
                        log_call(store, Some(dealership_id), "browser_automation", "post_listing", false, Some(status), started, Some(&e.to_string()));
                        AdapterResult::err(e.to_string(), "decode_failed")
                    }
                }
            }
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                log_call(store, Some(dealership_id), "browser_automation", "post_listing", false, Some(status), started, Some("non-success status"));
                AdapterResult::err(format!("browser service returned status {status}"), "upstream_error")
            }
            Err(e) => {
                log_call(store, Some(dealership_id), "browser_automation", "post_listing", false, None, started, Some(&e.to_string()));
                AdapterResult::err(e.to_string(), "request_failed")
            }
        }
    }
}
