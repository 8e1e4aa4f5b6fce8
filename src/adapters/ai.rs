//! AI completion adapter (spec §4.3.2, §4.7): generates one reply message or
//! one vehicle description, under the dealership's configured caps. The
//! concrete model provider is external and out of scope (spec §1).

use super::{http_client, log_call, AdapterResult, HTTP_TIMEOUT};
use crate::db::Store;
use serde::{Deserialize, Serialize};

pub struct AiAdapter {
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyContext<'a> {
    pub history: &'a [(String, String)],
    pub vehicle_context: Option<&'a serde_json::Value>,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedReply {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedDescription {
    pub headline: String,
    pub subheadline: String,
    pub description: String,
}

impl AiAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        AiAdapter { base_url: base_url.into(), api_key: api_key.into() }
    }

    pub async fn generate_reply(
        &self,
        store: &Store,
        dealership_id: i64,
        ctx: &ReplyContext<'_>,
    ) -> AdapterResult<GeneratedReply> {
        let started = std::time::Instant::now();
        let client = http_client(HTTP_TIMEOUT);
        let url = format!("{}/completions/reply", self.base_url);
        let result = super::with_retry(|| {
            client.post(&url).bearer_auth(&self.api_key).json(ctx).send()
        })
        .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status().as_u16() as i32;
                match resp.json::<GeneratedReply>().await {
                    Ok(data) => {
                        log_call(store, Some(dealership_id), "ai", "generate_reply", true, Some(status), started, None);
                        AdapterResult::ok(data)
                    }
                    Err(e) => {
                        log_call(store, Some(dealership_id), "ai", "generate_reply", false, Some(status), started, Some(&e.to_string()));
                        AdapterResult::err(e.to_string(), "decode_failed")
                    }
                }
            }
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                log_call(store, Some(dealership_id), "ai", "generate_reply", false, Some(status), started, Some("non-success status"));
                AdapterResult::err(format!("AI provider returned status {status}"), "upstream_error")
            }
            Err(e) => {
                log_call(store, Some(dealership_id), "ai", "generate_reply", false, None, started, Some(&e.to_string()));
                AdapterResult::err(e.to_string(), "request_failed")
            }
        }
    }

    pub async fn generate_description(
        &self,
        store: &Store,
        dealership_id: i64,
        vehicle: &serde_json::Value,
    ) -> AdapterResult<GeneratedDescription> {
        let started = std::time::Instant::now();
        let client = http_client(HTTP_TIMEOUT);
        let url = format!("{}/completions/description", self.base_url);
        let result = super::with_retry(|| {
            client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({"vehicle": vehicle}))
                .send()
        })
        .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status().as_u16() as i32;
                match resp.json::<GeneratedDescription>().await {
                    Ok(data) => {
                        log_call(store, Some(dealership_id), "ai", "generate_description", true, Some(status), started, None);
                        AdapterResult::ok(data)
                    }
                    Err(e) => {
                        log_call(store, Some(dealership_id), "ai", "generate_description", false, Some(status), started, Some(&e.to_string()));
                        AdapterResult::err(e.to_string(), "decode_failed")
                    }
                }
            }
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                log_call(store, Some(dealership_id), "ai", "generate_description", false, Some(status), started, Some("non-success status"));
                AdapterResult::err(format!("AI provider returned status {status}"), "upstream_error")
            }
            Err(e) => {
                log_call(store, Some(dealership_id), "ai", "generate_description", false, None, started, Some(&e.to_string()));
                AdapterResult::err(e.to_string(), "request_failed")
            }
        }
    }
}
