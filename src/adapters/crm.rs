//! CRM adapter (spec §4.3, §4.7): find-or-create contact, conversation, and
//! outbound send. The concrete CRM is external and out of scope (spec §1);
//! this client only knows the shape of its API.

use super::{http_client, log_call, AdapterResult, HTTP_TIMEOUT};
use crate::db::Store;
use serde::{Deserialize, Serialize};

pub struct CrmAdapter {
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmContact {
    pub contact_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmSendResult {
    pub message_id: String,
}

impl CrmAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        CrmAdapter { base_url: base_url.into(), api_key: api_key.into() }
    }

    pub async fn find_or_create_contact(
        &self,
        store: &Store,
        dealership_id: i64,
        name: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> AdapterResult<CrmContact> {
        let started = std::time::Instant::now();
        let client = http_client(HTTP_TIMEOUT);
        let url = format!("{}/contacts/find-or-create", self.base_url);
        let result = super::with_retry(|| {
            client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({"name": name, "phone": phone, "email": email}))
                .send()
        })
        .await;
        self.finish(store, dealership_id, "find_or_create_contact", started, result).await
    }

    pub async fn get_or_create_conversation(
        &self,
        store: &Store,
        dealership_id: i64,
        contact_id: &str,
        channel: &str,
    ) -> AdapterResult<serde_json::Value> {
        let started = std::time::Instant::now();
        let client = http_client(HTTP_TIMEOUT);
        let url = format!("{}/conversations/find-or-create", self.base_url);
        let result = super::with_retry(|| {
            client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({"contactId": contact_id, "channel": channel}))
                .send()
        })
        .await;
        self.finish(store, dealership_id, "get_or_create_conversation", started, result).await
    }

    pub async fn send_message(
        &self,
        store: &Store,
        dealership_id: i64,
        conversation_id: &str,
        body: &str,
    ) -> AdapterResult<CrmSendResult> {
        let started = std::time::Instant::now();
        let client = http_client(HTTP_TIMEOUT);
        let url = format!("{}/conversations/{conversation_id}/messages", self.base_url);
        let result = super::with_retry(|| {
            client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({"body": body}))
                .send()
        })
        .await;
        self.finish(store, dealership_id, "send_message", started, result).await
    }

    async fn finish<T: serde::de::DeserializeOwned>(
        &self,
        store: &Store,
        dealership_id: i64,
        operation: &str,
        started: std::time::Instant,
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> AdapterResult<T> {
        match result {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status().as_u16() as i32;
                match resp.json::<T>().await {
                    Ok(data) => {
                        log_call(store, Some(dealership_id), "crm", operation, true, Some(status), started, None);
                        AdapterResult::ok(data)
                    }
                    Err(e) => {
                        log_call(store, Some(dealership_id), "crm", operation, false, Some(status), started, Some(&e.to_string()));
                        AdapterResult::err(e.to_string(), "decode_failed")
                    }
                }
            }
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                log_call(store, Some(dealership_id), "crm", operation, false, Some(status), started, Some("non-success status"));
                AdapterResult::err(format!("CRM returned status {status}"), "upstream_error")
            }
            Err(e) => {
                log_call(store, Some(dealership_id), "crm", operation, false, None, started, Some(&e.to_string()));
                AdapterResult::err(e.to_string(), "request_failed")
            }
        }
    }
}
