//! Email delivery adapter (spec §1, §4.3): the generic fallback sink used
//! when the CRM outbound path fails and a plain email summary is the best
//! remaining option. The email provider itself is external and out of scope.

use super::{http_client, log_call, AdapterResult, HTTP_TIMEOUT};
use crate::db::Store;

pub struct EmailAdapter {
    base_url: String,
    api_key: String,
    from_address: String,
}

impl EmailAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, from_address: impl Into<String>) -> Self {
        EmailAdapter {
            base_url: base_url.into(),
            api_key: api_key.into(),
            from_address: from_address.into(),
        }
    }

    pub async fn send_summary(
        &self,
        store: &Store,
        dealership_id: i64,
        to: &str,
        subject: &str,
        body: &str,
    ) -> AdapterResult<()> {
        let started = std::time::Instant::now();
        let client = http_client(HTTP_TIMEOUT);
        let url = format!("{}/send", self.base_url);
        let result = super::with_retry(|| {
            client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({"from": self.from_address, "to": to, "subject": subject, "body": body}))
                .send()
        })
        .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status().as_u16() as i32;
                log_call(store, Some(dealership_id), "email", "send_summary", true, Some(status), started, None);
                AdapterResult::ok(())
            }
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                log_call(store, Some(dealership_id), "email", "send_summary", false, Some(status), started, Some("non-success status"));
                AdapterResult::err(format!("email provider returned status {status}"), "upstream_error")
            }
            Err(e) => {
                log_call(store, Some(dealership_id), "email", "send_summary", false, None, started, Some(&e.to_string()));
                AdapterResult::err(e.to_string(), "request_failed")
            }
        }
    }
}
