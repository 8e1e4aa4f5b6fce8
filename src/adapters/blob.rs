//! Object-storage blob adapter (spec §4.4, §1 — the blob service itself is
//! out of scope; this is the thin client boundary). Keys are deterministic:
//! `<dealershipId>/<vehicleId>/<index>.<ext>`; re-uploads pick a new index
//! since blobs are immutable per key (spec §5).

use super::{http_client, log_call, AdapterResult, HTTP_TIMEOUT};
use crate::db::Store;

pub struct BlobAdapter {
    base_url: String,
    bucket: String,
}

impl BlobAdapter {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        BlobAdapter { base_url: base_url.into(), bucket: bucket.into() }
    }

    pub fn key(dealership_id: i64, vehicle_id: i64, index: usize, ext: &str) -> String {
        format!("{dealership_id}/{vehicle_id}/{index}.{ext}")
    }

    /// Download `source_url` and re-upload it under `key`. Returns the
    /// hosted URL on success; a failed download/upload downgrades to the
    /// external URL at the call site (spec §4.4), never drops the listing.
    pub async fn mirror(
        &self,
        store: &Store,
        dealership_id: i64,
        source_url: &str,
        key: &str,
    ) -> AdapterResult<String> {
        let started = std::time::Instant::now();
        let client = http_client(HTTP_TIMEOUT);
        let bytes = match client.get(source_url).send().await.and_then(|r| r.error_for_status()) {
            Ok(resp) => match resp.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    log_call(store, Some(dealership_id), "blob", "mirror", false, None, started, Some(&e.to_string()));
                    return AdapterResult::err(e.to_string(), "download_failed");
                }
            },
            Err(e) => {
                log_call(store, Some(dealership_id), "blob", "mirror", false, None, started, Some(&e.to_string()));
                return AdapterResult::err(e.to_string(), "download_failed");
            }
        };

        let put_url = format!("{}/{}/{}", self.base_url, self.bucket, key);
        let result = super::with_retry(|| client.put(&put_url).body(bytes.clone()).send()).await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status().as_u16() as i32;
                log_call(store, Some(dealership_id), "blob", "mirror", true, Some(status), started, None);
                AdapterResult::ok(format!("{}/{}/{}", self.base_url, self.bucket, key))
            }
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                log_call(store, Some(dealership_id), "blob", "mirror", false, Some(status), started, Some("non-success status"));
                AdapterResult::err(format!("blob store returned status {status}"), "upstream_error")
            }
            Err(e) => {
                log_call(store, Some(dealership_id), "blob", "mirror", false, None, started, Some(&e.to_string()));
                AdapterResult::err(e.to_string(), "request_failed")
            }
        }
    }
}
