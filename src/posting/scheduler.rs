//! Posting queue drainer (spec §4.5): claims ready items and delegates to
//! the browser-automation adapter. On success upserts the listing and
//! broadcasts `post_status`; on failure reschedules with backoff up to a
//! retry cap, then marks the item failed.

use crate::adapters::browser_automation::{BrowserAutomationAdapter, PostListingRequest};
use crate::db::Store;
use crate::models::{NotificationType, PostingQueueItem};
use crate::realtime::{self, WsHub};
use crate::store;
use std::sync::Arc;

const POLL_INTERVAL_MS: u64 = 2000;
const MAX_ATTEMPTS: i64 = 5;

/// Per-item session cookies come from wherever the browser extension
/// stashed them for this account; the caller supplies a lookup since that
/// storage is outside this module's scope.
pub fn spawn(
    store: Arc<Store>,
    hub: Arc<WsHub>,
    browser: Arc<BrowserAutomationAdapter>,
    session_cookies_for: impl Fn(&PostingQueueItem) -> Option<String> + Send + Sync + 'static,
    vehicle_payload_for: impl Fn(&Store, i64, i64) -> Option<(serde_json::Value, Vec<String>, String)> + Send + Sync + 'static,
) {
    tokio::spawn(async move {
        loop {
            let now = chrono::Utc::now().to_rfc3339();
            let Some(item) = store::posting::claim_next_ready(&store, &now) else {
                tokio::time::sleep(std::time::Duration::from_millis(POLL_INTERVAL_MS)).await;
                continue;
            };

            let Some(cookies) = session_cookies_for(&item) else {
                fail_or_requeue(&store, &hub, &item, "no active browser session for this account");
                continue;
            };
            let Some((vehicle_json, images, description)) =
                vehicle_payload_for(&store, item.dealership_id, item.vehicle_id)
            else {
                fail_or_requeue(&store, &hub, &item, "vehicle not found");
                continue;
            };

            let req = PostListingRequest {
                vehicle: &vehicle_json,
                images: &images,
                description: &description,
                session_cookies: &cookies,
                platform: &item.account_id,
            };
            let result = browser.post_listing(&store, item.dealership_id, &req).await;

            if result.success {
                let posted = result.data.unwrap_or(crate::adapters::browser_automation::PostListingResponse { listing_url: None });
                let listing_id = posted.listing_url.clone().unwrap_or_default();
                let finish_now = chrono::Utc::now().to_rfc3339();
                if store::posting::mark_posted(&store, item.id, item.vehicle_id, &item.account_id, &listing_id, &finish_now).is_ok() {
                    store::vehicles::set_marketplace_posted_at(&store, item.dealership_id, item.vehicle_id, &finish_now).ok();
                    hub.broadcast(
                        item.dealership_id,
                        realtime::notification(
                            NotificationType::PostStatus,
                            "Listing posted",
                            format!("vehicle {} posted to {}", item.vehicle_id, item.account_id),
                            Some(serde_json::json!({"postingQueueItemId": item.id, "listingUrl": posted.listing_url})),
                            chrono::Utc::now(),
                        ),
                    );
                }
            } else {
                let error = result.error.unwrap_or_else(|| "browser automation failed".to_string());
                fail_or_requeue(&store, &hub, &item, &error);
            }
        }
    });
}

fn fail_or_requeue(store: &Store, hub: &WsHub, item: &PostingQueueItem, error: &str) {
    if item.attempt_count + 1 >= MAX_ATTEMPTS {
        store::posting::mark_failed(store, item.id, error).ok();
        hub.broadcast(
            item.dealership_id,
            realtime::notification(
                NotificationType::PostStatus,
                "Listing post failed",
                error.to_string(),
                Some(serde_json::json!({"postingQueueItemId": item.id})),
                chrono::Utc::now(),
            ),
        );
    } else {
        store::posting::mark_failed(store, item.id, error).ok();
        store::posting::requeue(store, item.id).ok();
    }
}
