//! Posting queue (spec §4.5): enqueue single-vehicle or bulk posting
//! requests; the scheduler in `scheduler.rs` drains them in
//! `(priority ASC, createdAt ASC)` order, so a lower priority number posts
//! sooner.

use crate::db::Store;
use crate::errors::ApiResult;
use crate::models::PostingQueueItem;
use crate::store;

pub async fn enqueue_single(
    store: &Store,
    dealership_id: i64,
    user_id: i64,
    vehicle_id: i64,
    account_id: &str,
    template_id: Option<&str>,
    now: chrono::DateTime<chrono::Utc>,
) -> ApiResult<PostingQueueItem> {
    store::vehicles::get(store, dealership_id, vehicle_id)?;
    let now_str = now.to_rfc3339();
    store::posting::enqueue(store, dealership_id, user_id, vehicle_id, account_id, template_id, None, &now_str)
        .map_err(Into::into)
}

/// Bulk enqueue: one item per vehicle, skipping vehicles that don't belong
/// to the dealership rather than failing the whole batch (mirrors the
/// per-item error tolerance used by bulk inventory import).
pub async fn enqueue_bulk(
    store: &Store,
    dealership_id: i64,
    user_id: i64,
    vehicle_ids: &[i64],
    account_id: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<Result<PostingQueueItem, String>> {
    let now_str = now.to_rfc3339();
    vehicle_ids
        .iter()
        .map(|&vehicle_id| {
            store::vehicles::get(store, dealership_id, vehicle_id).map_err(|e| e.to_string())?;
            store::posting::enqueue(store, dealership_id, user_id, vehicle_id, account_id, None, None, &now_str)
                .map_err(|e| e.to_string())
        })
        .collect()
}
