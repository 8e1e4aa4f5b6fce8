//! Health check, process-wide stats, and error catchers (spec §6 response
//! conventions; stats endpoint per SPEC_FULL §11).

use crate::db::Store;
use crate::realtime::WsHub;
use crate::store;
use rocket::serde::json::Json;
use rocket::{catch, get, State};
use std::sync::Arc;

#[get("/health")]
pub fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Process-wide counts, not tenant-scoped: dealership count, scrape runs
/// still in flight, posting items queued, and connected WebSocket clients.
#[get("/metrics")]
pub fn metrics(store: &State<Arc<Store>>, hub: &State<Arc<WsHub>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "dealerships": store::dealerships::list_all(store).len(),
        "activeScrapeRuns": store::scrapes::count_active(store),
        "queuedPostingItems": store::posting::count_queued(store),
        "connectedWebsockets": hub.connection_count(),
    }))
}

#[catch(400)]
pub fn bad_request() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "bad request"}))
}

#[catch(401)]
pub fn unauthorized() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "unauthorized"}))
}

#[catch(403)]
pub fn forbidden() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "forbidden"}))
}

#[catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "not found"}))
}

#[catch(409)]
pub fn conflict() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "conflict"}))
}

#[catch(429)]
pub fn too_many_requests() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "rate limit exceeded"}))
}

#[catch(500)]
pub fn internal_error() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "internal server error"}))
}
