//! Per-call API log rows (spec §4.7): every adapter call writes one here.

use crate::db::Store;
use rusqlite::params;

#[allow(clippy::too_many_arguments)]
pub fn record(
    store: &Store,
    dealership_id: Option<i64>,
    adapter: &str,
    operation: &str,
    success: bool,
    status_code: Option<i32>,
    latency_ms: i64,
    error: Option<&str>,
    now: &str,
) {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    if let Err(e) = conn.execute(
        "INSERT INTO api_logs (dealership_id, adapter, operation, success, status_code, latency_ms, error, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![dealership_id, adapter, operation, success as i64, status_code, latency_ms, error, now],
    ) {
        log::warn!(target: "dealerops::api_logs", "failed to record api log: {e}");
    }
}
