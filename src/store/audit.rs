//! Audit log writes (SPEC_FULL §11). Append-only; no update/delete surface.

use crate::db::Store;
use crate::models::AuditLog;
use rusqlite::{params, Row};

fn from_row(row: &Row) -> rusqlite::Result<AuditLog> {
    Ok(AuditLog {
        id: row.get("id")?,
        dealership_id: row.get("dealership_id")?,
        user_id: row.get("user_id")?,
        action: row.get("action")?,
        resource: row.get("resource")?,
        resource_id: row.get("resource_id")?,
        details: row
            .get::<_, Option<String>>("details")?
            .and_then(|s| serde_json::from_str(&s).ok()),
        ip_address: row.get("ip_address")?,
        created_at: row.get("created_at")?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn record(
    store: &Store,
    dealership_id: Option<i64>,
    user_id: i64,
    action: &str,
    resource: &str,
    resource_id: Option<&str>,
    details: Option<&serde_json::Value>,
    ip_address: Option<&str>,
    now: &str,
) {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let details_json = details.map(|v| v.to_string());
    if let Err(e) = conn.execute(
        "INSERT INTO audit_logs (dealership_id, user_id, action, resource, resource_id, details, ip_address, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![dealership_id, user_id, action, resource, resource_id, details_json, ip_address, now],
    ) {
        log::warn!(target: "dealerops::audit", "failed to record audit log: {e}");
    }
}

pub fn list_for_dealership(store: &Store, dealership_id: i64, limit: i64, offset: i64) -> Vec<AuditLog> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare(
        "SELECT * FROM audit_logs WHERE dealership_id = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
    ) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![dealership_id, limit, offset], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}
