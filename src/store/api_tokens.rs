//! External API tokens (spec §4.2, §6).

use super::{decode_json, encode_json};
use crate::db::Store;
use crate::errors::StoreError;
use crate::models::{Capability, ExternalApiToken};
use rusqlite::{params, Row};

fn from_row(row: &Row) -> rusqlite::Result<ExternalApiToken> {
    let permissions_raw: String = row.get("permissions")?;
    let permission_strs: Vec<String> = decode_json(&permissions_raw);
    Ok(ExternalApiToken {
        id: row.get("id")?,
        dealership_id: row.get("dealership_id")?,
        token_name: row.get("token_name")?,
        token_hash: row.get("token_hash")?,
        token_prefix: row.get("token_prefix")?,
        permissions: permission_strs
            .iter()
            .filter_map(|s| Capability::parse(s))
            .collect(),
        expires_at: row.get("expires_at")?,
        is_active: row.get::<_, i64>("is_active")? != 0,
        last_used_at: row.get("last_used_at")?,
        created_at: row.get("created_at")?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    store: &Store,
    dealership_id: i64,
    token_name: &str,
    token_hash: &str,
    token_prefix: &str,
    permissions: &[Capability],
    expires_at: Option<&str>,
    now: &str,
) -> Result<ExternalApiToken, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let permission_strs: Vec<&str> = permissions.iter().map(|c| c.as_str()).collect();
    conn.execute(
        "INSERT INTO external_api_tokens (dealership_id, token_name, token_hash, token_prefix, permissions, expires_at, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
        params![dealership_id, token_name, token_hash, token_prefix, encode_json(&permission_strs), expires_at, now],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        "SELECT * FROM external_api_tokens WHERE id = ?1",
        params![id],
        from_row,
    )
    .map_err(StoreError::from)
}

pub fn find_by_prefix(store: &Store, prefix: &str) -> Vec<ExternalApiToken> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare("SELECT * FROM external_api_tokens WHERE token_prefix = ?1") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![prefix], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

pub fn list_for_dealership(store: &Store, dealership_id: i64) -> Vec<ExternalApiToken> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn
        .prepare("SELECT * FROM external_api_tokens WHERE dealership_id = ?1 ORDER BY id")
    {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![dealership_id], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

pub fn touch_last_used(store: &Store, id: i64) {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let now = chrono::Utc::now().to_rfc3339();
    let _ = conn.execute(
        "UPDATE external_api_tokens SET last_used_at = ?1 WHERE id = ?2",
        params![now, id],
    );
}

pub fn revoke(store: &Store, dealership_id: i64, id: i64) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE external_api_tokens SET is_active = 0 WHERE id = ?1 AND dealership_id = ?2",
        params![id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
