//! Scrape run bookkeeping (spec §3, §4.4).

use crate::db::Store;
use crate::errors::StoreError;
use crate::models::{ScrapeRun, TriggeredBy};
use rusqlite::{params, Row};

fn from_row(row: &Row) -> rusqlite::Result<ScrapeRun> {
    Ok(ScrapeRun {
        id: row.get("id")?,
        dealership_id: row.get("dealership_id")?,
        triggered_by: row.get("triggered_by")?,
        method: row.get("method")?,
        retry_count: row.get("retry_count")?,
        vehicles_found: row.get("vehicles_found")?,
        vehicles_inserted: row.get("vehicles_inserted")?,
        vehicles_updated: row.get("vehicles_updated")?,
        vehicles_deleted: row.get("vehicles_deleted")?,
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        error: row.get("error")?,
    })
}

pub fn start(store: &Store, dealership_id: i64, triggered_by: TriggeredBy, now: &str) -> Result<ScrapeRun, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "INSERT INTO scrape_runs (dealership_id, triggered_by, started_at) VALUES (?1, ?2, ?3)",
        params![dealership_id, triggered_by.as_str(), now],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row("SELECT * FROM scrape_runs WHERE id = ?1", params![id], from_row)
        .map_err(StoreError::from)
}

#[allow(clippy::too_many_arguments)]
pub fn finish(
    store: &Store,
    id: i64,
    method: Option<&str>,
    vehicles_found: i64,
    vehicles_inserted: i64,
    vehicles_updated: i64,
    vehicles_deleted: i64,
    error: Option<&str>,
    now: &str,
) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE scrape_runs SET method = ?1, vehicles_found = ?2, vehicles_inserted = ?3,
         vehicles_updated = ?4, vehicles_deleted = ?5, error = ?6, ended_at = ?7 WHERE id = ?8",
        params![method, vehicles_found, vehicles_inserted, vehicles_updated, vehicles_deleted, error, now, id],
    )?;
    Ok(())
}

pub fn record_retry(store: &Store, id: i64) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE scrape_runs SET retry_count = retry_count + 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

pub fn list_for_dealership(store: &Store, dealership_id: i64, limit: i64) -> Vec<ScrapeRun> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare(
        "SELECT * FROM scrape_runs WHERE dealership_id = ?1 ORDER BY id DESC LIMIT ?2",
    ) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![dealership_id, limit], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

pub fn latest_for_dealership(store: &Store, dealership_id: i64) -> Option<ScrapeRun> {
    list_for_dealership(store, dealership_id, 1).into_iter().next()
}

/// Process-wide count of runs still in flight, for the stats endpoint.
pub fn count_active(store: &Store) -> i64 {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row("SELECT COUNT(*) FROM scrape_runs WHERE ended_at IS NULL", [], |r| r.get(0))
        .unwrap_or(0)
}
