//! Dealership/tenant rows (spec §3, §4.1).

use crate::db::Store;
use crate::errors::StoreError;
use crate::models::Dealership;
use rusqlite::{params, OptionalExtension, Row};

fn from_row(row: &Row) -> rusqlite::Result<Dealership> {
    Ok(Dealership {
        id: row.get("id")?,
        slug: row.get("slug")?,
        subdomain: row.get("subdomain")?,
        display_name: row.get("display_name")?,
        is_active: row.get::<_, i64>("is_active")? != 0,
        scrape_webhook_secret: row.get("scrape_webhook_secret")?,
        crm_webhook_secret: row.get("crm_webhook_secret")?,
        posting_cap_per_day: row.get("posting_cap_per_day")?,
        created_at: row.get("created_at")?,
    })
}

pub fn create(
    store: &Store,
    slug: &str,
    subdomain: &str,
    display_name: &str,
    scrape_webhook_secret: &str,
    crm_webhook_secret: &str,
    posting_cap_per_day: i64,
    now: &str,
) -> Result<Dealership, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "INSERT INTO dealerships (slug, subdomain, display_name, is_active, scrape_webhook_secret, crm_webhook_secret, posting_cap_per_day, created_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7)",
        params![slug, subdomain, display_name, scrape_webhook_secret, crm_webhook_secret, posting_cap_per_day, now],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row("SELECT * FROM dealerships WHERE id = ?1", params![id], from_row)
        .map_err(StoreError::from)
}

pub fn get(store: &Store, id: i64) -> Result<Dealership, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row("SELECT * FROM dealerships WHERE id = ?1", params![id], from_row)
        .map_err(StoreError::from)
}

pub fn find_by_subdomain(store: &Store, subdomain: &str) -> Option<Dealership> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT * FROM dealerships WHERE subdomain = ?1 AND is_active = 1",
        params![subdomain],
        from_row,
    )
    .optional()
    .ok()
    .flatten()
}

pub fn find_by_slug(store: &Store, slug: &str) -> Option<Dealership> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row("SELECT * FROM dealerships WHERE slug = ?1", params![slug], from_row)
        .optional()
        .ok()
        .flatten()
}

pub fn list_all(store: &Store) -> Vec<Dealership> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare("SELECT * FROM dealerships ORDER BY id") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

pub fn set_active(store: &Store, id: i64, is_active: bool) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE dealerships SET is_active = ?1 WHERE id = ?2",
        params![is_active as i64, id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
