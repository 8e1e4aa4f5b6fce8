//! Dealership ↔ external-account linkage (spec §4.3: routing an inbound
//! webhook to a dealership by its CRM locationId or messenger pageId).
//! Modeled as one polymorphic table instead of the two the spec alludes to
//! ("CRM-linked accounts, API-key-linked settings") — same lookup semantics,
//! one less join (see DESIGN.md).

use crate::db::Store;
use crate::errors::StoreError;
use rusqlite::{params, OptionalExtension};

pub const KIND_CRM_LOCATION: &str = "crm_location";
pub const KIND_MESSENGER_PAGE: &str = "messenger_page";

pub fn link(
    store: &Store,
    dealership_id: i64,
    kind: &str,
    external_id: &str,
    now: &str,
) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "INSERT INTO external_accounts (dealership_id, kind, external_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![dealership_id, kind, external_id, now],
    )?;
    Ok(())
}

pub fn find_dealership_id(store: &Store, kind: &str, external_id: &str) -> Option<i64> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT dealership_id FROM external_accounts WHERE kind = ?1 AND external_id = ?2",
        params![kind, external_id],
        |r| r.get(0),
    )
    .optional()
    .ok()
    .flatten()
}

/// Try the CRM-location table first, then the messenger-page table, matching
/// whichever identifier the webhook payload actually carried.
pub fn resolve_dealership_id(store: &Store, location_id: Option<&str>, page_id: Option<&str>) -> Option<i64> {
    if let Some(id) = location_id
        && let Some(d) = find_dealership_id(store, KIND_CRM_LOCATION, id)
    {
        return Some(d);
    }
    if let Some(id) = page_id
        && let Some(d) = find_dealership_id(store, KIND_MESSENGER_PAGE, id)
    {
        return Some(d);
    }
    None
}
