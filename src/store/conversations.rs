//! Conversation rows (spec §3, §4.3).

use super::{decode_json, encode_json};
use crate::db::Store;
use crate::errors::StoreError;
use crate::models::{Channel, Conversation};
use rusqlite::{params, OptionalExtension, Row};

fn from_row(row: &Row) -> rusqlite::Result<Conversation> {
    let channel_str: String = row.get("channel")?;
    Ok(Conversation {
        id: row.get("id")?,
        dealership_id: row.get("dealership_id")?,
        channel: Channel::parse(&channel_str).unwrap_or(Channel::WebsiteChat),
        participant_id: row.get("participant_id")?,
        page_access_token: row.get("page_access_token")?,
        assigned_to_user_id: row.get("assigned_to_user_id")?,
        ai_enabled: row.get::<_, i64>("ai_enabled")? != 0,
        ai_watch_mode: row.get::<_, i64>("ai_watch_mode")? != 0,
        lead_status: row.get("lead_status")?,
        pipeline_stage: row.get("pipeline_stage")?,
        tags: decode_json(&row.get::<_, String>("tags")?),
        handoff_name: row.get("handoff_name")?,
        handoff_phone: row.get("handoff_phone")?,
        handoff_email: row.get("handoff_email")?,
        ghl_contact_id: row.get("ghl_contact_id")?,
        last_message: row.get("last_message")?,
        last_message_at: row.get("last_message_at")?,
        created_at: row.get("created_at")?,
    })
}

pub fn get(store: &Store, dealership_id: i64, id: i64) -> Result<Conversation, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT * FROM conversations WHERE id = ?1 AND dealership_id = ?2",
        params![id, dealership_id],
        from_row,
    )
    .map_err(StoreError::from)
}

/// Find-or-create keyed on `(dealership_id, channel, participant_id)`
/// (spec §4.3: one conversation per participant per channel per tenant).
pub fn find_or_create(
    store: &Store,
    dealership_id: i64,
    channel: Channel,
    participant_id: &str,
    now: &str,
) -> Result<Conversation, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let existing = conn
        .query_row(
            "SELECT * FROM conversations WHERE dealership_id = ?1 AND channel = ?2 AND participant_id = ?3",
            params![dealership_id, channel.as_str(), participant_id],
            from_row,
        )
        .optional()?;
    if let Some(conversation) = existing {
        return Ok(conversation);
    }
    conn.execute(
        "INSERT INTO conversations (dealership_id, channel, participant_id, ai_enabled, ai_watch_mode, lead_status, pipeline_stage, tags, created_at)
         VALUES (?1, ?2, ?3, 1, 0, 'new', 'new', '[]', ?4)",
        params![dealership_id, channel.as_str(), participant_id, now],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row("SELECT * FROM conversations WHERE id = ?1", params![id], from_row)
        .map_err(StoreError::from)
}

pub fn list(store: &Store, dealership_id: i64, limit: i64, offset: i64) -> Vec<Conversation> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare(
        "SELECT * FROM conversations WHERE dealership_id = ?1 ORDER BY last_message_at DESC NULLS LAST, id DESC LIMIT ?2 OFFSET ?3",
    ) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![dealership_id, limit, offset], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

pub fn touch_last_message(
    store: &Store,
    id: i64,
    preview: &str,
    sent_at: &str,
) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE conversations SET last_message = ?1, last_message_at = ?2 WHERE id = ?3",
        params![preview, sent_at, id],
    )?;
    Ok(())
}

pub fn set_handoff(
    store: &Store,
    dealership_id: i64,
    id: i64,
    name: Option<&str>,
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE conversations SET handoff_name = ?1, handoff_phone = ?2, handoff_email = ?3 WHERE id = ?4 AND dealership_id = ?5",
        params![name, phone, email, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn set_ai_enabled(store: &Store, dealership_id: i64, id: i64, enabled: bool) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE conversations SET ai_enabled = ?1 WHERE id = ?2 AND dealership_id = ?3",
        params![enabled as i64, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn set_ai_watch_mode(store: &Store, dealership_id: i64, id: i64, watch: bool) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE conversations SET ai_watch_mode = ?1 WHERE id = ?2 AND dealership_id = ?3",
        params![watch as i64, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn assign(store: &Store, dealership_id: i64, id: i64, user_id: Option<i64>) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE conversations SET assigned_to_user_id = ?1 WHERE id = ?2 AND dealership_id = ?3",
        params![user_id, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn set_tags(store: &Store, dealership_id: i64, id: i64, tags: &[String]) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE conversations SET tags = ?1 WHERE id = ?2 AND dealership_id = ?3",
        params![encode_json(&tags), id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn set_ghl_contact_id(store: &Store, id: i64, ghl_contact_id: &str) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE conversations SET ghl_contact_id = ?1 WHERE id = ?2",
        params![ghl_contact_id, id],
    )?;
    Ok(())
}

/// `None` for a field leaves it unchanged (the metadata route patches fields
/// independently, spec §4.3).
pub fn set_lead_metadata(
    store: &Store,
    dealership_id: i64,
    id: i64,
    lead_status: Option<&str>,
    pipeline_stage: Option<&str>,
) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE conversations SET
            lead_status = COALESCE(?1, lead_status),
            pipeline_stage = COALESCE(?2, pipeline_stage)
         WHERE id = ?3 AND dealership_id = ?4",
        params![lead_status, pipeline_stage, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
