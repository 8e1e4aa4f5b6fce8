//! Message rows (spec §3, §4.3). Inbound dedup relies on the partial unique
//! indexes in the schema, not a read-then-write check (spec §5).

use crate::db::Store;
use crate::errors::StoreError;
use crate::models::{Direction, Message, SyncSource};
use rusqlite::{params, OptionalExtension, Row};

fn from_row(row: &Row) -> rusqlite::Result<Message> {
    let direction_str: String = row.get("direction")?;
    let sync_source_str: String = row.get("sync_source")?;
    Ok(Message {
        id: row.get("id")?,
        dealership_id: row.get("dealership_id")?,
        conversation_id: row.get("conversation_id")?,
        external_message_id: row.get("external_message_id")?,
        ghl_message_id: row.get("ghl_message_id")?,
        direction: Direction::parse(&direction_str).unwrap_or(Direction::Inbound),
        sender_name: row.get("sender_name")?,
        content: row.get("content")?,
        is_read: row.get::<_, i64>("is_read")? != 0,
        sent_at: row.get("sent_at")?,
        sync_source: SyncSource::parse(&sync_source_str).unwrap_or(SyncSource::Provider),
    })
}

/// Outcome of an insert attempt that may collide with an already-synced message.
pub enum InsertOutcome {
    Inserted(Message),
    /// A partial-unique-index violation on `external_message_id`/`ghl_message_id`:
    /// this exact external message was already recorded (spec §4.3 dedup).
    Duplicate,
}

#[allow(clippy::too_many_arguments)]
pub fn insert(
    store: &Store,
    dealership_id: i64,
    conversation_id: i64,
    external_message_id: Option<&str>,
    ghl_message_id: Option<&str>,
    direction: Direction,
    sender_name: Option<&str>,
    content: &str,
    sent_at: &str,
    sync_source: SyncSource,
) -> Result<InsertOutcome, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let result = conn.execute(
        "INSERT INTO messages (dealership_id, conversation_id, external_message_id, ghl_message_id, direction, sender_name, content, is_read, sent_at, sync_source)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            dealership_id, conversation_id, external_message_id, ghl_message_id,
            direction.as_str(), sender_name, content,
            matches!(direction, Direction::Outbound) as i64,
            sent_at, sync_source.as_str(),
        ],
    );
    match result {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            conn.query_row("SELECT * FROM messages WHERE id = ?1", params![id], from_row)
                .map(InsertOutcome::Inserted)
                .map_err(StoreError::from)
        }
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(InsertOutcome::Duplicate)
        }
        Err(e) => Err(StoreError::from(e)),
    }
}

/// Attach the CRM's message id to an already-persisted outbound message
/// (spec §4.3: outbound send races the CRM echo; whichever arrives second
/// just updates this column instead of inserting a duplicate row).
pub fn attach_ghl_message_id(store: &Store, id: i64, ghl_message_id: &str) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE messages SET ghl_message_id = ?1 WHERE id = ?2 AND ghl_message_id IS NULL",
        params![ghl_message_id, id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn find_by_ghl_message_id(store: &Store, dealership_id: i64, ghl_message_id: &str) -> Option<Message> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT * FROM messages WHERE dealership_id = ?1 AND ghl_message_id = ?2",
        params![dealership_id, ghl_message_id],
        from_row,
    )
    .optional()
    .ok()
    .flatten()
}

/// The most recent outbound message with no CRM id yet, matching content
/// (fallback dedup path when the CRM echo races the direct-send persist —
/// spec open question (c)).
pub fn find_recent_unconfirmed_outbound(
    store: &Store,
    conversation_id: i64,
    content: &str,
    since: &str,
) -> Option<Message> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT * FROM messages WHERE conversation_id = ?1 AND direction = 'outbound'
         AND ghl_message_id IS NULL AND content = ?2 AND sent_at >= ?3
         ORDER BY id DESC LIMIT 1",
        params![conversation_id, content, since],
        from_row,
    )
    .optional()
    .ok()
    .flatten()
}

pub fn list_for_conversation(store: &Store, conversation_id: i64, limit: i64, offset: i64) -> Vec<Message> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare(
        "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
    ) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![conversation_id, limit, offset], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

pub fn mark_read(store: &Store, conversation_id: i64) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE messages SET is_read = 1 WHERE conversation_id = ?1 AND direction = 'inbound'",
        params![conversation_id],
    )?;
    Ok(())
}
