//! Impersonation sessions (spec §4.2): a super_admin acting as another user,
//! audited end to end and capped at one active session per super_admin.

use crate::db::Store;
use crate::errors::StoreError;
use crate::models::ImpersonationSession;
use rusqlite::{params, OptionalExtension, Row};

fn from_row(row: &Row) -> rusqlite::Result<ImpersonationSession> {
    Ok(ImpersonationSession {
        id: row.get("id")?,
        super_admin_id: row.get("super_admin_id")?,
        target_user_id: row.get("target_user_id")?,
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        actions_performed: row.get("actions_performed")?,
    })
}

pub fn active_for(store: &Store, super_admin_id: i64) -> Option<ImpersonationSession> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT * FROM impersonation_sessions WHERE super_admin_id = ?1 AND ended_at IS NULL",
        params![super_admin_id],
        from_row,
    )
    .optional()
    .ok()
    .flatten()
}

pub fn start(
    store: &Store,
    super_admin_id: i64,
    target_user_id: i64,
    now: &str,
) -> Result<ImpersonationSession, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let already_active: Option<i64> = conn
        .query_row(
            "SELECT id FROM impersonation_sessions WHERE super_admin_id = ?1 AND ended_at IS NULL",
            params![super_admin_id],
            |r| r.get(0),
        )
        .optional()?;
    if already_active.is_some() {
        return Err(StoreError::AlreadyExists(
            "an impersonation session is already active".to_string(),
        ));
    }
    conn.execute(
        "INSERT INTO impersonation_sessions (super_admin_id, target_user_id, started_at, actions_performed) VALUES (?1, ?2, ?3, 0)",
        params![super_admin_id, target_user_id, now],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        "SELECT * FROM impersonation_sessions WHERE id = ?1",
        params![id],
        from_row,
    )
    .map_err(StoreError::from)
}

pub fn end(store: &Store, id: i64, now: &str) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE impersonation_sessions SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
        params![now, id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn record_action(store: &Store, id: i64) {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let _ = conn.execute(
        "UPDATE impersonation_sessions SET actions_performed = actions_performed + 1 WHERE id = ?1",
        params![id],
    );
}
