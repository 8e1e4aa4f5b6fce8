//! User rows (spec §3, §4.2). Users belong to at most one dealership, except
//! `super_admin`, whose `dealership_id` is null.

use crate::db::Store;
use crate::errors::StoreError;
use crate::models::{Role, User};
use rusqlite::{params, OptionalExtension, Row};

fn from_row(row: &Row) -> rusqlite::Result<User> {
    let role_str: String = row.get("role")?;
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        name: row.get("name")?,
        role: Role::parse(&role_str).unwrap_or(Role::Salesperson),
        dealership_id: row.get("dealership_id")?,
        is_active: row.get::<_, i64>("is_active")? != 0,
        created_at: row.get("created_at")?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    store: &Store,
    email: &str,
    password_hash: &str,
    name: &str,
    role: Role,
    dealership_id: Option<i64>,
    now: &str,
) -> Result<User, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "INSERT INTO users (email, password_hash, name, role, dealership_id, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        params![email, password_hash, name, role.as_str(), dealership_id, now],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], from_row)
        .map_err(StoreError::from)
}

pub fn find_by_email(store: &Store, email: &str) -> Option<User> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row("SELECT * FROM users WHERE email = ?1", params![email], from_row)
        .optional()
        .ok()
        .flatten()
}

/// Scoped lookup: returns `NotFound` for a user outside `dealership_id`
/// (super_admin callers should use [`get_by_id_unscoped`] instead).
pub fn get(store: &Store, dealership_id: i64, id: i64) -> Result<User, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT * FROM users WHERE id = ?1 AND dealership_id = ?2",
        params![id, dealership_id],
        from_row,
    )
    .map_err(StoreError::from)
}

/// Unscoped lookup used by the auth guard once a principal's identity is
/// already established (e.g. resolving the user behind an extension key).
pub fn get_by_id_unscoped(store: &Store, id: i64) -> Option<User> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], from_row)
        .optional()
        .ok()
        .flatten()
}

pub fn is_active(store: &Store, id: i64) -> bool {
    get_by_id_unscoped(store, id).map(|u| u.is_active).unwrap_or(false)
}

pub fn list_for_dealership(store: &Store, dealership_id: i64) -> Vec<User> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare("SELECT * FROM users WHERE dealership_id = ?1 ORDER BY id") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![dealership_id], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

pub fn set_password_hash(store: &Store, id: i64, password_hash: &str) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn set_role(store: &Store, dealership_id: i64, id: i64, role: Role) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2 AND dealership_id = ?3",
        params![role.as_str(), id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn set_active(store: &Store, dealership_id: i64, id: i64, is_active: bool) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE users SET is_active = ?1 WHERE id = ?2 AND dealership_id = ?3",
        params![is_active as i64, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

// --- Password-reset tokens (bcrypt-hashed, single-use, 1h TTL) ---

pub fn store_password_reset_token(
    store: &Store,
    token_hash: &str,
    user_id: i64,
    expires_at: &str,
    now: &str,
) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "INSERT INTO password_reset_tokens (token_hash, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![token_hash, user_id, expires_at, now],
    )?;
    Ok(())
}

/// Returns `(user_id, expires_at)` for every unused reset token row, so the
/// caller can bcrypt-verify the raw token against each hash (there is no
/// indexed lookup by raw value).
pub fn active_password_reset_tokens(store: &Store) -> Vec<(String, i64, String)> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare(
        "SELECT token_hash, user_id, expires_at FROM password_reset_tokens WHERE used_at IS NULL",
    ) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })
    .map(|rows| rows.filter_map(|r| r.ok()).collect())
    .unwrap_or_default()
}

pub fn consume_password_reset_token(store: &Store, token_hash: &str, now: &str) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE password_reset_tokens SET used_at = ?1 WHERE token_hash = ?2 AND used_at IS NULL",
        params![now, token_hash],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
