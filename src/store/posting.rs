//! Posting automation rows (spec §3, §4.5): queue items and single-use posting tokens.

use crate::db::Store;
use crate::errors::StoreError;
use crate::models::{PostingQueueItem, PostingStatus, PostingToken};
use rusqlite::{params, OptionalExtension, Row};

fn item_from_row(row: &Row) -> rusqlite::Result<PostingQueueItem> {
    let status_str: String = row.get("status")?;
    Ok(PostingQueueItem {
        id: row.get("id")?,
        dealership_id: row.get("dealership_id")?,
        user_id: row.get("user_id")?,
        vehicle_id: row.get("vehicle_id")?,
        account_id: row.get("account_id")?,
        template_id: row.get("template_id")?,
        status: PostingStatus::parse(&status_str).unwrap_or(PostingStatus::Queued),
        priority: row.get("priority")?,
        attempt_count: row.get("attempt_count")?,
        last_error: row.get("last_error")?,
        scheduled_for: row.get("scheduled_for")?,
        posted_at: row.get("posted_at")?,
        external_listing_id: row.get("external_listing_id")?,
        created_at: row.get("created_at")?,
    })
}

fn token_from_row(row: &Row) -> rusqlite::Result<PostingToken> {
    Ok(PostingToken {
        token: row.get("token")?,
        dealership_id: row.get("dealership_id")?,
        user_id: row.get("user_id")?,
        vehicle_id: row.get("vehicle_id")?,
        platform: row.get("platform")?,
        expires_at: row.get("expires_at")?,
        used_at: row.get("used_at")?,
        created_at: row.get("created_at")?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn enqueue(
    store: &Store,
    dealership_id: i64,
    user_id: i64,
    vehicle_id: i64,
    account_id: &str,
    template_id: Option<&str>,
    scheduled_for: Option<&str>,
    now: &str,
) -> Result<PostingQueueItem, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "INSERT INTO posting_queue_items (dealership_id, user_id, vehicle_id, account_id, template_id, status, scheduled_for, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'queued', ?6, ?7)",
        params![dealership_id, user_id, vehicle_id, account_id, template_id, scheduled_for, now],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        "SELECT * FROM posting_queue_items WHERE id = ?1",
        params![id],
        item_from_row,
    )
    .map_err(StoreError::from)
}

/// Atomically claim the next ready item and flip it to `posting`, so two
/// queue drainers never pick up the same row (spec §4.5).
pub fn claim_next_ready(store: &Store, now: &str) -> Option<PostingQueueItem> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM posting_queue_items
             WHERE status = 'queued' AND (scheduled_for IS NULL OR scheduled_for <= ?1)
             ORDER BY priority ASC, created_at ASC LIMIT 1",
            params![now],
            |r| r.get(0),
        )
        .optional()
        .ok()
        .flatten();
    let id = id?;
    let updated = conn
        .execute(
            "UPDATE posting_queue_items SET status = 'posting' WHERE id = ?1 AND status = 'queued'",
            params![id],
        )
        .unwrap_or(0);
    if updated == 0 {
        return None;
    }
    conn.query_row(
        "SELECT * FROM posting_queue_items WHERE id = ?1",
        params![id],
        item_from_row,
    )
    .optional()
    .ok()
    .flatten()
}

/// Mark `id` posted. The `(vehicle_id, account_id)` listing is unique
/// while `posted`, so any prior posted row for the same pair is superseded
/// first — this is the "upsert a listing row" behavior from spec §4.5.
pub fn mark_posted(store: &Store, id: i64, vehicle_id: i64, account_id: &str, external_listing_id: &str, now: &str) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE posting_queue_items SET status = 'cancelled' WHERE vehicle_id = ?1 AND account_id = ?2 AND status = 'posted' AND id != ?3",
        params![vehicle_id, account_id, id],
    )?;
    conn.execute(
        "UPDATE posting_queue_items SET status = 'posted', posted_at = ?1, external_listing_id = ?2 WHERE id = ?3",
        params![now, external_listing_id, id],
    )?;
    Ok(())
}

pub fn mark_failed(store: &Store, id: i64, error: &str) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE posting_queue_items SET status = 'failed', last_error = ?1, attempt_count = attempt_count + 1 WHERE id = ?2",
        params![error, id],
    )?;
    Ok(())
}

/// Return to `queued` for retry, keeping the attempt count (spec §4.5 retry policy).
pub fn requeue(store: &Store, id: i64) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE posting_queue_items SET status = 'queued', attempt_count = attempt_count + 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

pub fn cancel(store: &Store, dealership_id: i64, id: i64) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE posting_queue_items SET status = 'cancelled' WHERE id = ?1 AND dealership_id = ?2 AND status IN ('queued','posting')",
        params![id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Mark every `posting` item `interrupted` (called at startup, spec §4.5:
/// a process restart mid-post must not leave a row stuck as `posting` forever).
pub fn interrupt_stuck_items(store: &Store) -> i64 {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.execute(
        "UPDATE posting_queue_items SET status = 'interrupted' WHERE status = 'posting'",
        params![],
    )
    .unwrap_or(0) as i64
}

pub fn list_for_dealership(store: &Store, dealership_id: i64, limit: i64, offset: i64) -> Vec<PostingQueueItem> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn.prepare(
        "SELECT * FROM posting_queue_items WHERE dealership_id = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
    ) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![dealership_id, limit, offset], item_from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

/// Process-wide count of items still waiting to post, for the stats endpoint.
pub fn count_queued(store: &Store) -> i64 {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row("SELECT COUNT(*) FROM posting_queue_items WHERE status = 'queued'", [], |r| r.get(0))
        .unwrap_or(0)
}

/// Count of `posted` items for `user_id` since `since` (used by the daily cap gate, spec §4.5).
pub fn posted_count_since(store: &Store, user_id: i64, since: &str) -> i64 {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT COUNT(*) FROM posting_queue_items WHERE user_id = ?1 AND status = 'posted' AND posted_at >= ?2",
        params![user_id, since],
        |r| r.get(0),
    )
    .unwrap_or(0)
}

// --- Single-use posting tokens ---

/// Count-and-insert in one statement under one lock acquisition (spec §5/§8:
/// "transactional count-and-insert... two concurrent mints cannot both
/// succeed at the cap"). The `WHERE` clause counts today's posted items
/// plus still-outstanding (unredeemed, unexpired) minted tokens, so a mint
/// that hasn't been posted yet still occupies a cap slot.
#[allow(clippy::too_many_arguments)]
pub fn mint_token(
    store: &Store,
    token: &str,
    dealership_id: i64,
    user_id: i64,
    vehicle_id: i64,
    platform: &str,
    expires_at: &str,
    now: &str,
    since: &str,
    cap: i64,
) -> Result<PostingToken, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let inserted = conn.execute(
        "INSERT INTO posting_tokens (token, dealership_id, user_id, vehicle_id, platform, expires_at, created_at)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
         WHERE (
             (SELECT COUNT(*) FROM posting_queue_items WHERE user_id = ?3 AND status = 'posted' AND posted_at >= ?8)
             + (SELECT COUNT(*) FROM posting_tokens WHERE user_id = ?3 AND used_at IS NULL AND expires_at > ?7)
         ) < ?9",
        params![token, dealership_id, user_id, vehicle_id, platform, expires_at, now, since, cap],
    )?;
    if inserted == 0 {
        return Err(StoreError::AlreadyExists("daily posting limit reached".to_string()));
    }
    conn.query_row(
        "SELECT * FROM posting_tokens WHERE token = ?1",
        params![token],
        token_from_row,
    )
    .map_err(StoreError::from)
}

/// Atomically redeem a token: fails if already used or expired (spec §4.5, §5:
/// "use a unique constraint + insert-or-ignore; never read-then-write" applied
/// here as an `UPDATE ... WHERE used_at IS NULL` that returns 0 rows on replay).
pub fn redeem_token(store: &Store, token: &str, now: &str) -> Result<PostingToken, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let row = conn
        .query_row(
            "SELECT * FROM posting_tokens WHERE token = ?1",
            params![token],
            token_from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound)?;
    if row.used_at.is_some() {
        return Err(StoreError::AlreadyExists("posting token already used".to_string()));
    }
    if row.expires_at.as_str() < now {
        return Err(StoreError::NotFound);
    }
    let updated = conn.execute(
        "UPDATE posting_tokens SET used_at = ?1 WHERE token = ?2 AND used_at IS NULL",
        params![now, token],
    )?;
    if updated == 0 {
        return Err(StoreError::AlreadyExists("posting token already used".to_string()));
    }
    Ok(row)
}

pub fn tokens_minted_since(store: &Store, user_id: i64, since: &str) -> i64 {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT COUNT(*) FROM posting_tokens WHERE user_id = ?1 AND created_at >= ?2",
        params![user_id, since],
        |r| r.get(0),
    )
    .unwrap_or(0)
}
