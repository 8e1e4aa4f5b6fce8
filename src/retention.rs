//! Background maintenance tasks (spec SPEC_FULL §11): API-log retention and
//! the impersonation-session idle reaper. Both run on an hourly timer,
//! mirroring the teacher's message-retention task shape.

use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

const SWEEP_INTERVAL_SECS: u64 = 3600;
const API_LOG_MAX_AGE_DAYS: i64 = 30;
const IMPERSONATION_IDLE_HOURS: i64 = 4;

pub fn spawn_maintenance_task(db_path: String) {
    tokio::spawn(async move {
        let conn = Arc::new(Mutex::new(match Connection::open(&db_path) {
            Ok(c) => c,
            Err(e) => {
                log::error!(target: "dealerops::retention", "failed to open DB: {e}");
                return;
            }
        }));
        {
            let db = conn.lock().unwrap_or_else(|e| e.into_inner());
            db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
                .ok();
        }

        tokio::time::sleep(std::time::Duration::from_secs(30)).await;

        loop {
            {
                let db = conn.lock().unwrap_or_else(|e| {
                    log::warn!(target: "dealerops::retention", "DB mutex poisoned, recovering");
                    e.into_inner()
                });
                prune_api_logs(&db);
                reap_idle_impersonation_sessions(&db);
            }
            tokio::time::sleep(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
        }
    });
}

/// Delete API-log rows older than the retention window. Returns rows pruned.
pub fn prune_api_logs(conn: &Connection) -> i64 {
    let cutoff = (chrono::Utc::now() - chrono::Duration::days(API_LOG_MAX_AGE_DAYS)).to_rfc3339();
    match conn.execute(
        "DELETE FROM api_logs WHERE created_at < ?1",
        params![cutoff],
    ) {
        Ok(n) => {
            if n > 0 {
                log::info!(target: "dealerops::retention", "pruned {n} api_logs rows");
            }
            n as i64
        }
        Err(e) => {
            log::warn!(target: "dealerops::retention", "api_logs prune failed: {e}");
            0
        }
    }
}

/// End impersonation sessions idle past `IMPERSONATION_IDLE_HOURS` so an
/// abandoned session doesn't block a super_admin from starting a new one
/// (SPEC_FULL §11).
pub fn reap_idle_impersonation_sessions(conn: &Connection) -> i64 {
    let cutoff = (chrono::Utc::now() - chrono::Duration::hours(IMPERSONATION_IDLE_HOURS)).to_rfc3339();
    let now = chrono::Utc::now().to_rfc3339();
    match conn.execute(
        "UPDATE impersonation_sessions SET ended_at = ?1 WHERE ended_at IS NULL AND started_at < ?2",
        params![now, cutoff],
    ) {
        Ok(n) => {
            if n > 0 {
                log::info!(target: "dealerops::retention", "reaped {n} idle impersonation sessions");
            }
            n as i64
        }
        Err(e) => {
            log::warn!(target: "dealerops::retention", "impersonation reap failed: {e}");
            0
        }
    }
}
