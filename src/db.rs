//! `Store` (C1): durable state behind typed operations, never raw rows (spec §4.1).
//! Schema lives here; operations live in `crate::store::*`.

use rusqlite::Connection;
use std::sync::Mutex;

pub struct Store {
    pub conn: Mutex<Connection>,
}

impl Store {
    pub fn new(path: &str) -> Self {
        let conn = if path == ":memory:" {
            Connection::open_in_memory().expect("failed to open in-memory database")
        } else {
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent).ok();
            }
            Connection::open(path).expect("failed to open database")
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .ok();
        let store = Store {
            conn: Mutex::new(conn),
        };
        store.migrate();
        store
    }

    fn migrate(&self) {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS dealerships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL UNIQUE,
                subdomain TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                scrape_webhook_secret TEXT NOT NULL,
                crm_webhook_secret TEXT NOT NULL,
                posting_cap_per_day INTEGER NOT NULL DEFAULT 10,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                dealership_id INTEGER REFERENCES dealerships(id),
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_dealership ON users(dealership_id);

            CREATE TABLE IF NOT EXISTS external_api_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER NOT NULL REFERENCES dealerships(id),
                token_name TEXT NOT NULL,
                token_hash TEXT NOT NULL,
                token_prefix TEXT NOT NULL,
                permissions TEXT NOT NULL DEFAULT '[]',
                expires_at TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_used_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tokens_prefix ON external_api_tokens(token_prefix);
            CREATE INDEX IF NOT EXISTS idx_tokens_dealership ON external_api_tokens(dealership_id);

            CREATE TABLE IF NOT EXISTS vehicles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER NOT NULL REFERENCES dealerships(id),
                year INTEGER NOT NULL,
                make TEXT NOT NULL,
                model TEXT NOT NULL,
                trim TEXT,
                type TEXT,
                price INTEGER NOT NULL DEFAULT 0,
                odometer INTEGER NOT NULL DEFAULT 0,
                vin TEXT,
                stock_number TEXT,
                images TEXT NOT NULL DEFAULT '[]',
                local_images TEXT NOT NULL DEFAULT '[]',
                carfax_url TEXT,
                dealer_vdp_url TEXT,
                last_scraped_at TEXT,
                marketplace_posted_at TEXT,
                social_templates TEXT,
                manual_headline TEXT,
                manual_subheadline TEXT,
                manual_description TEXT,
                is_manually_edited INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_vehicles_dealership ON vehicles(dealership_id);
            CREATE INDEX IF NOT EXISTS idx_vehicles_vin ON vehicles(dealership_id, vin);

            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER NOT NULL REFERENCES dealerships(id),
                channel TEXT NOT NULL,
                participant_id TEXT NOT NULL,
                page_access_token TEXT,
                assigned_to_user_id INTEGER,
                ai_enabled INTEGER NOT NULL DEFAULT 1,
                ai_watch_mode INTEGER NOT NULL DEFAULT 0,
                lead_status TEXT NOT NULL DEFAULT 'new',
                pipeline_stage TEXT NOT NULL DEFAULT 'new',
                tags TEXT NOT NULL DEFAULT '[]',
                handoff_name TEXT,
                handoff_phone TEXT,
                handoff_email TEXT,
                ghl_contact_id TEXT,
                last_message TEXT,
                last_message_at TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(dealership_id, channel, participant_id)
            );
            CREATE INDEX IF NOT EXISTS idx_conversations_dealership ON conversations(dealership_id);

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER NOT NULL REFERENCES dealerships(id),
                conversation_id INTEGER NOT NULL REFERENCES conversations(id),
                external_message_id TEXT,
                ghl_message_id TEXT,
                direction TEXT NOT NULL,
                sender_name TEXT,
                content TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                sent_at TEXT NOT NULL,
                sync_source TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_dedup_ext
                ON messages(dealership_id, external_message_id)
                WHERE external_message_id IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_dedup_ghl
                ON messages(dealership_id, ghl_message_id)
                WHERE ghl_message_id IS NOT NULL;

            CREATE TABLE IF NOT EXISTS posting_queue_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER NOT NULL REFERENCES dealerships(id),
                user_id INTEGER NOT NULL,
                vehicle_id INTEGER NOT NULL,
                account_id TEXT NOT NULL,
                template_id TEXT,
                status TEXT NOT NULL DEFAULT 'queued',
                priority INTEGER NOT NULL DEFAULT 100,
                attempt_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                scheduled_for TEXT,
                posted_at TEXT,
                external_listing_id TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posting_queue_ready
                ON posting_queue_items(status, priority, created_at);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_posting_listing
                ON posting_queue_items(vehicle_id, account_id)
                WHERE status = 'posted';

            CREATE TABLE IF NOT EXISTS posting_tokens (
                token TEXT PRIMARY KEY,
                dealership_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                vehicle_id INTEGER NOT NULL,
                platform TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                used_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posting_tokens_user_day
                ON posting_tokens(user_id, created_at);

            CREATE TABLE IF NOT EXISTS scrape_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER NOT NULL REFERENCES dealerships(id),
                triggered_by TEXT NOT NULL,
                method TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                vehicles_found INTEGER NOT NULL DEFAULT 0,
                vehicles_inserted INTEGER NOT NULL DEFAULT 0,
                vehicles_updated INTEGER NOT NULL DEFAULT 0,
                vehicles_deleted INTEGER NOT NULL DEFAULT 0,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                error TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_scrape_runs_dealership ON scrape_runs(dealership_id);

            CREATE TABLE IF NOT EXISTS audit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER,
                user_id INTEGER NOT NULL,
                action TEXT NOT NULL,
                resource TEXT NOT NULL,
                resource_id TEXT,
                details TEXT,
                ip_address TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_dealership ON audit_logs(dealership_id);

            CREATE TABLE IF NOT EXISTS impersonation_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                super_admin_id INTEGER NOT NULL,
                target_user_id INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                actions_performed INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_impersonation_active
                ON impersonation_sessions(super_admin_id, ended_at);

            CREATE TABLE IF NOT EXISTS password_reset_tokens (
                token_hash TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TEXT NOT NULL,
                used_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS external_accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER NOT NULL REFERENCES dealerships(id),
                kind TEXT NOT NULL,
                external_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(kind, external_id)
            );

            CREATE TABLE IF NOT EXISTS api_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dealership_id INTEGER,
                adapter TEXT NOT NULL,
                operation TEXT NOT NULL,
                success INTEGER NOT NULL,
                status_code INTEGER,
                latency_ms INTEGER NOT NULL,
                error TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_api_logs_created ON api_logs(created_at);
            ",
        )
        .expect("failed to run migrations");
    }
}
