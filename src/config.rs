//! Process bootstrap configuration (spec §6, §9 "Config surface"). Only
//! process-wide knobs live here; tenant-configurable knobs live in Store rows.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub blob_bucket: String,
    pub log_level: String,
    /// Daily posting cap per (user, dealership), overridable per-dealership in Store.
    pub default_posting_cap: u32,
    /// Local hour (0-23) the scheduler fires the daily scrape sweep.
    pub scrape_hour_local: u32,

    pub crm_base_url: String,
    pub crm_api_key: String,
    pub ai_base_url: String,
    pub ai_api_key: String,
    pub email_base_url: String,
    pub email_api_key: String,
    pub email_from_address: String,
    pub blob_base_url: String,
    pub browser_automation_base_url: String,
    pub browser_automation_api_key: String,
    pub provider_a_base_url: String,
    pub provider_b_base_url: String,
    pub provider_c_endpoint: String,
    pub provider_d_endpoint: String,
}

impl Config {
    /// Load from environment, panicking with a descriptive message if a
    /// required variable is absent. Called once at process startup.
    pub fn from_env() -> Self {
        Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/dealerops.db".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set (process bootstrap config, spec §6)"),
            blob_bucket: env::var("BLOB_BUCKET").unwrap_or_else(|_| "dealerops-vehicles".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            default_posting_cap: env::var("DEFAULT_POSTING_CAP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            scrape_hour_local: env::var("SCRAPE_HOUR_LOCAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),

            crm_base_url: env::var("CRM_BASE_URL").unwrap_or_default(),
            crm_api_key: env::var("CRM_API_KEY").unwrap_or_default(),
            ai_base_url: env::var("AI_BASE_URL").unwrap_or_default(),
            ai_api_key: env::var("AI_API_KEY").unwrap_or_default(),
            email_base_url: env::var("EMAIL_BASE_URL").unwrap_or_default(),
            email_api_key: env::var("EMAIL_API_KEY").unwrap_or_default(),
            email_from_address: env::var("EMAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "no-reply@dealerops.local".to_string()),
            blob_base_url: env::var("BLOB_BASE_URL").unwrap_or_default(),
            browser_automation_base_url: env::var("BROWSER_AUTOMATION_BASE_URL").unwrap_or_default(),
            browser_automation_api_key: env::var("BROWSER_AUTOMATION_API_KEY").unwrap_or_default(),
            provider_a_base_url: env::var("PROVIDER_A_BASE_URL").unwrap_or_default(),
            provider_b_base_url: env::var("PROVIDER_B_BASE_URL").unwrap_or_default(),
            provider_c_endpoint: env::var("PROVIDER_C_ENDPOINT").unwrap_or_default(),
            provider_d_endpoint: env::var("PROVIDER_D_ENDPOINT").unwrap_or_default(),
        }
    }

    /// Config suitable for tests: fixed secret, no env dependency. Exposed
    /// (not `#[cfg(test)]`-gated) so the integration test suite in `tests/`
    /// can build a full `rocket()` instance against an isolated database.
    pub fn for_tests() -> Self {
        Config {
            database_url: ":memory:".to_string(),
            jwt_secret: "test-secret-do-not-use-in-production".to_string(),
            blob_bucket: "test-bucket".to_string(),
            log_level: "debug".to_string(),
            default_posting_cap: 10,
            scrape_hour_local: 3,

            crm_base_url: "http://localhost".to_string(),
            crm_api_key: "test".to_string(),
            ai_base_url: "http://localhost".to_string(),
            ai_api_key: "test".to_string(),
            email_base_url: "http://localhost".to_string(),
            email_api_key: "test".to_string(),
            email_from_address: "no-reply@dealerops.local".to_string(),
            blob_base_url: "http://localhost".to_string(),
            browser_automation_base_url: "http://localhost".to_string(),
            browser_automation_api_key: "test".to_string(),
            provider_a_base_url: "http://localhost".to_string(),
            provider_b_base_url: "http://localhost".to_string(),
            provider_c_endpoint: "http://localhost".to_string(),
            provider_d_endpoint: "http://localhost".to_string(),
        }
    }
}
