//! Store operations (C1, spec §4.1): one typed function per access pattern,
//! grouped by the aggregate they touch. Every tenant-scoped function takes
//! `dealership_id` and returns `StoreError::NotFound` (never a forbidden) for
//! a cross-tenant row, so callers can't distinguish "doesn't exist" from
//! "belongs to someone else".

pub mod api_logs;
pub mod api_tokens;
pub mod audit;
pub mod conversations;
pub mod dealerships;
pub mod external_accounts;
pub mod messages;
pub mod posting;
pub mod scrapes;
pub mod sessions;
pub mod users;
pub mod vehicles;

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned + Default>(raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_default()
}
