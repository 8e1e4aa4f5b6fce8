//! Single-use posting tokens (spec §4.5): re-check the limit, verify the
//! vehicle belongs to the dealership, mint a token bound to
//! `(userId, vehicleId, platform)` with a short TTL.

use super::limits::{self, DEFAULT_DAILY_CAP};
use crate::auth::tokens::generate_posting_token;
use crate::db::Store;
use crate::errors::{ApiError, ApiResult};
use crate::models::PostingToken;
use crate::store;

pub const TOKEN_TTL_MINUTES: i64 = 15;

pub async fn mint(
    store: &Store,
    dealership_id: i64,
    user_id: i64,
    vehicle_id: i64,
    platform: &str,
    cap: Option<i64>,
    now: chrono::DateTime<chrono::Utc>,
) -> ApiResult<PostingToken> {
    let cap = cap.unwrap_or(DEFAULT_DAILY_CAP);
    if limits::would_exceed(store, user_id, cap, now) {
        return Err(ApiError::Conflict("daily posting limit reached".to_string()));
    }

    // Verifies the vehicle belongs to this dealership; a cross-tenant
    // vehicle id surfaces as NotFound, not Forbidden (spec §4.2).
    store::vehicles::get(store, dealership_id, vehicle_id)?;

    let token = generate_posting_token();
    let expires_at = (now + chrono::Duration::minutes(TOKEN_TTL_MINUTES)).to_rfc3339();
    let now_str = now.to_rfc3339();
    let since = limits::start_of_today(now);
    store::posting::mint_token(
        store, &token, dealership_id, user_id, vehicle_id, platform, &expires_at, &now_str, &since, cap,
    )
    .map_err(ApiError::from)
}

/// Consume a token after a successful browser-delegated post (spec §4.5).
/// Returns `Err` unchanged if the token is already used, expired, or unknown.
pub fn redeem(store: &Store, token: &str, now: chrono::DateTime<chrono::Utc>) -> ApiResult<PostingToken> {
    store::posting::redeem_token(store, token, &now.to_rfc3339()).map_err(ApiError::from)
}
