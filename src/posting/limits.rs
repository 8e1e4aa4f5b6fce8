//! Posting daily limits (spec §4.5): a hard per-user-per-dealership-per-day
//! cap on successful posts, enforced server-side at token issuance because
//! the client is untrusted.

use crate::db::Store;
use crate::store;

pub const DEFAULT_DAILY_CAP: i64 = 10;

pub struct LimitStatus {
    pub posted_today: i64,
    pub minted_today: i64,
    pub cap: i64,
    pub remaining: i64,
}

pub(crate) fn start_of_today(now: chrono::DateTime<chrono::Utc>) -> String {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
        .to_rfc3339()
}

pub fn status(store: &Store, user_id: i64, cap: i64, now: chrono::DateTime<chrono::Utc>) -> LimitStatus {
    let since = start_of_today(now);
    let posted_today = store::posting::posted_count_since(store, user_id, &since);
    let minted_today = store::posting::tokens_minted_since(store, user_id, &since);
    let remaining = (cap - posted_today).max(0);
    LimitStatus { posted_today, minted_today, cap, remaining }
}

/// Cheap fail-fast before the vehicle lookup in `tokens::mint`; not the
/// actual cap enforcement. The real gate is the count-and-insert in
/// `store::posting::mint_token`, which also counts outstanding unredeemed
/// tokens so two concurrent mints at the cap can't both succeed.
pub fn would_exceed(store: &Store, user_id: i64, cap: i64, now: chrono::DateTime<chrono::Utc>) -> bool {
    let since = start_of_today(now);
    let posted_today = store::posting::posted_count_since(store, user_id, &since);
    posted_today >= cap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    #[test]
    fn remaining_is_cap_minus_posted() {
        let store = Store::new(":memory:");
        let status = status(&store, 1, DEFAULT_DAILY_CAP, chrono::Utc::now());
        assert_eq!(status.remaining, DEFAULT_DAILY_CAP);
        assert_eq!(status.posted_today, 0);
    }
}
