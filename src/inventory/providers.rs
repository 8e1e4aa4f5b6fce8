//! Fallback-chain driver (spec §4.4, §9): try providers A, B, C, D in
//! order, first success wins. The providers themselves live in
//! `adapters::provider`; this module only owns the ordered retry budget.

use crate::adapters::provider::{FetchedPage, Provider};
use crate::db::Store;

const RETRY_BUDGET: u32 = 3;

pub struct FetchOutcome {
    pub page: FetchedPage,
    pub method: &'static str,
}

/// Try each provider in order. Each attempt counts against the shared
/// `RETRY_BUDGET` regardless of which provider made it — the budget is a
/// per-scrape-run total, not a per-provider allowance (spec §4.4).
pub async fn fetch_with_fallback(
    store: &Store,
    dealership_id: i64,
    source_url: &str,
    chain: &[Box<dyn Provider>],
    scrape_run_id: i64,
) -> Option<FetchOutcome> {
    let mut attempts = 0u32;
    for provider in chain {
        if attempts >= RETRY_BUDGET {
            break;
        }
        attempts += 1;
        let result = provider.fetch(store, dealership_id, source_url).await;
        if attempts > 1 {
            crate::store::scrapes::record_retry(store, scrape_run_id).ok();
        }
        if let Some(page) = result.data {
            return Some(FetchOutcome { page, method: provider.name() });
        }
        log::warn!(
            target: "dealerops::inventory",
            "provider {} failed for {source_url}: {:?}",
            provider.name(), result.error
        );
    }
    None
}
