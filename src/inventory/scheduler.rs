//! Scrape scheduler (spec §4.4): a process-wide timer triggers a scrape per
//! active dealership on a configurable daily cadence. Manual triggers reuse
//! `scrape::run` directly; this module only owns the timer loop, mirroring
//! the shape of `retention::spawn_maintenance_task`.

use super::scrape::{self, SourceConfig};
use crate::adapters::blob::BlobAdapter;
use crate::adapters::provider::Provider;
use crate::db::Store;
use crate::models::{NotificationType, TriggeredBy};
use crate::realtime::{self, WsHub};
use chrono::Timelike;
use std::sync::Arc;

const POLL_INTERVAL_SECS: u64 = 900;

/// One dealership's scrape configuration: its source list and which hour
/// (0-23, server-local) the daily scrape should run at.
pub struct DealershipScrapeConfig {
    pub dealership_id: i64,
    pub sources: Vec<SourceConfig>,
    pub hour_local: u32,
}

fn summary_message(summary: &scrape::ScrapeSummary) -> String {
    format!(
        "found {}, inserted {}, updated {}, deleted {}",
        summary.found, summary.inserted, summary.updated, summary.deleted
    )
}

/// Spawn the daily-cadence timer. Polls every `POLL_INTERVAL_SECS` and runs
/// a scrape for any dealership whose configured hour matches the current
/// hour and hasn't already run today.
pub fn spawn(
    store: Arc<Store>,
    hub: Arc<WsHub>,
    blob: Arc<BlobAdapter>,
    chain_factory: impl Fn() -> Vec<Box<dyn Provider>> + Send + Sync + 'static,
    configs: Vec<DealershipScrapeConfig>,
) {
    tokio::spawn(async move {
        let mut last_run_day: std::collections::HashMap<i64, chrono::NaiveDate> = std::collections::HashMap::new();
        loop {
            let now = chrono::Utc::now();
            for config in &configs {
                if now.hour() != config.hour_local {
                    continue;
                }
                let today = now.date_naive();
                if last_run_day.get(&config.dealership_id) == Some(&today) {
                    continue;
                }
                last_run_day.insert(config.dealership_id, today);

                let chain = chain_factory();
                match scrape::run(&store, config.dealership_id, &config.sources, &chain, &blob, TriggeredBy::Schedule)
                    .await
                {
                    Ok(summary) => {
                        hub.broadcast(
                            config.dealership_id,
                            realtime::notification(
                                NotificationType::InventorySync,
                                "Inventory sync complete",
                                summary_message(&summary),
                                Some(serde_json::json!({"scrapeRunId": summary.run_id})),
                                chrono::Utc::now(),
                            ),
                        );
                    }
                    Err(e) => {
                        log::error!(
                            target: "dealerops::inventory",
                            "scheduled scrape failed for dealership {}: {e}",
                            config.dealership_id
                        );
                    }
                }
            }
            tokio::time::sleep(std::time::Duration::from_secs(POLL_INTERVAL_SECS)).await;
        }
    });
}

/// Manual trigger: same pathway, outside the timer loop (spec §4.4:
/// "manual triggers enqueue the same pathway").
pub async fn trigger_manual(
    store: &Store,
    hub: &WsHub,
    blob: &BlobAdapter,
    dealership_id: i64,
    sources: &[SourceConfig],
    chain: &[Box<dyn Provider>],
) -> Result<scrape::ScrapeSummary, crate::errors::StoreError> {
    let summary = scrape::run(store, dealership_id, sources, chain, blob, TriggeredBy::Manual).await?;
    hub.broadcast(
        dealership_id,
        realtime::notification(
            NotificationType::InventorySync,
            "Inventory sync complete",
            summary_message(&summary),
            Some(serde_json::json!({"scrapeRunId": summary.run_id})),
            chrono::Utc::now(),
        ),
    );
    Ok(summary)
}
