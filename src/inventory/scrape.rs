//! Scrape orchestration (spec §4.4): drive the provider fallback chain over
//! a dealership's configured source URLs, extract VDP links and per-VDP
//! vehicle fields, then hand the results to `merge` and `images`.
//!
//! Extraction is regex-based against per-source patterns rather than a
//! full HTML/CSS selector engine: the one example repo in this pack's
//! corpus that pulls in a DOM-selector crate is a single non-teacher
//! manifest, not the chosen teacher's stack, so a regex approach stays
//! closer to what this codebase actually reaches for elsewhere (see
//! `conversation::mining`).

use super::merge::{self, ScrapedVehicle};
use super::providers::fetch_with_fallback;
use crate::adapters::provider::Provider;
use crate::db::Store;
use crate::errors::StoreError;
use crate::models::TriggeredBy;
use crate::store;
use regex::Regex;

/// Per-source extraction rules. A dealership with a custom VDP template
/// supplies its own patterns; absent that, `default_selectors` covers the
/// common case of a generic HTML listing page.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub source_url: String,
    pub vdp_link_pattern: String,
    pub field_patterns: FieldPatterns,
}

#[derive(Debug, Clone)]
pub struct FieldPatterns {
    pub year_make_model: String,
    pub price: String,
    pub odometer: String,
    pub vin: String,
    pub stock_number: String,
    pub image: String,
}

pub const DEFAULT_VDP_LINK_PATTERN: &str = r#"href="([^"]+/vdp/[^"]+)""#;

impl SourceConfig {
    /// Builds a source from just a listing URL, using the generic VDP-link
    /// and field patterns (manual webhook triggers rarely carry a dealer's
    /// custom template, spec §6 `POST /webhooks/trigger-scrape`).
    pub fn from_url(source_url: impl Into<String>) -> Self {
        SourceConfig {
            source_url: source_url.into(),
            vdp_link_pattern: DEFAULT_VDP_LINK_PATTERN.to_string(),
            field_patterns: FieldPatterns::default(),
        }
    }
}

impl Default for FieldPatterns {
    fn default() -> Self {
        FieldPatterns {
            year_make_model: r#"data-year="(\d{4})"\s+data-make="([^"]+)"\s+data-model="([^"]+)""#.to_string(),
            price: r#"data-price="(\d+)""#.to_string(),
            odometer: r#"data-odometer="(\d+)""#.to_string(),
            vin: r#"data-vin="([A-HJ-NPR-Z0-9]{17})""#.to_string(),
            stock_number: r#"data-stock="([^"]+)""#.to_string(),
            image: r#"data-image="([^"]+)""#.to_string(),
        }
    }
}

pub fn extract_vdp_links(html: &str, pattern: &str) -> Vec<String> {
    let Ok(re) = Regex::new(pattern) else { return Vec::new() };
    re.captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

pub fn extract_vehicle(html: &str, patterns: &FieldPatterns) -> Option<ScrapedVehicle> {
    let ymm = Regex::new(&patterns.year_make_model).ok()?;
    let caps = ymm.captures(html)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let make = caps.get(2)?.as_str().to_string();
    let model = caps.get(3)?.as_str().to_string();

    let price = Regex::new(&patterns.price)
        .ok()
        .and_then(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let odometer = Regex::new(&patterns.odometer)
        .ok()
        .and_then(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let vin = Regex::new(&patterns.vin)
        .ok()
        .and_then(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let stock_number = Regex::new(&patterns.stock_number)
        .ok()
        .and_then(|re| re.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let images: Vec<String> = Regex::new(&patterns.image)
        .ok()
        .map(|re| {
            re.captures_iter(html)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect()
        })
        .unwrap_or_default();

    Some(ScrapedVehicle {
        year,
        make,
        model,
        trim: None,
        vehicle_type: None,
        price,
        odometer,
        vin,
        stock_number,
        images,
        carfax_url: None,
        dealer_vdp_url: None,
    })
}

pub struct ScrapeSummary {
    pub run_id: i64,
    pub found: i64,
    pub inserted: i64,
    pub updated: i64,
    pub deleted: i64,
    pub method: Option<&'static str>,
}

/// Run a full scrape for `dealership_id` across `sources`, using `chain` as
/// the ordered provider fallback list (spec §4.4).
pub async fn run(
    store: &Store,
    dealership_id: i64,
    sources: &[SourceConfig],
    chain: &[Box<dyn Provider>],
    blob: &crate::adapters::blob::BlobAdapter,
    triggered_by: TriggeredBy,
) -> Result<ScrapeSummary, StoreError> {
    let now = chrono::Utc::now().to_rfc3339();
    let run = store::scrapes::start(store, dealership_id, triggered_by, &now)?;

    let mut found = 0i64;
    let mut inserted = 0i64;
    let mut updated = 0i64;
    let mut method_used: Option<&'static str> = None;
    let mut seen_vins: Vec<String> = Vec::new();

    for source in sources {
        let Some(outcome) = fetch_with_fallback(store, dealership_id, &source.source_url, chain, run.id).await
        else {
            log::warn!(target: "dealerops::inventory", "all providers exhausted for {}", source.source_url);
            continue;
        };
        method_used = Some(outcome.method);

        let vdp_urls = extract_vdp_links(&outcome.page.html, &source.vdp_link_pattern);
        for vdp_url in vdp_urls {
            let Some(outcome) = fetch_with_fallback(store, dealership_id, &vdp_url, chain, run.id).await else {
                continue;
            };
            let Some(mut scraped) = extract_vehicle(&outcome.page.html, &source.field_patterns) else {
                continue;
            };
            scraped.dealer_vdp_url = Some(vdp_url);
            found += 1;

            let Some(vin) = scraped.vin.clone() else { continue };
            if !merge::valid_vin(&vin) {
                continue;
            }
            seen_vins.push(vin.clone());

            let existing = store::vehicles::find_by_vin(store, dealership_id, &vin);
            let is_new = existing.is_none();
            let mut merged = merge::merge(existing.as_ref(), &scraped, &now);
            merged.dealership_id = dealership_id;

            let persisted = store::vehicles::upsert_by_vin(store, dealership_id, &merged, &now)?;
            super::images::persist_for_vehicle(store, dealership_id, &persisted, blob).await;

            if is_new {
                inserted += 1;
            } else {
                updated += 1;
            }
        }
    }

    let deleted = if !seen_vins.is_empty() {
        store::vehicles::delete_missing_from_vins(store, dealership_id, &seen_vins)
            .map(|(count, _)| count)
            .unwrap_or(0)
    } else {
        0
    };

    let ended = chrono::Utc::now().to_rfc3339();
    store::scrapes::finish(store, run.id, method_used, found, inserted, updated, deleted, None, &ended)?;

    Ok(ScrapeSummary { run_id: run.id, found, inserted, updated, deleted, method: method_used })
}

/// Used by route handlers that want the freshly persisted row set, e.g. to
/// broadcast an `inventory_sync` event with a vehicle count.
pub fn latest_vehicle_count(store: &Store, dealership_id: i64) -> i64 {
    store::vehicles::list(store, dealership_id, 1, 0).total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_vdp_links_from_listing_html() {
        let html = r#"<a class="vdp" href="/vdp/123">2020 Camry</a><a href="/vdp/456">2021 Civic</a>"#;
        let links = extract_vdp_links(html, r#"href="(/vdp/\d+)""#);
        assert_eq!(links, vec!["/vdp/123".to_string(), "/vdp/456".to_string()]);
    }

    #[test]
    fn extracts_vehicle_fields_from_vdp_html() {
        let html = r#"<div data-year="2021" data-make="Honda" data-model="Civic" data-price="22000"
             data-odometer="1500" data-vin="2HGFC2F59MH123456" data-stock="S99"
             data-image="https://ext/1.jpg" data-image="https://ext/2.jpg"></div>"#;
        let vehicle = extract_vehicle(html, &FieldPatterns::default()).unwrap();
        assert_eq!(vehicle.year, 2021);
        assert_eq!(vehicle.make, "Honda");
        assert_eq!(vehicle.vin.as_deref(), Some("2HGFC2F59MH123456"));
        assert_eq!(vehicle.price, 22000);
        assert_eq!(vehicle.images.len(), 2);
    }

    #[test]
    fn missing_required_fields_yields_none() {
        let html = r#"<div data-price="1000"></div>"#;
        assert!(extract_vehicle(html, &FieldPatterns::default()).is_none());
    }
}
