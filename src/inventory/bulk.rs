//! Bulk import and bulk sync (spec §4.4): the external-API-token ingestion
//! paths, as distinct from the scrape pipeline in `scrape.rs`.

use super::merge::{self, ScrapedVehicle};
use crate::db::Store;
use crate::errors::ApiError;
use crate::store;
use serde::{Deserialize, Serialize};

pub const MAX_BULK_ITEMS: usize = 100;
const DELETE_THRESHOLD_PCT: f64 = 0.5;

#[derive(Debug, Deserialize)]
pub struct BulkVehicleRecord {
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    #[serde(rename = "type")]
    pub vehicle_type: Option<String>,
    pub price: i64,
    pub odometer: i64,
    pub vin: String,
    #[serde(rename = "stockNumber")]
    pub stock_number: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct BulkItemError {
    pub index: usize,
    pub vin: Option<String>,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResult {
    pub imported: i64,
    pub failed: i64,
    pub errors: Vec<BulkItemError>,
}

/// Import up to `MAX_BULK_ITEMS` vehicle records. A bad record never aborts
/// the batch; its error is collected and the rest proceed (spec §4.4).
pub fn import(
    store: &Store,
    dealership_id: i64,
    records: &[BulkVehicleRecord],
    update_existing: bool,
) -> Result<BulkImportResult, ApiError> {
    if records.len() > MAX_BULK_ITEMS {
        return Err(ApiError::Input(format!(
            "at most {MAX_BULK_ITEMS} vehicle records per call, got {}",
            records.len()
        )));
    }

    let mut created = 0i64;
    let mut updated = 0i64;
    let mut errors = Vec::new();
    let now = chrono::Utc::now().to_rfc3339();

    for (index, record) in records.iter().enumerate() {
        if record.make.is_empty() || record.model.is_empty() || record.year <= 0 {
            errors.push(BulkItemError {
                index,
                vin: Some(record.vin.clone()),
                error: "year, make, and model are required".to_string(),
            });
            continue;
        }
        if !merge::valid_vin(&record.vin) {
            errors.push(BulkItemError {
                index,
                vin: Some(record.vin.clone()),
                error: "vin must be 17 characters".to_string(),
            });
            continue;
        }

        let existing = store::vehicles::find_by_vin(store, dealership_id, &record.vin);
        if existing.is_some() && !update_existing {
            errors.push(BulkItemError {
                index,
                vin: Some(record.vin.clone()),
                error: "vehicle already exists for this vin".to_string(),
            });
            continue;
        }

        let scraped = ScrapedVehicle {
            year: record.year,
            make: record.make.clone(),
            model: record.model.clone(),
            trim: record.trim.clone(),
            vehicle_type: record.vehicle_type.clone(),
            price: record.price,
            odometer: record.odometer,
            vin: Some(record.vin.clone()),
            stock_number: record.stock_number.clone(),
            images: record.images.clone().unwrap_or_default(),
            carfax_url: None,
            dealer_vdp_url: None,
        };
        let is_new = existing.is_none();
        let mut merged = merge::merge(existing.as_ref(), &scraped, &now);
        merged.dealership_id = dealership_id;

        match store::vehicles::upsert_by_vin(store, dealership_id, &merged, &now) {
            Ok(_) => {
                if is_new {
                    created += 1;
                } else {
                    updated += 1;
                }
            }
            Err(e) => errors.push(BulkItemError { index, vin: Some(record.vin.clone()), error: e.to_string() }),
        }
    }

    Ok(BulkImportResult { imported: created + updated, failed: errors.len() as i64, errors })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub would_delete: i64,
    pub deleted: i64,
    pub deleted_vins: Vec<String>,
    pub dry_run: bool,
}

/// Delete-subtract sync: remove every vehicle not present in `vins`
/// (spec §4.4). Refuses an empty `vins` unconditionally, and refuses a
/// would-delete beyond 50% of current inventory unless `confirm_delete`.
pub fn sync(
    store: &Store,
    dealership_id: i64,
    vins: &[String],
    dry_run: bool,
    confirm_delete: bool,
) -> Result<SyncResult, ApiError> {
    if vins.is_empty() {
        return Err(ApiError::Input("vins must not be empty".to_string()));
    }

    let existing_vins = store::vehicles::all_vins(store, dealership_id);
    let keep: std::collections::HashSet<&String> = vins.iter().collect();
    let would_delete = existing_vins.iter().filter(|v| !keep.contains(v)).count() as i64;

    if dry_run {
        return Ok(SyncResult { would_delete, deleted: 0, deleted_vins: Vec::new(), dry_run: true });
    }

    if !existing_vins.is_empty() {
        let ratio = would_delete as f64 / existing_vins.len() as f64;
        if ratio > DELETE_THRESHOLD_PCT && !confirm_delete {
            return Err(ApiError::Input(format!(
                "would delete {would_delete} of {} vehicles ({:.0}%); pass confirmDelete to proceed",
                existing_vins.len(),
                ratio * 100.0
            )));
        }
    }

    let (deleted, deleted_vins) = store::vehicles::delete_missing_from_vins(store, dealership_id, vins)?;
    Ok(SyncResult { would_delete, deleted, deleted_vins, dry_run: false })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::new(":memory:")
    }

    fn seed(store: &Store, dealership_id: i64, vin: &str) {
        let records = vec![BulkVehicleRecord {
            year: 2021,
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            trim: None,
            vehicle_type: None,
            price: 18000,
            odometer: 500,
            vin: vin.to_string(),
            stock_number: None,
            images: None,
        }];
        import(store, dealership_id, &records, false).unwrap();
    }

    #[test]
    fn rejects_over_limit_batch() {
        let store = store();
        let dealership_id = seed_dealership(&store);
        let records: Vec<BulkVehicleRecord> = (0..MAX_BULK_ITEMS + 1)
            .map(|i| BulkVehicleRecord {
                year: 2021,
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                trim: None,
                vehicle_type: None,
                price: 18000,
                odometer: 500,
                vin: format!("1HGCM82633A0{i:05}"),
                stock_number: None,
                images: None,
            })
            .collect();
        assert!(import(&store, dealership_id, &records, false).is_err());
    }

    #[test]
    fn collects_per_item_errors_without_aborting_batch() {
        let store = store();
        let dealership_id = seed_dealership(&store);
        let records = vec![
            BulkVehicleRecord {
                year: 2021,
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                trim: None,
                vehicle_type: None,
                price: 18000,
                odometer: 500,
                vin: "1HGCM82633A004352".to_string(),
                stock_number: None,
                images: None,
            },
            BulkVehicleRecord {
                year: 2021,
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                trim: None,
                vehicle_type: None,
                price: 18000,
                odometer: 500,
                vin: "short".to_string(),
                stock_number: None,
                images: None,
            },
        ];
        let result = import(&store, dealership_id, &records, false).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn sync_refuses_empty_vins() {
        let store = store();
        let dealership_id = seed_dealership(&store);
        assert!(sync(&store, dealership_id, &[], false, false).is_err());
    }

    #[test]
    fn sync_refuses_majority_delete_without_confirm() {
        let store = store();
        let dealership_id = seed_dealership(&store);
        seed(&store, dealership_id, "1HGCM82633A004352");
        seed(&store, dealership_id, "1HGCM82633A004353");
        let result = sync(&store, dealership_id, &["1HGCM82633A004352".to_string()], false, false);
        assert!(result.is_err());
    }

    #[test]
    fn sync_dry_run_never_mutates() {
        let store = store();
        let dealership_id = seed_dealership(&store);
        seed(&store, dealership_id, "1HGCM82633A004352");
        let result = sync(&store, dealership_id, &["1HGCM82633A004999".to_string()], true, false).unwrap();
        assert_eq!(result.would_delete, 1);
        assert_eq!(result.deleted, 0);
        assert_eq!(store::vehicles::all_vins(&store, dealership_id).len(), 1);
    }

    fn seed_dealership(store: &Store) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();
        store::dealerships::create(store, "test-dealer", "test", "Test Dealer", "scrape-secret", "crm-secret", 10, &now)
            .unwrap()
            .id
    }
}
