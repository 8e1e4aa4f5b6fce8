//! Vehicle inventory rows (spec §3, §4.1, §4.4).

use super::{decode_json, encode_json};
use crate::db::Store;
use crate::errors::StoreError;
use crate::models::Vehicle;
use rusqlite::{params, OptionalExtension, Row};

fn from_row(row: &Row) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: row.get("id")?,
        dealership_id: row.get("dealership_id")?,
        year: row.get("year")?,
        make: row.get("make")?,
        model: row.get("model")?,
        trim: row.get("trim")?,
        vehicle_type: row.get("type")?,
        price: row.get("price")?,
        odometer: row.get("odometer")?,
        vin: row.get("vin")?,
        stock_number: row.get("stock_number")?,
        images: decode_json(&row.get::<_, String>("images")?),
        local_images: decode_json(&row.get::<_, String>("local_images")?),
        carfax_url: row.get("carfax_url")?,
        dealer_vdp_url: row.get("dealer_vdp_url")?,
        last_scraped_at: row.get("last_scraped_at")?,
        marketplace_posted_at: row.get("marketplace_posted_at")?,
        social_templates: row
            .get::<_, Option<String>>("social_templates")?
            .and_then(|s| serde_json::from_str(&s).ok()),
        manual_headline: row.get("manual_headline")?,
        manual_subheadline: row.get("manual_subheadline")?,
        manual_description: row.get("manual_description")?,
        is_manually_edited: row.get::<_, i64>("is_manually_edited")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get(store: &Store, dealership_id: i64, id: i64) -> Result<Vehicle, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT * FROM vehicles WHERE id = ?1 AND dealership_id = ?2",
        params![id, dealership_id],
        from_row,
    )
    .map_err(StoreError::from)
}

pub fn find_by_vin(store: &Store, dealership_id: i64, vin: &str) -> Option<Vehicle> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    conn.query_row(
        "SELECT * FROM vehicles WHERE dealership_id = ?1 AND vin = ?2",
        params![dealership_id, vin],
        from_row,
    )
    .optional()
    .ok()
    .flatten()
}

pub struct VehiclePage {
    pub items: Vec<Vehicle>,
    pub total: i64,
}

pub fn list(
    store: &Store,
    dealership_id: i64,
    limit: i64,
    offset: i64,
) -> VehiclePage {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let total: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM vehicles WHERE dealership_id = ?1",
            params![dealership_id],
            |r| r.get(0),
        )
        .unwrap_or(0);
    let mut stmt = match conn.prepare(
        "SELECT * FROM vehicles WHERE dealership_id = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
    ) {
        Ok(s) => s,
        Err(_) => return VehiclePage { items: Vec::new(), total },
    };
    let items = stmt
        .query_map(params![dealership_id, limit, offset], from_row)
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default();
    VehiclePage { items, total }
}

pub fn all_vins(store: &Store, dealership_id: i64) -> Vec<String> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let mut stmt = match conn
        .prepare("SELECT vin FROM vehicles WHERE dealership_id = ?1 AND vin IS NOT NULL")
    {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    stmt.query_map(params![dealership_id], |row| row.get(0))
        .map(|rows| rows.filter_map(|r| r.ok()).collect())
        .unwrap_or_default()
}

/// Insert-or-update keyed on `(dealership_id, vin)`, preserving manual edits
/// (spec §4.4: a scrape must never clobber a human-entered headline/description).
/// The caller (`inventory::merge`) decides the final field values; this just persists them.
#[allow(clippy::too_many_arguments)]
pub fn upsert_by_vin(store: &Store, dealership_id: i64, vehicle: &Vehicle, now: &str) -> Result<Vehicle, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let vin = vehicle.vin.as_deref();
    let existing_id: Option<i64> = match vin {
        Some(v) => conn
            .query_row(
                "SELECT id FROM vehicles WHERE dealership_id = ?1 AND vin = ?2",
                params![dealership_id, v],
                |r| r.get(0),
            )
            .optional()?,
        None => None,
    };

    let images = encode_json(&vehicle.images);
    let local_images = encode_json(&vehicle.local_images);
    let social_templates = vehicle
        .social_templates
        .as_ref()
        .map(|v| v.to_string());

    let id = match existing_id {
        Some(id) => {
            conn.execute(
                "UPDATE vehicles SET year=?1, make=?2, model=?3, trim=?4, type=?5, price=?6, odometer=?7,
                 stock_number=?8, images=?9, local_images=?10, carfax_url=?11, dealer_vdp_url=?12,
                 last_scraped_at=?13, social_templates=?14, manual_headline=?15, manual_subheadline=?16,
                 manual_description=?17, is_manually_edited=?18, updated_at=?19
                 WHERE id=?20",
                params![
                    vehicle.year, vehicle.make, vehicle.model, vehicle.trim, vehicle.vehicle_type,
                    vehicle.price, vehicle.odometer, vehicle.stock_number, images, local_images,
                    vehicle.carfax_url, vehicle.dealer_vdp_url, vehicle.last_scraped_at,
                    social_templates, vehicle.manual_headline, vehicle.manual_subheadline,
                    vehicle.manual_description, vehicle.is_manually_edited as i64, now, id,
                ],
            )?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO vehicles (dealership_id, year, make, model, trim, type, price, odometer, vin,
                 stock_number, images, local_images, carfax_url, dealer_vdp_url, last_scraped_at,
                 social_templates, manual_headline, manual_subheadline, manual_description,
                 is_manually_edited, created_at, updated_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22)",
                params![
                    dealership_id, vehicle.year, vehicle.make, vehicle.model, vehicle.trim,
                    vehicle.vehicle_type, vehicle.price, vehicle.odometer, vehicle.vin,
                    vehicle.stock_number, images, local_images, vehicle.carfax_url,
                    vehicle.dealer_vdp_url, vehicle.last_scraped_at, social_templates,
                    vehicle.manual_headline, vehicle.manual_subheadline, vehicle.manual_description,
                    vehicle.is_manually_edited as i64, now, now,
                ],
            )?;
            conn.last_insert_rowid()
        }
    };
    conn.query_row("SELECT * FROM vehicles WHERE id = ?1", params![id], from_row)
        .map_err(StoreError::from)
}

pub fn update_manual_fields(
    store: &Store,
    dealership_id: i64,
    id: i64,
    headline: Option<&str>,
    subheadline: Option<&str>,
    description: Option<&str>,
    now: &str,
) -> Result<Vehicle, StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE vehicles SET manual_headline = ?1, manual_subheadline = ?2, manual_description = ?3,
         is_manually_edited = 1, updated_at = ?4 WHERE id = ?5 AND dealership_id = ?6",
        params![headline, subheadline, description, now, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    conn.query_row("SELECT * FROM vehicles WHERE id = ?1", params![id], from_row)
        .map_err(StoreError::from)
}

pub fn set_local_images(
    store: &Store,
    dealership_id: i64,
    id: i64,
    local_images: &[String],
    now: &str,
) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let encoded = encode_json(&local_images);
    let n = conn.execute(
        "UPDATE vehicles SET local_images = ?1, updated_at = ?2 WHERE id = ?3 AND dealership_id = ?4",
        params![encoded, now, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn set_marketplace_posted_at(store: &Store, dealership_id: i64, id: i64, now: &str) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "UPDATE vehicles SET marketplace_posted_at = ?1, updated_at = ?1 WHERE id = ?2 AND dealership_id = ?3",
        params![now, id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn delete(store: &Store, dealership_id: i64, id: i64) -> Result<(), StoreError> {
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let n = conn.execute(
        "DELETE FROM vehicles WHERE id = ?1 AND dealership_id = ?2",
        params![id, dealership_id],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Delete every vehicle in `dealership_id` whose VIN is not in `keep_vins`,
/// returning the deleted count and the VINs themselves (spec §4.1:
/// `deleteVehiclesByVinNotIn(...) → {deletedCount, deletedVins[]}`).
/// Refuses to run when `keep_vins` is empty — an empty scrape result must
/// never be allowed to wipe the whole lot.
pub fn delete_missing_from_vins(
    store: &Store,
    dealership_id: i64,
    keep_vins: &[String],
) -> Result<(i64, Vec<String>), StoreError> {
    if keep_vins.is_empty() {
        return Err(StoreError::Internal(
            "refusing to delete entire inventory: keep_vins is empty".to_string(),
        ));
    }
    let conn = store.conn.lock().unwrap_or_else(|e| e.into_inner());
    let placeholders: Vec<String> = keep_vins.iter().enumerate().map(|(i, _)| format!("?{}", i + 2)).collect();
    let sql = format!(
        "DELETE FROM vehicles WHERE dealership_id = ?1 AND vin IS NOT NULL AND vin NOT IN ({}) RETURNING vin",
        placeholders.join(",")
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut param_values: Vec<&dyn rusqlite::ToSql> = vec![&dealership_id];
    for vin in keep_vins {
        param_values.push(vin);
    }
    let deleted_vins: Vec<String> = stmt
        .query_map(param_values.as_slice(), |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok((deleted_vins.len() as i64, deleted_vins))
}
