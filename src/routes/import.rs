//! Bulk inventory import/sync (spec §4.4, §4.7): external-API-token-gated
//! routes used by dealer-management-system integrations.

use crate::auth::guards::TenantContext;
use crate::db::Store;
use crate::errors::{ApiError, ApiResult};
use crate::inventory::bulk::{self, BulkVehicleRecord};
use crate::models::{Capability, Vehicle};
use crate::store;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct BulkImportRequest {
    pub vehicles: Vec<BulkVehicleRecord>,
    #[serde(rename = "updateExisting", default)]
    pub update_existing: bool,
}

#[post("/import/vehicles", data = "<body>")]
pub fn bulk_import(
    ctx: TenantContext,
    body: Json<BulkImportRequest>,
    store: &State<Arc<Store>>,
) -> ApiResult<Json<bulk::BulkImportResult>> {
    ctx.require_capabilities(&[Capability::ImportVehicles])?;
    let body = body.into_inner();
    let result = bulk::import(store, ctx.dealership_id, &body.vehicles, body.update_existing)?;
    Ok(Json(result))
}

#[get("/import/vehicles?<page>&<limit>")]
pub fn list(
    ctx: TenantContext,
    page: Option<i64>,
    limit: Option<i64>,
    store: &State<Arc<Store>>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require_capabilities(&[Capability::ReadVehicles])?;
    let limit = limit.unwrap_or(50).clamp(1, 200);
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;
    let result = store::vehicles::list(store, ctx.dealership_id, limit, offset);
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
        "page": page,
        "limit": limit,
    })))
}

#[delete("/import/vehicles/<id>")]
pub fn delete_by_id(ctx: TenantContext, id: i64, store: &State<Arc<Store>>) -> ApiResult<rocket::http::Status> {
    ctx.require_capabilities(&[Capability::DeleteVehicles])?;
    store::vehicles::delete(store, ctx.dealership_id, id)?;
    Ok(rocket::http::Status::NoContent)
}

#[delete("/import/vehicles/vin/<vin>")]
pub fn delete_by_vin(ctx: TenantContext, vin: &str, store: &State<Arc<Store>>) -> ApiResult<rocket::http::Status> {
    ctx.require_capabilities(&[Capability::DeleteVehicles])?;
    let vehicle: Vehicle = store::vehicles::find_by_vin(store, ctx.dealership_id, vin)
        .ok_or_else(|| ApiError::Input("not found".to_string()))?;
    store::vehicles::delete(store, ctx.dealership_id, vehicle.id)?;
    Ok(rocket::http::Status::NoContent)
}

#[derive(Deserialize)]
pub struct SyncRequest {
    pub vins: Vec<String>,
    #[serde(rename = "dryRun", default)]
    pub dry_run: bool,
    #[serde(rename = "confirmDelete", default)]
    pub confirm_delete: bool,
}

#[post("/import/vehicles/sync", data = "<body>")]
pub fn sync(
    ctx: TenantContext,
    body: Json<SyncRequest>,
    store: &State<Arc<Store>>,
) -> ApiResult<Json<bulk::SyncResult>> {
    ctx.require_capabilities(&[Capability::UpdateVehicles, Capability::DeleteVehicles])?;
    let body = body.into_inner();
    let result = bulk::sync(store, ctx.dealership_id, &body.vins, body.dry_run, body.confirm_delete)?;
    Ok(Json(result))
}
