//! Vehicle inventory routes (spec §4.1, §4.4, §4.7).

use crate::adapters::ai::AiAdapter;
use crate::adapters::blob::BlobAdapter;
use crate::auth::guards::{ClientIp, TenantContext};
use crate::db::Store;
use crate::errors::{ApiError, ApiResult};
use crate::inventory::provider_chain::ProviderChain;
use crate::models::{Role, Vehicle};
use crate::store;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post, State};
use serde::Deserialize;
use std::sync::Arc;

#[get("/vehicles?<page>&<limit>")]
pub fn list(
    ctx: TenantContext,
    page: Option<i64>,
    limit: Option<i64>,
    store: &State<Arc<Store>>,
) -> Json<serde_json::Value> {
    let limit = limit.unwrap_or(50).clamp(1, 200);
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;
    let result = store::vehicles::list(store, ctx.dealership_id, limit, offset);
    Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
        "page": page,
        "limit": limit,
    }))
}

#[get("/vehicles/<id>")]
pub fn get(ctx: TenantContext, id: i64, store: &State<Arc<Store>>) -> ApiResult<Json<Vehicle>> {
    let vehicle = store::vehicles::get(store, ctx.dealership_id, id)?;
    Ok(Json(vehicle))
}

#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    #[serde(rename = "type")]
    pub vehicle_type: Option<String>,
    pub price: i64,
    pub odometer: i64,
    pub vin: Option<String>,
    #[serde(rename = "stockNumber")]
    pub stock_number: Option<String>,
}

#[post("/vehicles", data = "<body>")]
pub fn create(
    ctx: TenantContext,
    body: Json<CreateVehicleRequest>,
    store: &State<Arc<Store>>,
    ip: ClientIp,
) -> ApiResult<(rocket::http::Status, Json<Vehicle>)> {
    ctx.require_role(Role::Master)?;
    let body = body.into_inner();
    let now = chrono::Utc::now().to_rfc3339();
    let vehicle = Vehicle {
        id: 0,
        dealership_id: ctx.dealership_id,
        year: body.year,
        make: body.make,
        model: body.model,
        trim: body.trim,
        vehicle_type: body.vehicle_type,
        price: body.price,
        odometer: body.odometer,
        vin: body.vin,
        stock_number: body.stock_number,
        created_at: now.clone(),
        updated_at: now.clone(),
        ..Default::default()
    };
    let created = store::vehicles::upsert_by_vin(store, ctx.dealership_id, &vehicle, &now)?;
    ctx.audit(store, &ip, "vehicle.create", "vehicle", Some(&created.id.to_string()));
    Ok((rocket::http::Status::Created, Json(created)))
}

#[derive(Deserialize)]
pub struct UpdateVehicleRequest {
    #[serde(rename = "manualHeadline")]
    pub manual_headline: Option<String>,
    #[serde(rename = "manualSubheadline")]
    pub manual_subheadline: Option<String>,
    #[serde(rename = "manualDescription")]
    pub manual_description: Option<String>,
}

#[patch("/vehicles/<id>", data = "<body>")]
pub fn update(
    ctx: TenantContext,
    id: i64,
    body: Json<UpdateVehicleRequest>,
    store: &State<Arc<Store>>,
    ip: ClientIp,
) -> ApiResult<Json<Vehicle>> {
    ctx.require_role(Role::Master)?;
    let now = chrono::Utc::now().to_rfc3339();
    let body = body.into_inner();
    let updated = store::vehicles::update_manual_fields(
        store,
        ctx.dealership_id,
        id,
        body.manual_headline.as_deref(),
        body.manual_subheadline.as_deref(),
        body.manual_description.as_deref(),
        &now,
    )?;
    ctx.audit(store, &ip, "vehicle.update", "vehicle", Some(&id.to_string()));
    Ok(Json(updated))
}

#[delete("/vehicles/<id>")]
pub fn delete(ctx: TenantContext, id: i64, store: &State<Arc<Store>>, ip: ClientIp) -> ApiResult<rocket::http::Status> {
    ctx.require_role(Role::Master)?;
    store::vehicles::delete(store, ctx.dealership_id, id)?;
    ctx.audit(store, &ip, "vehicle.delete", "vehicle", Some(&id.to_string()));
    Ok(rocket::http::Status::NoContent)
}

/// Re-scrapes a single vehicle's own VDP URL, bypassing the listing-page
/// link-extraction step a full dealership sweep needs (spec §4.1, §4.4).
#[post("/vehicles/<id>/force-rescrape")]
pub async fn force_rescrape(
    ctx: TenantContext,
    id: i64,
    store: &State<Arc<Store>>,
    blob: &State<Arc<BlobAdapter>>,
    chain: &State<ProviderChain>,
) -> ApiResult<Json<Vehicle>> {
    ctx.require_role(Role::Manager)?;
    let vehicle = store::vehicles::get(store, ctx.dealership_id, id)?;
    let vdp_url = vehicle
        .dealer_vdp_url
        .clone()
        .ok_or_else(|| ApiError::Input("vehicle has no dealer VDP url to re-scrape".to_string()))?;

    let now = chrono::Utc::now().to_rfc3339();
    let run = store::scrapes::start(store, ctx.dealership_id, crate::models::TriggeredBy::Manual, &now)?;

    let outcome = crate::inventory::providers::fetch_with_fallback(
        store,
        ctx.dealership_id,
        &vdp_url,
        &chain.0,
        run.id,
    )
    .await;
    let Some(outcome) = outcome else {
        let ended = chrono::Utc::now().to_rfc3339();
        store::scrapes::finish(store, run.id, None, 0, 0, 0, 0, Some("all providers exhausted"), &ended).ok();
        return Err(ApiError::Upstream { provider: "scrape_provider", detail: "all providers exhausted".to_string() });
    };

    let scraped = crate::inventory::scrape::extract_vehicle(
        &outcome.page.html,
        &crate::inventory::scrape::FieldPatterns::default(),
    );
    let Some(mut scraped) = scraped else {
        let ended = chrono::Utc::now().to_rfc3339();
        store::scrapes::finish(store, run.id, Some(outcome.method), 0, 0, 0, 0, Some("could not extract vehicle fields"), &ended).ok();
        return Err(ApiError::Upstream { provider: "scrape_provider", detail: "extraction failed".to_string() });
    };
    scraped.dealer_vdp_url = Some(vdp_url);

    let merged = crate::inventory::merge::merge(Some(&vehicle), &scraped, &now);
    let persisted = store::vehicles::upsert_by_vin(store, ctx.dealership_id, &merged, &now)?;
    crate::inventory::images::persist_for_vehicle(store, ctx.dealership_id, &persisted, blob).await;

    let ended = chrono::Utc::now().to_rfc3339();
    store::scrapes::finish(store, run.id, Some(outcome.method), 1, 0, 1, 0, None, &ended).ok();

    Ok(Json(persisted))
}

/// Generates headline/subheadline/description from the AI adapter; never
/// persists automatically — callers still go through `PATCH /vehicles/{id}`
/// to accept the suggestion (spec §4.7).
#[post("/vehicles/<id>/generate-description")]
pub async fn generate_description(
    ctx: TenantContext,
    id: i64,
    store: &State<Arc<Store>>,
    ai: &State<AiAdapter>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require_role(Role::Master)?;
    let vehicle = store::vehicles::get(store, ctx.dealership_id, id)?;
    let vehicle_json = serde_json::to_value(&vehicle).unwrap_or(serde_json::Value::Null);
    let result = ai.generate_description(store, ctx.dealership_id, &vehicle_json).await;
    if result.success {
        let data = result.data.expect("success result carries data");
        Ok(Json(serde_json::json!({
            "headline": data.headline,
            "subheadline": data.subheadline,
            "description": data.description,
        })))
    } else {
        Err(ApiError::Upstream {
            provider: "ai",
            detail: result.error.unwrap_or_else(|| "generation failed".to_string()),
        })
    }
}
