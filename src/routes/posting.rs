//! Browser-extension posting routes (spec §4.5): the inventory feed the
//! extension polls, single-use posting tokens it redeems after a manual
//! post, bulk auto-post (server-delegated via the queue/scheduler), and the
//! daily limit status it displays to the user.

use crate::auth::guards::TenantContext;
use crate::db::Store;
use crate::errors::{ApiError, ApiResult};
use crate::posting::{limits, queue, tokens};
use crate::store;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::Deserialize;
use std::sync::Arc;

#[get("/extension/inventory?<page>&<limit>")]
pub fn inventory(ctx: TenantContext, page: Option<i64>, limit: Option<i64>, store: &State<Arc<Store>>) -> Json<serde_json::Value> {
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

#[derive(Deserialize)]
pub struct PostingTokenRequest {
    #[serde(rename = "vehicleId")]
    pub vehicle_id: i64,
    pub platform: String,
}

/// Mints a single-use token the extension redeems after it finishes posting
/// the listing itself in the user's browser (spec §4.5).
#[post("/extension/posting-token", data = "<body>")]
pub async fn posting_token(
    ctx: TenantContext,
    body: Json<PostingTokenRequest>,
    store: &State<Arc<Store>>,
) -> ApiResult<Json<crate::models::PostingToken>> {
    let user_id = ctx.user().map(|c| c.sub).ok_or(crate::errors::AuthFailure::MissingCredentials)?;
    let now = chrono::Utc::now();
    let token = tokens::mint(store, ctx.dealership_id, user_id, body.vehicle_id, &body.platform, None, now).await?;
    Ok(Json(token))
}

#[derive(Deserialize)]
pub struct ReportPostingRequest {
    pub token: String,
    #[serde(rename = "listingUrl")]
    pub listing_url: String,
}

/// Redeems the token and records the listing the extension just posted
/// (spec §4.5). Not routed through the queue: the extension already did
/// the posting itself.
#[post("/extension/postings", data = "<body>")]
pub async fn report_posting(
    ctx: TenantContext,
    body: Json<ReportPostingRequest>,
    store: &State<Arc<Store>>,
) -> ApiResult<Json<serde_json::Value>> {
    let now = chrono::Utc::now();
    let redeemed = tokens::redeem(store, &body.token, now)?;
    if redeemed.dealership_id != ctx.dealership_id {
        return Err(ApiError::Input("not found".to_string()));
    }
    let now_str = now.to_rfc3339();
    let item = store::posting::enqueue(
        store,
        ctx.dealership_id,
        redeemed.user_id,
        redeemed.vehicle_id,
        &redeemed.platform,
        None,
        None,
        &now_str,
    )?;
    store::posting::mark_posted(store, item.id, redeemed.vehicle_id, &redeemed.platform, &body.listing_url, &now_str)?;
    store::vehicles::set_marketplace_posted_at(store, ctx.dealership_id, redeemed.vehicle_id, &now_str)?;
    Ok(Json(serde_json::json!({"success": true, "listingUrl": body.listing_url})))
}

#[derive(Deserialize)]
pub struct AutoPostRequest {
    #[serde(rename = "vehicleIds")]
    pub vehicle_ids: Vec<i64>,
    #[serde(rename = "accountId")]
    pub account_id: String,
}

/// Enqueues vehicles for the server-side posting scheduler, which delegates
/// to the browser-automation adapter instead of the extension (spec §4.5).
#[post("/extension/auto-post", data = "<body>")]
pub async fn auto_post(
    ctx: TenantContext,
    body: Json<AutoPostRequest>,
    store: &State<Arc<Store>>,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = ctx.user().map(|c| c.sub).ok_or(crate::errors::AuthFailure::MissingCredentials)?;
    let now = chrono::Utc::now();
    let results = queue::enqueue_bulk(store, ctx.dealership_id, user_id, &body.vehicle_ids, &body.account_id, now).await;
    let (queued, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    Ok(Json(serde_json::json!({
        "queued": queued.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
        "failed": failed.into_iter().map(Result::unwrap_err).collect::<Vec<_>>(),
    })))
}

#[get("/extension/limits")]
pub fn extension_limits(ctx: TenantContext, store: &State<Arc<Store>>) -> ApiResult<Json<serde_json::Value>> {
    let user_id = ctx.user().map(|c| c.sub).ok_or(crate::errors::AuthFailure::MissingCredentials)?;
    let status = limits::status(store, user_id, limits::DEFAULT_DAILY_CAP, chrono::Utc::now());
    Ok(Json(serde_json::json!({
        "postedToday": status.posted_today,
        "mintedToday": status.minted_today,
        "cap": status.cap,
        "remaining": status.remaining,
    })))
}
