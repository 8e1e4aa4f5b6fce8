//! Inbound webhooks (spec §4.2, §4.3, §4.4, §6): signature verification,
//! then dealership resolution, then the same pathway a normal event would
//! take through the conversation hub or scrape pipeline.

use crate::adapters::ai::AiAdapter;
use crate::auth::guards::ClientIp;
use crate::conversation::inbound::{self, InboundEvent};
use crate::db::Store;
use crate::errors::{ApiError, ApiResult};
use crate::inventory::provider_chain::ProviderChain;
use crate::inventory::scheduler;
use crate::inventory::scrape::SourceConfig;
use crate::models::SyncSource;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::realtime::WsHub;
use crate::store;
use rocket::data::{Data, ToByteUnit};
use rocket::serde::json::Json;
use rocket::{post, Request, State};
use serde::Deserialize;
use std::sync::Arc;

/// Reads the raw request body once, so the signature can be checked against
/// the exact bytes before any JSON parsing happens.
pub struct RawBody(pub Vec<u8>);

#[rocket::async_trait]
impl<'r> rocket::data::FromData<'r> for RawBody {
    type Error = std::io::Error;

    async fn from_data(_req: &'r Request<'_>, data: Data<'r>) -> rocket::data::Outcome<'r, Self> {
        match data.open(2.mebibytes()).into_bytes().await {
            Ok(bytes) => rocket::data::Outcome::Success(RawBody(bytes.into_inner())),
            Err(e) => rocket::data::Outcome::Error((rocket::http::Status::BadRequest, e)),
        }
    }
}

fn header<'r>(req: &'r Request<'_>, name: &str) -> Option<&'r str> {
    req.headers().get_one(name)
}

fn verify_signature(req: &Request<'_>, service: &str, secret: &str, body: &[u8]) -> ApiResult<()> {
    let sig = header(req, &format!("x-{service}-signature"))
        .ok_or_else(|| ApiError::Auth(crate::errors::AuthFailure::MissingCredentials))?;
    let ts: i64 = header(req, &format!("x-{service}-timestamp"))
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ApiError::Auth(crate::errors::AuthFailure::MissingCredentials))?;
    let now_ms = chrono::Utc::now().timestamp_millis();
    if crate::webhook_sig::verify(secret, ts, body, sig, now_ms) {
        Ok(())
    } else {
        Err(ApiError::Auth(crate::errors::AuthFailure::InvalidCredentials))
    }
}

#[derive(Deserialize)]
pub struct TriggerScrapeRequest {
    #[serde(rename = "locationId")]
    pub location_id: Option<String>,
    pub sources: Vec<String>,
}

/// Manual scrape trigger (spec §4.4, §6): signed with the dealership's
/// `scrape_webhook_secret`, dealership resolved from the payload's
/// `locationId` before the secret can even be looked up.
#[post("/webhooks/trigger-scrape", data = "<raw>")]
pub async fn trigger_scrape(
    req: &Request<'_>,
    raw: RawBody,
    store: &State<Arc<Store>>,
    hub: &State<Arc<WsHub>>,
    blob: &State<Arc<crate::adapters::blob::BlobAdapter>>,
    chain: &State<ProviderChain>,
    limiter: &State<RateLimiter>,
    limits: &State<RateLimitConfig>,
    _ip: ClientIp,
) -> ApiResult<Json<serde_json::Value>> {
    let payload: TriggerScrapeRequest = serde_json::from_slice(&raw.0)
        .map_err(|e| ApiError::Input(format!("invalid payload: {e}")))?;

    let dealership_id = payload
        .location_id
        .as_deref()
        .and_then(|loc| store::external_accounts::resolve_dealership_id(store, Some(loc), None))
        .ok_or_else(|| ApiError::Input("not found".to_string()))?;
    let dealership = store::dealerships::get(store, dealership_id)?;
    verify_signature(req, "scrape", &dealership.scrape_webhook_secret, &raw.0)?;

    let key = format!("trigger-scrape:{dealership_id}");
    if !limiter.check(&key, limits.manual_scrape_max, limits.manual_scrape_window_secs) {
        return Err(ApiError::Input("rate limit exceeded".to_string()));
    }

    let sources: Vec<SourceConfig> = payload.sources.iter().map(SourceConfig::from_url).collect();
    let summary = scheduler::trigger_manual(store, hub, blob, dealership_id, &sources, &chain.0)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(serde_json::json!({
        "scrapeRunId": summary.run_id,
        "found": summary.found,
        "inserted": summary.inserted,
        "updated": summary.updated,
        "deleted": summary.deleted,
    })))
}

#[derive(Deserialize)]
struct CrmWebhookPayload {
    #[serde(rename = "locationId")]
    location_id: Option<String>,
    #[serde(flatten)]
    event: serde_json::Value,
}

async fn handle_crm_inbound(
    req: &Request<'_>,
    raw: &RawBody,
    store: &Store,
    hub: &WsHub,
    ai: Option<&AiAdapter>,
) -> ApiResult<Json<serde_json::Value>> {
    let payload: CrmWebhookPayload = serde_json::from_slice(&raw.0)
        .map_err(|e| ApiError::Input(format!("invalid payload: {e}")))?;

    let dealership_id = payload
        .location_id
        .as_deref()
        .and_then(|loc| store::external_accounts::resolve_dealership_id(store, Some(loc), None))
        .ok_or_else(|| ApiError::Input("not found".to_string()))?;
    let dealership = store::dealerships::get(store, dealership_id)?;
    verify_signature(req, "ghl", &dealership.crm_webhook_secret, &raw.0)?;

    let event: InboundEvent = serde_json::from_value(payload.event)
        .map_err(|e| ApiError::Input(format!("invalid event: {e}")))?;
    let outcome = inbound::handle_event(store, hub, ai, event, SyncSource::Provider).await?;
    Ok(Json(serde_json::json!({
        "duplicate": outcome.duplicate,
        "conversationId": outcome.conversation_id,
    })))
}

#[post("/ghl/webhook", data = "<raw>")]
pub async fn ghl_webhook(
    req: &Request<'_>,
    raw: RawBody,
    store: &State<Arc<Store>>,
    hub: &State<Arc<WsHub>>,
    ai: &State<AiAdapter>,
) -> ApiResult<Json<serde_json::Value>> {
    handle_crm_inbound(req, &raw, store, hub, Some(ai)).await
}

/// Call events carry no message body worth mining; handled as a plain
/// CRM-originated event so it still dedups and broadcasts like any other.
#[post("/ghl/call-webhook", data = "<raw>")]
pub async fn ghl_call_webhook(
    req: &Request<'_>,
    raw: RawBody,
    store: &State<Arc<Store>>,
    hub: &State<Arc<WsHub>>,
) -> ApiResult<Json<serde_json::Value>> {
    handle_crm_inbound(req, &raw, store, hub, None).await
}

#[derive(Deserialize)]
struct PbsWebhookPayload {
    #[serde(rename = "locationId")]
    location_id: Option<String>,
    #[serde(flatten)]
    event: serde_json::Value,
}

/// PBS (dealer management system) inbound events reuse the CRM webhook
/// secret scoping since both are CRM-adjacent integrations per dealership.
#[post("/pbs/webhook", data = "<raw>")]
pub async fn pbs_webhook(
    req: &Request<'_>,
    raw: RawBody,
    store: &State<Arc<Store>>,
    hub: &State<Arc<WsHub>>,
) -> ApiResult<Json<serde_json::Value>> {
    let payload: PbsWebhookPayload = serde_json::from_slice(&raw.0)
        .map_err(|e| ApiError::Input(format!("invalid payload: {e}")))?;
    let dealership_id = payload
        .location_id
        .as_deref()
        .and_then(|loc| store::external_accounts::resolve_dealership_id(store, Some(loc), None))
        .ok_or_else(|| ApiError::Input("not found".to_string()))?;
    let dealership = store::dealerships::get(store, dealership_id)?;
    verify_signature(req, "pbs", &dealership.crm_webhook_secret, &raw.0)?;

    let event: InboundEvent = serde_json::from_value(payload.event)
        .map_err(|e| ApiError::Input(format!("invalid event: {e}")))?;
    let outcome = inbound::handle_event(store, hub, None, event, SyncSource::Provider).await?;
    Ok(Json(serde_json::json!({
        "duplicate": outcome.duplicate,
        "conversationId": outcome.conversation_id,
    })))
}

