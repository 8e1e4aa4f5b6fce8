//! Conversation hub routes (spec §4.3): the "all conversations" admin view,
//! the messenger-scoped subset, manual send/reply, and AI toggles.

use crate::adapters::ai::AiAdapter;
use crate::adapters::crm::CrmAdapter;
use crate::adapters::email::EmailAdapter;
use crate::auth::guards::{ClientIp, TenantContext};
use crate::conversation::{outbound, reply};
use crate::db::Store;
use crate::errors::{ApiError, ApiResult};
use crate::models::{Message, Role, SyncSource};
use crate::realtime::WsHub;
use crate::store;
use rocket::serde::json::Json;
use rocket::{get, patch, post, State};
use serde::Deserialize;
use std::sync::Arc;

#[get("/all-conversations?<page>&<limit>")]
pub fn all_conversations(
    ctx: TenantContext,
    page: Option<i64>,
    limit: Option<i64>,
    store: &State<Arc<Store>>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require_role(Role::Manager)?;
    let limit = limit.unwrap_or(50).clamp(1, 200);
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;
    let items = store::conversations::list(store, ctx.dealership_id, limit, offset);
    Ok(Json(serde_json::json!({"items": items, "page": page, "limit": limit})))
}

/// Same listing, unrestricted by role: a salesperson only works their own
/// messenger queue but still needs to see every conversation to pick one up.
#[get("/messenger-conversations?<page>&<limit>")]
pub fn messenger_conversations(
    _ctx: TenantContext,
    page: Option<i64>,
    limit: Option<i64>,
    store: &State<Arc<Store>>,
) -> Json<serde_json::Value> {
    let limit = limit.unwrap_or(50).clamp(1, 200);
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;
    let items = store::conversations::list(store, _ctx.dealership_id, limit, offset);
    Json(serde_json::json!({"items": items, "page": page, "limit": limit}))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[post("/conversations/<id>/send-message", data = "<body>")]
pub async fn send_message(
    ctx: TenantContext,
    id: i64,
    body: Json<SendMessageRequest>,
    store: &State<Arc<Store>>,
    hub: &State<Arc<WsHub>>,
    crm: &State<CrmAdapter>,
    email: &State<EmailAdapter>,
) -> ApiResult<Json<Message>> {
    let conversation = store::conversations::get(store, ctx.dealership_id, id)?;
    let sender_name = ctx.user().map(|c| c.email.as_str());
    let outbound = outbound::OutboundSend { crm, email_fallback: Some(email) };
    let message = outbound::send(
        &outbound,
        store,
        ctx.dealership_id,
        &conversation,
        &body.message,
        sender_name,
        SyncSource::Lotview,
    )
    .await?;

    hub.broadcast(
        ctx.dealership_id,
        crate::realtime::notification(
            crate::models::NotificationType::ChatMessage,
            "Message sent",
            &body.message,
            Some(serde_json::json!({"conversationId": id})),
            chrono::Utc::now(),
        ),
    );
    Ok(Json(message))
}

/// Alias used by the messenger UI; identical semantics to `send-message`.
#[post("/messenger-conversations/<id>/reply", data = "<body>")]
pub async fn messenger_reply(
    ctx: TenantContext,
    id: i64,
    body: Json<SendMessageRequest>,
    store: &State<Arc<Store>>,
    hub: &State<Arc<WsHub>>,
    crm: &State<CrmAdapter>,
    email: &State<EmailAdapter>,
) -> ApiResult<Json<Message>> {
    send_message(ctx, id, body, store, hub, crm, email).await
}

#[derive(Deserialize)]
pub struct ToggleAiRequest {
    pub enabled: bool,
    #[serde(rename = "watchMode", default)]
    pub watch_mode: Option<bool>,
}

/// Toggles AI auto-reply; when re-enabling with AI watch mode off, a reply
/// is generated immediately for the most recent inbound message so the
/// customer doesn't wait out the next inbound event (spec §4.3.2).
#[post("/messenger-conversations/<id>/toggle-ai", data = "<body>")]
pub async fn toggle_ai(
    ctx: TenantContext,
    id: i64,
    body: Json<ToggleAiRequest>,
    store: &State<Arc<Store>>,
    hub: &State<Arc<WsHub>>,
    ai: &State<AiAdapter>,
    crm: &State<CrmAdapter>,
    email: &State<EmailAdapter>,
    ip: ClientIp,
) -> ApiResult<Json<serde_json::Value>> {
    store::conversations::set_ai_enabled(store, ctx.dealership_id, id, body.enabled)?;
    if let Some(watch) = body.watch_mode {
        store::conversations::set_ai_watch_mode(store, ctx.dealership_id, id, watch)?;
    }
    ctx.audit(store, &ip, "conversation.toggle_ai", "conversation", Some(&id.to_string()));

    if body.enabled && !body.watch_mode.unwrap_or(false) {
        reply::generate_and_send_via_crm(store, hub, ai, crm, Some(email), ctx.dealership_id, id).await;
    }

    let conversation = store::conversations::get(store, ctx.dealership_id, id)?;
    Ok(Json(serde_json::json!({
        "aiEnabled": conversation.ai_enabled,
        "aiWatchMode": conversation.ai_watch_mode,
    })))
}

#[derive(Deserialize)]
pub struct UpdateMetadataRequest {
    #[serde(rename = "leadStatus")]
    pub lead_status: Option<String>,
    #[serde(rename = "pipelineStage")]
    pub pipeline_stage: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(rename = "assignedToUserId")]
    pub assigned_to_user_id: Option<i64>,
}

#[patch("/messenger-conversations/<id>/metadata", data = "<body>")]
pub fn update_metadata(
    ctx: TenantContext,
    id: i64,
    body: Json<UpdateMetadataRequest>,
    store: &State<Arc<Store>>,
    ip: ClientIp,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.require_role(Role::Salesperson)?;
    let body = body.into_inner();
    if body.lead_status.is_none() && body.pipeline_stage.is_none() && body.assigned_to_user_id.is_none() && body.tags.is_none() {
        return Err(ApiError::Input("no metadata fields provided".to_string()));
    }
    if let Some(tags) = &body.tags {
        store::conversations::set_tags(store, ctx.dealership_id, id, tags)?;
    }
    if body.assigned_to_user_id.is_some() {
        store::conversations::assign(store, ctx.dealership_id, id, body.assigned_to_user_id)?;
    }
    if body.lead_status.is_some() || body.pipeline_stage.is_some() {
        store::conversations::set_lead_metadata(
            store,
            ctx.dealership_id,
            id,
            body.lead_status.as_deref(),
            body.pipeline_stage.as_deref(),
        )?;
    }
    ctx.audit(store, &ip, "conversation.update_metadata", "conversation", Some(&id.to_string()));
    let conversation = store::conversations::get(store, ctx.dealership_id, id)?;
    Ok(Json(serde_json::to_value(conversation).unwrap_or(serde_json::Value::Null)))
}
