//! Inbound webhook handling (spec §4.3): dedup first, persist second, react third.

use super::mining;
use crate::adapters::ai::{AiAdapter, ReplyContext};
use crate::db::Store;
use crate::errors::{ApiError, ApiResult};
use crate::models::{Channel, Direction, SyncSource};
use crate::realtime::{self, WsHub};
use crate::store;
use serde::Deserialize;

/// `type` may arrive as the numeric codes in §4.3 or a channel string directly.
pub fn normalize_channel(raw: &serde_json::Value) -> Option<Channel> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64().and_then(Channel::from_numeric),
        serde_json::Value::String(s) => Channel::parse(s),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: serde_json::Value,
    #[serde(rename = "locationId")]
    pub location_id: Option<String>,
    #[serde(rename = "pageId")]
    pub page_id: Option<String>,
    #[serde(rename = "participantId")]
    pub participant_id: String,
    #[serde(rename = "externalMessageId")]
    pub external_message_id: Option<String>,
    #[serde(rename = "ghlMessageId")]
    pub ghl_message_id: Option<String>,
    pub body: String,
    pub direction: Option<String>,
    pub timestamp: Option<String>,
    #[serde(rename = "senderName")]
    pub sender_name: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct InboundOutcome {
    pub duplicate: bool,
    pub conversation_id: i64,
    pub message_id: Option<i64>,
}

pub async fn handle_event(
    store: &Store,
    hub: &WsHub,
    ai: Option<&AiAdapter>,
    event: InboundEvent,
    sync_source: SyncSource,
) -> ApiResult<InboundOutcome> {
    let dealership_id = match store::external_accounts::resolve_dealership_id(
        store,
        event.location_id.as_deref(),
        event.page_id.as_deref(),
    ) {
        Some(id) => id,
        None => {
            log::warn!(
                target: "dealerops::conversation",
                "unrouted inbound event: location={:?} page={:?}",
                event.location_id, event.page_id
            );
            return Err(ApiError::Input("not found".to_string()));
        }
    };

    let channel = normalize_channel(&event.kind)
        .ok_or_else(|| ApiError::Input("unrecognized message type".to_string()))?;

    let direction = event
        .direction
        .as_deref()
        .and_then(Direction::parse)
        .unwrap_or(Direction::Inbound);

    let now = chrono::Utc::now().to_rfc3339();
    let sent_at = event.timestamp.clone().unwrap_or_else(|| now.clone());

    let conversation = store::conversations::find_or_create(store, dealership_id, channel, &event.participant_id, &now)?;

    let insert = store::messages::insert(
        store,
        dealership_id,
        conversation.id,
        event.external_message_id.as_deref(),
        event.ghl_message_id.as_deref(),
        direction,
        event.sender_name.as_deref(),
        &event.body,
        &sent_at,
        sync_source,
    )?;

    let message_id = match insert {
        store::messages::InsertOutcome::Duplicate => {
            return Ok(InboundOutcome { duplicate: true, conversation_id: conversation.id, message_id: None });
        }
        store::messages::InsertOutcome::Inserted(m) => m.id,
    };

    store::conversations::touch_last_message(store, conversation.id, &event.body, &sent_at)?;

    if matches!(direction, Direction::Inbound) {
        mine_and_persist(store, dealership_id, &conversation, &event.body)?;
    }

    hub.broadcast(
        dealership_id,
        realtime::notification(
            crate::models::NotificationType::NewMessage,
            "New message",
            &event.body,
            Some(serde_json::json!({"conversationId": conversation.id})),
            chrono::Utc::now(),
        ),
    );

    if conversation.ai_enabled && !conversation.ai_watch_mode && matches!(direction, Direction::Inbound)
        && let Some(ai) = ai
    {
        super::reply::generate_and_send(store, hub, ai, dealership_id, conversation.id).await;
    }

    Ok(InboundOutcome { duplicate: false, conversation_id: conversation.id, message_id: Some(message_id) })
}

fn mine_and_persist(
    store: &Store,
    dealership_id: i64,
    conversation: &crate::models::Conversation,
    latest_body: &str,
) -> ApiResult<()> {
    if conversation.handoff_name.is_some()
        && conversation.handoff_phone.is_some()
        && conversation.handoff_email.is_some()
    {
        return Ok(());
    }

    let history = store::messages::list_for_conversation(store, conversation.id, 50, 0);
    let mut bodies: Vec<&str> = Vec::with_capacity(history.len() + 1);
    bodies.push(latest_body);
    bodies.extend(
        history
            .iter()
            .filter(|m| matches!(m.direction, Direction::Inbound))
            .map(|m| m.content.as_str()),
    );

    let mined = mining::mine(&bodies);
    let name = conversation.handoff_name.as_deref().or(mined.name.as_deref());
    let phone = conversation.handoff_phone.as_deref().or(mined.phone.as_deref());
    let email = conversation.handoff_email.as_deref().or(mined.email.as_deref());
    if name != conversation.handoff_name.as_deref()
        || phone != conversation.handoff_phone.as_deref()
        || email != conversation.handoff_email.as_deref()
    {
        store::conversations::set_handoff(store, dealership_id, conversation.id, name, phone, email)?;
    }
    Ok(())
}
