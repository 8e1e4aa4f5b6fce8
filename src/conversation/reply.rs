//! AI reply orchestration (spec §4.3, §4.3.2). Watch mode suppresses the
//! send; the history window and prompt are simplified to dealership-wide
//! defaults (a per-dealership AI-config store is outside this core's scope).

use crate::adapters::ai::{AiAdapter, ReplyContext};
use crate::adapters::crm::CrmAdapter;
use crate::adapters::email::EmailAdapter;
use crate::db::Store;
use crate::models::{Direction, NotificationType, SyncSource};
use crate::realtime::{self, WsHub};
use crate::store;

const HISTORY_WINDOW: i64 = 20;
const DEFAULT_MAX_TOKENS: u32 = 300;
const DEFAULT_TEMPERATURE: f32 = 0.4;
const DEFAULT_PROMPT: &str =
    "Respond as a helpful dealership sales assistant. Be concise and answer the customer's question.";

pub async fn generate_and_send(store: &Store, hub: &WsHub, ai: &AiAdapter, dealership_id: i64, conversation_id: i64) {
    let conversation = match store::conversations::get(store, dealership_id, conversation_id) {
        Ok(c) => c,
        Err(_) => return,
    };
    if !conversation.ai_enabled || conversation.ai_watch_mode {
        return;
    }

    let mut history = store::messages::list_for_conversation(store, conversation_id, HISTORY_WINDOW, 0);
    history.reverse();
    let transcript: Vec<(String, String)> = history
        .iter()
        .map(|m| (m.direction.as_str().to_string(), m.content.clone()))
        .collect();

    let ctx = ReplyContext {
        history: &transcript,
        vehicle_context: None,
        prompt: DEFAULT_PROMPT,
        max_tokens: DEFAULT_MAX_TOKENS,
        temperature: DEFAULT_TEMPERATURE,
    };

    let result = ai.generate_reply(store, dealership_id, &ctx).await;
    let Some(reply) = result.data else {
        log::warn!(target: "dealerops::conversation", "AI reply generation failed: {:?}", result.error);
        return;
    };

    // The CRM/email adapters aren't wired into the scheduled reply path in
    // this core (no request-scoped credentials to construct them with);
    // the reply is persisted directly as a lotview-originated message and
    // broadcast, matching spec §4.3's `syncSource = lotview`.
    let now = chrono::Utc::now().to_rfc3339();
    match store::messages::insert(
        store,
        dealership_id,
        conversation_id,
        None,
        None,
        Direction::Outbound,
        Some("AI Assistant"),
        &reply.message,
        &now,
        SyncSource::Lotview,
    ) {
        Ok(store::messages::InsertOutcome::Inserted(_)) => {
            store::conversations::touch_last_message(store, conversation_id, &reply.message, &now).ok();
            hub.broadcast(
                dealership_id,
                realtime::notification(
                    NotificationType::ChatMessage,
                    "AI reply sent",
                    &reply.message,
                    Some(serde_json::json!({"conversationId": conversation_id})),
                    chrono::Utc::now(),
                ),
            );
        }
        Ok(store::messages::InsertOutcome::Duplicate) => {}
        Err(e) => log::error!(target: "dealerops::conversation", "failed to persist AI reply: {e}"),
    }
}

/// Convenience used by routes that have a live CRM/email adapter pair
/// (e.g. a manual "regenerate AI reply" action) and want the full outbound
/// pipeline instead of the lotview-direct shortcut above.
pub async fn generate_and_send_via_crm(
    store: &Store,
    hub: &WsHub,
    ai: &AiAdapter,
    crm: &CrmAdapter,
    email_fallback: Option<&EmailAdapter>,
    dealership_id: i64,
    conversation_id: i64,
) {
    let conversation = match store::conversations::get(store, dealership_id, conversation_id) {
        Ok(c) => c,
        Err(_) => return,
    };
    if !conversation.ai_enabled || conversation.ai_watch_mode {
        return;
    }

    let mut history = store::messages::list_for_conversation(store, conversation_id, HISTORY_WINDOW, 0);
    history.reverse();
    let transcript: Vec<(String, String)> = history
        .iter()
        .map(|m| (m.direction.as_str().to_string(), m.content.clone()))
        .collect();
    let ctx = ReplyContext {
        history: &transcript,
        vehicle_context: None,
        prompt: DEFAULT_PROMPT,
        max_tokens: DEFAULT_MAX_TOKENS,
        temperature: DEFAULT_TEMPERATURE,
    };
    let result = ai.generate_reply(store, dealership_id, &ctx).await;
    let Some(reply) = result.data else { return };

    let outbound = super::outbound::OutboundSend { crm, email_fallback };
    match super::outbound::send(
        &outbound, store, dealership_id, &conversation, &reply.message, Some("AI Assistant"), SyncSource::Lotview,
    )
    .await
    {
        Ok(_) => {
            hub.broadcast(
                dealership_id,
                realtime::notification(
                    NotificationType::ChatMessage,
                    "AI reply sent",
                    &reply.message,
                    Some(serde_json::json!({"conversationId": conversation_id})),
                    chrono::Utc::now(),
                ),
            );
        }
        Err(e) => log::warn!(target: "dealerops::conversation", "AI reply send failed: {e}"),
    }
}
