//! Outbound send path (spec §4.3): persist before the CRM echo can race it,
//! fall back to an email summary sink if the CRM leg fails outright.

use crate::adapters::crm::CrmAdapter;
use crate::adapters::email::EmailAdapter;
use crate::db::Store;
use crate::errors::{ApiError, ApiResult};
use crate::models::{Conversation, Direction, Message, SyncSource};
use crate::store;

pub struct OutboundSend<'a> {
    pub crm: &'a CrmAdapter,
    pub email_fallback: Option<&'a EmailAdapter>,
}

/// Sends `body` out for `conversation`, persisting the Message row before
/// the CRM call returns so a racing inbound echo dedups against it
/// (spec §5: "must be stored before responding to the caller").
pub async fn send(
    outbound: &OutboundSend<'_>,
    store: &Store,
    dealership_id: i64,
    conversation: &Conversation,
    body: &str,
    sender_name: Option<&str>,
    sync_source: SyncSource,
) -> ApiResult<Message> {
    let now = chrono::Utc::now().to_rfc3339();

    let contact_id = match &conversation.ghl_contact_id {
        Some(id) => id.clone(),
        None => {
            let result = outbound
                .crm
                .find_or_create_contact(
                    store,
                    dealership_id,
                    conversation.handoff_name.as_deref(),
                    conversation.handoff_phone.as_deref(),
                    conversation.handoff_email.as_deref(),
                )
                .await;
            match result.data {
                Some(contact) => {
                    store::conversations::set_ghl_contact_id(store, conversation.id, &contact.contact_id)?;
                    contact.contact_id
                }
                None => return fallback_or_fail(outbound, store, dealership_id, conversation, body, sender_name, sync_source, &now).await,
            }
        }
    };

    let crm_conversation = outbound
        .crm
        .get_or_create_conversation(store, dealership_id, &contact_id, conversation.channel.as_str())
        .await;
    let Some(crm_conversation_id) = crm_conversation
        .data
        .as_ref()
        .and_then(|v| v.get("conversationId"))
        .and_then(|v| v.as_str())
    else {
        return fallback_or_fail(outbound, store, dealership_id, conversation, body, sender_name, sync_source, &now).await;
    };

    let send_result = outbound.crm.send_message(store, dealership_id, crm_conversation_id, body).await;
    match send_result.data {
        Some(sent) => {
            let insert = store::messages::insert(
                store,
                dealership_id,
                conversation.id,
                None,
                Some(&sent.message_id),
                Direction::Outbound,
                sender_name,
                body,
                &now,
                sync_source,
            )?;
            store::conversations::touch_last_message(store, conversation.id, body, &now)?;
            match insert {
                store::messages::InsertOutcome::Inserted(m) => Ok(m),
                store::messages::InsertOutcome::Duplicate => {
                    Err(ApiError::Conflict("message already recorded".to_string()))
                }
            }
        }
        None => fallback_or_fail(outbound, store, dealership_id, conversation, body, sender_name, sync_source, &now).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn fallback_or_fail(
    outbound: &OutboundSend<'_>,
    store: &Store,
    dealership_id: i64,
    conversation: &Conversation,
    body: &str,
    sender_name: Option<&str>,
    sync_source: SyncSource,
    now: &str,
) -> ApiResult<Message> {
    store::conversations::set_handoff(
        store,
        dealership_id,
        conversation.id,
        conversation.handoff_name.as_deref(),
        conversation.handoff_phone.as_deref(),
        conversation.handoff_email.as_deref(),
    )
    .ok();

    if let Some(email) = outbound.email_fallback
        && let Some(to) = conversation.handoff_email.as_deref()
    {
        let sent = email
            .send_summary(store, dealership_id, to, "New message from dealership", body)
            .await;
        if sent.success {
            let insert = store::messages::insert(
                store, dealership_id, conversation.id, None, None, Direction::Outbound,
                sender_name, body, now, sync_source,
            )?;
            return match insert {
                store::messages::InsertOutcome::Inserted(m) => Ok(m),
                store::messages::InsertOutcome::Duplicate => {
                    Err(ApiError::Conflict("message already recorded".to_string()))
                }
            };
        }
    }

    Err(ApiError::Upstream { provider: "crm", detail: "both primary and fallback delivery failed".to_string() })
}
