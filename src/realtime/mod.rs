//! Realtime fanout (C6, spec §4.6). An authenticated WebSocket hub that
//! delivers tenant-scoped `Notification`s, fire-and-forget.

use crate::models::{Notification, NotificationType};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One registered client connection: a per-socket outgoing channel.
pub struct Client {
    pub user_id: i64,
    pub sender: mpsc::UnboundedSender<Notification>,
}

/// `dealershipId -> set<client>`, guarded by a single mutex (spec §5:
/// "critical sections limited to add/remove and iterate-to-copy before sending").
#[derive(Default)]
pub struct WsHub {
    clients: Mutex<HashMap<i64, Vec<Client>>>,
    next_id: Mutex<u64>,
}

pub struct Registration {
    pub dealership_id: i64,
    pub client_id: u64,
}

impl WsHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new authenticated connection. Returns a handle used to unregister later.
    pub fn register(
        &self,
        dealership_id: i64,
        user_id: i64,
        sender: mpsc::UnboundedSender<Notification>,
    ) -> Registration {
        let mut id_guard = self.next_id.lock().unwrap();
        *id_guard += 1;
        let client_id = *id_guard;
        drop(id_guard);

        let mut clients = self.clients.lock().unwrap();
        clients
            .entry(dealership_id)
            .or_default()
            .push(Client { user_id, sender });
        Registration {
            dealership_id,
            client_id,
        }
    }

    /// Remove a connection on disconnect. Closed sockets are otherwise reaped
    /// lazily on next send (spec §4.6).
    pub fn unregister(&self, dealership_id: i64, sender: &mpsc::UnboundedSender<Notification>) {
        let mut clients = self.clients.lock().unwrap();
        if let Some(list) = clients.get_mut(&dealership_id) {
            list.retain(|c| !c.sender.same_channel(sender));
            if list.is_empty() {
                clients.remove(&dealership_id);
            }
        }
    }

    /// Broadcast a notification to every client connected for `dealership_id`.
    /// Best-effort, fire-and-forget; a dead channel is dropped lazily.
    pub fn broadcast(&self, dealership_id: i64, notification: Notification) {
        if !validate_dealership_id(dealership_id) {
            log::warn!(target: "dealerops::realtime", "refusing broadcast to invalid dealership_id {dealership_id}");
            return;
        }
        let mut clients = self.clients.lock().unwrap();
        if let Some(list) = clients.get_mut(&dealership_id) {
            list.retain(|c| c.sender.send(notification.clone()).is_ok());
        }
    }

    pub fn connection_count(&self) -> usize {
        self.clients.lock().unwrap().values().map(Vec::len).sum()
    }
}

/// Validate a notification before broadcast (spec §4.6: `type` must be in the
/// enum, `dealershipId` must be a positive integer — enforced by callers
/// holding a typed `NotificationType` and an `i64` already, this just guards
/// the positivity invariant).
pub fn validate_dealership_id(dealership_id: i64) -> bool {
    dealership_id > 0
}

pub fn notification(
    kind: NotificationType,
    title: impl Into<String>,
    message: impl Into<String>,
    data: Option<serde_json::Value>,
    now: chrono::DateTime<chrono::Utc>,
) -> Notification {
    Notification {
        kind,
        title: title.into(),
        message: message.into(),
        data,
        timestamp: now.to_rfc3339(),
    }
}
