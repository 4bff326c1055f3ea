use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use service::{ScheduleStore, SubscriptionHandle};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::handlers;
use super::protocol::Outbound;

/// State of one client connection: its outbound queue and the live
/// subscriptions it owns, keyed by the id of the subscribe request.
///
/// Every frame, including events pushed from bus callbacks, goes through the
/// same unbounded queue, so frames reach the client in the order they were
/// produced. Dropping the connection cancels all of its subscriptions.
pub struct Connection {
    store: Arc<ScheduleStore>,
    outbound: mpsc::UnboundedSender<Outbound>,
    subscriptions: HashMap<u64, SubscriptionHandle>,
}

impl Connection {
    pub fn new(store: Arc<ScheduleStore>, outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { store, outbound, subscriptions: HashMap::new() }
    }

    pub fn store(&self) -> &Arc<ScheduleStore> {
        &self.store
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Outbound> {
        self.outbound.clone()
    }

    pub fn send(&self, msg: Outbound) {
        if self.outbound.send(msg).is_err() {
            debug!("connection closed; dropping outbound frame");
        }
    }

    pub fn has_subscription(&self, id: u64) -> bool {
        self.subscriptions.contains_key(&id)
    }

    pub fn add_subscription(&mut self, id: u64, handle: SubscriptionHandle) {
        self.subscriptions.insert(id, handle);
    }

    /// Cancel the subscription created by request `id`. False if unknown.
    pub fn cancel_subscription(&mut self, id: u64) -> bool {
        match self.subscriptions.remove(&id) {
            Some(handle) => {
                self.store.bus().unsubscribe(&handle);
                true
            }
            None => false,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Cancel every subscription. Safe to call more than once.
    pub fn close(&mut self) {
        for (_, handle) in self.subscriptions.drain() {
            self.store.bus().unsubscribe(&handle);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Drive one upgraded socket until the client goes away.
pub async fn serve_socket(mut socket: WebSocket, store: Arc<ScheduleStore>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut conn = Connection::new(store, tx);
    debug!("websocket connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => handlers::handle_text(&mut conn, &text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "websocket receive failed");
                    break;
                }
            },
            Some(out) = rx.recv() => {
                let text = match serde_json::to_string(&out) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, id = out.id(), "failed to encode frame");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    let subscriptions = conn.subscription_count();
    conn.close();
    debug!(subscriptions, "websocket disconnected");
}
