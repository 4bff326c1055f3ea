use std::sync::{Arc, Weak};

use models::validate_entity_id;
use serde_json::{json, Value};
use service::metrics::EVENTS_SENT_TOTAL;
use service::{RecordKind, ScheduleStore};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::connection::Connection;
use super::protocol::{Command, Outbound, Request};
use crate::errors::ProtocolError;

/// Decode one text frame and run it. Malformed frames get an error result
/// (id 0 when no id could be read).
pub async fn handle_text(conn: &mut Connection, text: &str) {
    match Request::parse(text) {
        Ok(req) => dispatch(conn, req).await,
        Err((id, err)) => {
            debug!(code = %err.code, "rejected frame");
            conn.send(Outbound::error(id.unwrap_or(0), err));
        }
    }
}

pub async fn dispatch(conn: &mut Connection, req: Request) {
    match req.command {
        Command::Ping => conn.send(Outbound::Pong { id: req.id }),
        Command::UnsubscribeEvents => unsubscribe_events(conn, &req),
        command => {
            let entity_id = match validate_entity_id(req.field("entity_id")) {
                Ok(entity_id) => entity_id,
                Err(e) => {
                    conn.send(Outbound::error(req.id, e));
                    return;
                }
            };
            match command {
                Command::GetSections => get_sections(conn, req.id, &entity_id),
                Command::SetSections => set_sections(conn, &req, &entity_id).await,
                Command::GetSettings => get_settings(conn, req.id, &entity_id),
                Command::SetSettings => set_settings(conn, &req, &entity_id).await,
                Command::SubscribeSections => subscribe(conn, req.id, entity_id, RecordKind::Sections),
                Command::SubscribeSettings => subscribe(conn, req.id, entity_id, RecordKind::Settings),
                Command::Ping | Command::UnsubscribeEvents => {}
            }
        }
    }
}

fn get_sections(conn: &Connection, id: u64, entity_id: &str) {
    let sections = conn.store().get_sections(entity_id);
    conn.send(Outbound::ok(id, json!({ "sections": sections })));
}

async fn set_sections(conn: &Connection, req: &Request, entity_id: &str) {
    let raw = req.field("sections").unwrap_or(&Value::Null);
    match conn.store().set_sections(entity_id, raw).await {
        Ok(_) => conn.send(Outbound::ok(req.id, json!({ "ok": true }))),
        Err(e) => conn.send(Outbound::error(req.id, e)),
    }
}

fn get_settings(conn: &Connection, id: u64, entity_id: &str) {
    let view = conn.store().get_settings(entity_id);
    conn.send(Outbound::ok(id, json!({ "settings": view.settings, "exists": view.exists })));
}

async fn set_settings(conn: &Connection, req: &Request, entity_id: &str) {
    let raw = req.field("settings").unwrap_or(&Value::Null);
    match conn.store().set_settings(entity_id, raw).await {
        Ok(_) => conn.send(Outbound::ok(req.id, json!({ "ok": true }))),
        Err(e) => conn.send(Outbound::error(req.id, e)),
    }
}

/// Current state of one record, shaped as an event payload.
fn event_payload(store: &ScheduleStore, entity_id: &str, kind: RecordKind) -> Value {
    match kind {
        RecordKind::Sections => json!({
            "entity_id": entity_id,
            "sections": store.get_sections(entity_id),
        }),
        RecordKind::Settings => {
            let view = store.get_settings(entity_id);
            json!({
                "entity_id": entity_id,
                "settings": view.settings,
                "exists": view.exists,
            })
        }
    }
}

/// Ack, register for updates, then push the current state. The ack is queued
/// first so no event precedes it; registering before the initial read means a
/// write racing the subscribe still produces a later event.
fn subscribe(conn: &mut Connection, id: u64, entity_id: String, kind: RecordKind) {
    if conn.has_subscription(id) {
        conn.send(Outbound::error(id, ProtocolError::id_reuse()));
        return;
    }
    conn.send(Outbound::ok(id, json!({ "ok": true })));

    let send_update = state_pusher(Arc::downgrade(conn.store()), conn.sender(), id, entity_id.clone(), kind);
    let handle = conn.store().bus().subscribe(&entity_id, kind, send_update.clone());
    conn.add_subscription(id, handle);
    send_update();
    info!(%entity_id, kind = kind.as_str(), id, "subscription opened");
}

/// Callback that re-reads the record and queues a full-state event. Holds the
/// store weakly: the bus lives inside the store.
fn state_pusher(
    store: Weak<ScheduleStore>,
    tx: mpsc::UnboundedSender<Outbound>,
    id: u64,
    entity_id: String,
    kind: RecordKind,
) -> impl Fn() + Clone + Send + Sync + 'static {
    move || {
        let Some(store) = store.upgrade() else { return };
        let event = event_payload(&store, &entity_id, kind);
        if tx.send(Outbound::event(id, event)).is_ok() {
            EVENTS_SENT_TOTAL.inc();
        }
    }
}

fn unsubscribe_events(conn: &mut Connection, req: &Request) {
    let Some(subscription) = req.field("subscription").and_then(Value::as_u64) else {
        conn.send(Outbound::error(req.id, ProtocolError::invalid_format("subscription id is required")));
        return;
    };
    if conn.cancel_subscription(subscription) {
        debug!(subscription, "subscription cancelled");
        conn.send(Outbound::ok(req.id, Value::Null));
    } else {
        conn.send(Outbound::error(req.id, ProtocolError::not_found("subscription not found")));
    }
}
