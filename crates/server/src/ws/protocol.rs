use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ProtocolError;

/// Prefix of every store command type, e.g. `energy_graph_scheduler/get_sections`.
pub const DOMAIN: &str = "energy_graph_scheduler";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    GetSections,
    SetSections,
    GetSettings,
    SetSettings,
    SubscribeSections,
    SubscribeSettings,
    Ping,
    UnsubscribeEvents,
}

impl Command {
    pub fn parse(kind: &str) -> Option<Self> {
        if let Some(op) = kind.strip_prefix(DOMAIN).and_then(|rest| rest.strip_prefix('/')) {
            return match op {
                "get_sections" => Some(Self::GetSections),
                "set_sections" => Some(Self::SetSections),
                "get_settings" => Some(Self::GetSettings),
                "set_settings" => Some(Self::SetSettings),
                "subscribe_sections" => Some(Self::SubscribeSections),
                "subscribe_settings" => Some(Self::SubscribeSettings),
                _ => None,
            };
        }
        match kind {
            "ping" => Some(Self::Ping),
            "unsubscribe_events" => Some(Self::UnsubscribeEvents),
            _ => None,
        }
    }
}

/// A decoded client frame. Operation-specific fields stay in `body`; they are
/// untrusted and handled by the normalizers.
#[derive(Clone, Debug)]
pub struct Request {
    pub id: u64,
    pub command: Command,
    pub body: Map<String, Value>,
}

impl Request {
    /// Decode a text frame. On failure returns the request id when one could
    /// be read, so the error can still be correlated.
    pub fn parse(text: &str) -> Result<Self, (Option<u64>, ProtocolError)> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| (None, ProtocolError::invalid_format(format!("invalid JSON: {e}"))))?;
        let Value::Object(body) = value else {
            return Err((None, ProtocolError::invalid_format("message must be an object")));
        };
        let id = body
            .get("id")
            .and_then(Value::as_u64)
            .ok_or((None, ProtocolError::invalid_format("missing or invalid id")))?;
        let kind = body
            .get("type")
            .and_then(Value::as_str)
            .ok_or((Some(id), ProtocolError::invalid_format("missing type")))?;
        let command = Command::parse(kind).ok_or_else(|| (Some(id), ProtocolError::unknown_command(kind)))?;
        Ok(Self { id, command, body })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }
}

/// Server → client frames.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Result {
        id: u64,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ProtocolError>,
    },
    Event {
        id: u64,
        event: Value,
    },
    Pong {
        id: u64,
    },
}

impl Outbound {
    pub fn ok(id: u64, result: Value) -> Self {
        Self::Result { id, success: true, result: Some(result), error: None }
    }

    pub fn error(id: u64, error: impl Into<ProtocolError>) -> Self {
        Self::Result { id, success: false, result: None, error: Some(error.into()) }
    }

    pub fn event(id: u64, event: Value) -> Self {
        Self::Event { id, event }
    }

    pub fn id(&self) -> u64 {
        match self {
            Self::Result { id, .. } | Self::Event { id, .. } | Self::Pong { id } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_types_are_namespaced() {
        assert_eq!(Command::parse("energy_graph_scheduler/set_sections"), Some(Command::SetSections));
        assert_eq!(Command::parse("energy_graph_scheduler/subscribe_settings"), Some(Command::SubscribeSettings));
        assert_eq!(Command::parse("ping"), Some(Command::Ping));
        assert_eq!(Command::parse("get_sections"), None);
        assert_eq!(Command::parse("energy_graph_scheduler/ping"), None);
        assert_eq!(Command::parse("energy_graph_schedulerx/get_sections"), None);
    }

    #[test]
    fn parse_reports_id_when_available() {
        let (id, err) = Request::parse(r#"{"id": 4, "type": "nope"}"#).unwrap_err();
        assert_eq!(id, Some(4));
        assert_eq!(err.code, "unknown_command");

        let (id, err) = Request::parse("[1]").unwrap_err();
        assert_eq!(id, None);
        assert_eq!(err.code, "invalid_format");

        let (id, err) = Request::parse(r#"{"type": "ping"}"#).unwrap_err();
        assert_eq!(id, None);
        assert_eq!(err.code, "invalid_format");
    }

    #[test]
    fn parse_keeps_body_fields() {
        let req = Request::parse(r#"{"id": 1, "type": "energy_graph_scheduler/get_settings", "entity_id": "lamp"}"#)
            .unwrap();
        assert_eq!(req.id, 1);
        assert_eq!(req.command, Command::GetSettings);
        assert_eq!(req.field("entity_id"), Some(&json!("lamp")));
    }

    #[test]
    fn outbound_wire_shape() {
        let ok = serde_json::to_value(Outbound::ok(3, json!({"ok": true}))).unwrap();
        assert_eq!(ok, json!({"id": 3, "type": "result", "success": true, "result": {"ok": true}}));

        let err = serde_json::to_value(Outbound::error(3, ProtocolError::not_found("gone"))).unwrap();
        assert_eq!(
            err,
            json!({"id": 3, "type": "result", "success": false, "error": {"code": "not_found", "message": "gone"}})
        );

        let ev = serde_json::to_value(Outbound::event(9, json!({"entity_id": "lamp"}))).unwrap();
        assert_eq!(ev, json!({"id": 9, "type": "event", "event": {"entity_id": "lamp"}}));
        assert_eq!(serde_json::to_value(Outbound::Pong { id: 2 }).unwrap(), json!({"id": 2, "type": "pong"}));
    }
}
