// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus event envelope and typed payloads.
//!
//! A tagged union of known event types, each with a strongly typed
//! payload, plus an `unknown` fallthrough carrying the raw object —
//! untyped maps never propagate through the core.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event envelope as carried on the bus, the WebSocket, and the poll endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: i64,
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_at: String,
    pub payload: Value,
}

impl Event {
    /// Decode `payload` into the strongly typed variant matching `event_type`,
    /// falling back to `EventPayload::Unknown` for anything not recognized.
    pub fn typed_payload(&self) -> EventPayload {
        EventPayload::from_type_and_value(&self.event_type, &self.payload)
    }
}

/// Strongly typed payload per known event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    RuntimeStatus(RuntimeStatusPayload),
    WhatsappQr(WhatsappQrPayload),
    WhatsappConnected(WhatsappConnectedPayload),
    WhatsappDisconnected(WhatsappDisconnectedPayload),
    RuntimeError(RuntimeErrorPayload),
    GoogleConnected(GoogleConnectedPayload),
    GoogleDisconnected(GoogleDisconnectedPayload),
    GoogleError(RuntimeErrorPayload),
    ConfigApplied(ConfigAppliedPayload),
    /// Anything not recognized by type tag; the raw JSON is preserved.
    Unknown(Value),
}

impl EventPayload {
    fn from_type_and_value(event_type: &str, value: &Value) -> Self {
        let parsed = match event_type {
            "runtime.status" => {
                serde_json::from_value::<RuntimeStatusPayload>(value.clone()).ok().map(Self::RuntimeStatus)
            }
            "whatsapp.qr" => {
                serde_json::from_value::<WhatsappQrPayload>(value.clone()).ok().map(Self::WhatsappQr)
            }
            "whatsapp.connected" => serde_json::from_value::<WhatsappConnectedPayload>(value.clone())
                .ok()
                .map(Self::WhatsappConnected),
            "whatsapp.disconnected" => {
                serde_json::from_value::<WhatsappDisconnectedPayload>(value.clone())
                    .ok()
                    .map(Self::WhatsappDisconnected)
            }
            "runtime.error" => {
                serde_json::from_value::<RuntimeErrorPayload>(value.clone()).ok().map(Self::RuntimeError)
            }
            "google.connected" => serde_json::from_value::<GoogleConnectedPayload>(value.clone())
                .ok()
                .map(Self::GoogleConnected),
            "google.disconnected" => serde_json::from_value::<GoogleDisconnectedPayload>(value.clone())
                .ok()
                .map(Self::GoogleDisconnected),
            "google.error" => {
                serde_json::from_value::<RuntimeErrorPayload>(value.clone()).ok().map(Self::GoogleError)
            }
            "config.applied" => {
                serde_json::from_value::<ConfigAppliedPayload>(value.clone()).ok().map(Self::ConfigApplied)
            }
            _ => None,
        };
        parsed.unwrap_or_else(|| Self::Unknown(value.clone()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeStatusPayload {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<String>,
}

/// `qr` accepts alternative spellings on input (`qr_code`, `qrcode`, `code`),
/// normalized to `qr` on serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappQrPayload {
    #[serde(alias = "qr_code", alias = "qrcode", alias = "code")]
    pub qr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappConnectedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappDisconnectedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeErrorPayload {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConnectedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleDisconnectedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigAppliedPayload {
    pub revision: i64,
}

/// Extract the QR token from a `whatsapp.qr` payload irrespective of which
/// spelling the runtime used for the field.
pub fn extract_qr(payload: &Value) -> Option<String> {
    for key in ["qr", "qr_code", "qrcode", "code"] {
        if let Some(s) = payload.get(key).and_then(|v| v.as_str()) {
            if !s.is_empty() {
                return Some(s.to_owned());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_type() {
        let ev = Event {
            event_id: 1,
            tenant_id: "t_1".into(),
            event_type: "config.applied".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            payload: serde_json::json!({"revision": 3}),
        };
        match ev.typed_payload() {
            EventPayload::ConfigApplied(p) => assert_eq!(p.revision, 3),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn falls_through_to_unknown() {
        let ev = Event {
            event_id: 1,
            tenant_id: "t_1".into(),
            event_type: "some.future.type".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            payload: serde_json::json!({"foo": "bar"}),
        };
        assert!(matches!(ev.typed_payload(), EventPayload::Unknown(_)));
    }

    #[test]
    fn qr_alias_extraction() {
        assert_eq!(extract_qr(&serde_json::json!({"qrcode": "abc"})), Some("abc".to_owned()));
        assert_eq!(extract_qr(&serde_json::json!({"code": "xyz"})), Some("xyz".to_owned()));
        assert_eq!(extract_qr(&serde_json::json!({"other": "x"})), None);
    }
}
